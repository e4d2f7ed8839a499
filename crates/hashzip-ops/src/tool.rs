//! External compressor/decompressor invocation.

use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;

use hashzip_core::{HashzipError, Result};

/// One compressor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressJob {
    /// Directory the compressor runs in; `inputs` are relative to it.
    pub working_dir: PathBuf,
    pub archive: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub password: Option<String>,
}

/// One decompressor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractJob {
    pub working_dir: PathBuf,
    pub archive: PathBuf,
    pub target: PathBuf,
    pub password: Option<String>,
}

/// Something that can create and unpack zip archives.
///
/// Failures are reported as [`HashzipError::ExternalProcess`] carrying the
/// captured diagnostic text.
pub trait ArchiveTool: Send + Sync {
    fn compress(&self, job: &CompressJob) -> impl Future<Output = Result<()>> + Send;
    fn extract(&self, job: &ExtractJob) -> impl Future<Output = Result<()>> + Send;
}

/// Runs Info-ZIP `zip` and `unzip`.
#[derive(Debug, Clone)]
pub struct ZipCommand {
    pub zip_program: PathBuf,
    pub unzip_program: PathBuf,
}

impl Default for ZipCommand {
    fn default() -> Self {
        Self {
            zip_program: PathBuf::from("zip"),
            unzip_program: PathBuf::from("unzip"),
        }
    }
}

impl ZipCommand {
    pub fn new(zip_program: impl Into<PathBuf>, unzip_program: impl Into<PathBuf>) -> Self {
        Self {
            zip_program: zip_program.into(),
            unzip_program: unzip_program.into(),
        }
    }

    /// `zip -q -r [-P pw] <archive> <inputs...>`
    pub fn compress_args(job: &CompressJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-q".into(), "-r".into()];
        if let Some(password) = &job.password {
            args.push("-P".into());
            args.push(password.into());
        }
        args.push(job.archive.clone().into_os_string());
        for input in &job.inputs {
            // Keep names that start with '-' from being read as flags.
            if input.to_string_lossy().starts_with('-') {
                args.push(PathBuf::from(".").join(input).into_os_string());
            } else {
                args.push(input.clone().into_os_string());
            }
        }
        args
    }

    /// `unzip -q -o [-P pw] <archive> -d <target>`
    pub fn extract_args(job: &ExtractJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-q".into(), "-o".into()];
        if let Some(password) = &job.password {
            args.push("-P".into());
            args.push(password.into());
        }
        args.push(job.archive.clone().into_os_string());
        args.push("-d".into());
        args.push(job.target.clone().into_os_string());
        args
    }
}

impl ArchiveTool for ZipCommand {
    async fn compress(&self, job: &CompressJob) -> Result<()> {
        run(&self.zip_program, Self::compress_args(job), job.working_dir.clone()).await
    }

    async fn extract(&self, job: &ExtractJob) -> Result<()> {
        run(&self.unzip_program, Self::extract_args(job), job.working_dir.clone()).await
    }
}

async fn run(program: &PathBuf, args: Vec<OsString>, working_dir: PathBuf) -> Result<()> {
    tracing::debug!(program = %program.display(), ?args, dir = %working_dir.display(), "running");
    let output = tokio::process::Command::new(program)
        .args(&args)
        .current_dir(&working_dir)
        .output()
        .await
        .map_err(|e| HashzipError::io(program, e))?;

    if output.status.success() {
        Ok(())
    } else {
        // zip reports some errors on stdout.
        let diagnostic = if output.stderr.is_empty() {
            output.stdout
        } else {
            output.stderr
        };
        Err(HashzipError::external(
            program.display().to_string(),
            output.status,
            &diagnostic,
        ))
    }
}

//! Content checksums for before/after reporting.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{HashzipError, Result};

const READ_CHUNK: usize = 64 * 1024;

/// Which checksum algorithm or program computes file digests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DigestMethod {
    #[default]
    Md5,
    Blake3,
    /// Delegate to an external program given by explicit path.
    External,
}

/// Hex-encoded content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest(String);

impl FileDigest {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes file digests. Cheap to clone and safe to share between tasks.
#[derive(Debug, Clone, Default)]
pub struct Digester {
    method: DigestMethod,
    program: Option<PathBuf>,
}

impl Digester {
    /// In-process digester for `Md5` or `Blake3`.
    pub fn new(method: DigestMethod) -> Self {
        Self {
            method,
            program: None,
        }
    }

    /// Digester that runs `program <path>` and reads the first token of stdout.
    pub fn external(program: impl Into<PathBuf>) -> Self {
        Self {
            method: DigestMethod::External,
            program: Some(program.into()),
        }
    }

    pub fn method(&self) -> DigestMethod {
        self.method
    }

    /// Compute the digest of a file without modifying it.
    pub async fn digest(&self, path: &Path) -> Result<FileDigest> {
        match self.method {
            DigestMethod::External => {
                let program = self.program.as_ref().ok_or_else(|| HashzipError::InvalidConfig {
                    message: "external digest requires digest_program".to_string(),
                })?;
                digest_external(program, path).await
            }
            method => {
                let target = path.to_path_buf();
                tokio::task::spawn_blocking(move || digest_file(method, &target))
                    .await
                    .map_err(|e| HashzipError::task_failed(path, e))?
            }
        }
    }
}

/// Stream a file through an in-process hasher.
pub fn digest_file(method: DigestMethod, path: &Path) -> Result<FileDigest> {
    let mut file = File::open(path).map_err(|e| HashzipError::io(path, e))?;
    let mut buffer = vec![0u8; READ_CHUNK];

    match method {
        DigestMethod::Md5 => {
            let mut ctx = md5::Context::new();
            loop {
                let n = file.read(&mut buffer).map_err(|e| HashzipError::io(path, e))?;
                if n == 0 {
                    break;
                }
                ctx.consume(&buffer[..n]);
            }
            Ok(FileDigest(format!("{:x}", ctx.compute())))
        }
        DigestMethod::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            loop {
                let n = file.read(&mut buffer).map_err(|e| HashzipError::io(path, e))?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
            Ok(FileDigest(hasher.finalize().to_hex().to_string()))
        }
        DigestMethod::External => Err(HashzipError::InvalidConfig {
            message: "external digest cannot be computed in-process".to_string(),
        }),
    }
}

async fn digest_external(program: &Path, path: &Path) -> Result<FileDigest> {
    let output = tokio::process::Command::new(program)
        .arg(path)
        .output()
        .await
        .map_err(|e| HashzipError::io(program, e))?;

    if !output.status.success() {
        return Err(HashzipError::external(
            program.display().to_string(),
            output.status,
            &output.stderr,
        ));
    }

    parse_digest_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        HashzipError::ExternalProcess {
            program: program.display().to_string(),
            code: "exit code 0".to_string(),
            stderr: "no digest on stdout".to_string(),
        }
    })
}

/// Extract the digest from `md5sum`-style output (`<hex>  <path>`).
pub fn parse_digest_output(stdout: &str) -> Option<FileDigest> {
    stdout
        .split_whitespace()
        .next()
        .filter(|token| token.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|token| FileDigest(token.to_ascii_lowercase()))
}

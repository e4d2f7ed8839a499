//! Error types shared by hashzip commands.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while preparing or running a batch.
#[derive(Debug, Error)]
pub enum HashzipError {
    /// No paths were supplied.
    #[error("No file selected")]
    SelectionEmpty,

    /// A hash operation was requested with every media type disabled.
    #[error("No media type enabled, enable video, audio or image first")]
    NoMediaTypeEnabled,

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found (or vanished between listing and inspection).
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Entry was expected to be a regular file.
    #[error("Not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external program exited unsuccessfully.
    #[error("{program} failed ({code}): {stderr}")]
    ExternalProcess {
        program: String,
        code: String,
        stderr: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl HashzipError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an external process error from an exit status and captured stderr.
    pub fn external(
        program: impl Into<String>,
        status: std::process::ExitStatus,
        stderr: &[u8],
    ) -> Self {
        let code = status
            .code()
            .map(|c| format!("exit code {c}"))
            .unwrap_or_else(|| "terminated by signal".to_string());
        Self::ExternalProcess {
            program: program.into(),
            code,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    /// A blocking task working on `path` panicked or was cancelled.
    pub fn task_failed(path: impl Into<PathBuf>, error: tokio::task::JoinError) -> Self {
        Self::Io {
            path: path.into(),
            source: std::io::Error::other(format!("Task failed: {error}")),
        }
    }

    /// Whether this error means the entry disappeared or never existed.
    pub fn is_vanished(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T, E = HashzipError> = std::result::Result<T, E>;

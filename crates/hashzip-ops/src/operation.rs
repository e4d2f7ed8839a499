//! File-level actions applied by the batch walker.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the walker does to each qualifying file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileAction {
    /// Append the marker.
    Modify,
    /// Strip the marker.
    Restore,
    /// Visit only, the file is not touched.
    Visit,
}

impl FileAction {
    /// Whether the action writes to files.
    pub fn mutates(&self) -> bool {
        !matches!(self, Self::Visit)
    }
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Modify => write!(f, "Modify hash"),
            Self::Restore => write!(f, "Restore hash"),
            Self::Visit => write!(f, "Visit"),
        }
    }
}

/// An error that occurred while processing one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    pub fn new(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

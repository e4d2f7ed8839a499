//! Events and results produced by a batch walk.

use std::path::PathBuf;

use hashzip_core::{FileDigest, MediaKind};
use serde::{Deserialize, Serialize};

use crate::{FileAction, OperationError};

/// Why an entry was not processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Classification failed or the kind is not enabled.
    UnsupportedMedia { kind: Option<MediaKind> },
    /// Neither a regular file nor a directory (symlink, socket, device).
    SpecialFile,
    /// The entry vanished before it could be inspected.
    Vanished,
    /// Already reached through another selected path.
    AlreadyVisited,
}

impl SkipReason {
    /// Skips worth showing to the user; the rest are diagnostic only.
    pub fn is_reportable(&self) -> bool {
        matches!(self, Self::Vanished)
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedMedia { kind: Some(kind) } => write!(f, "{kind} files are not enabled"),
            Self::UnsupportedMedia { kind: None } => write!(f, "unrecognized media type"),
            Self::SpecialFile => write!(f, "not a regular file or directory"),
            Self::Vanished => write!(f, "no longer exists"),
            Self::AlreadyVisited => write!(f, "already visited"),
        }
    }
}

/// Result for one leaf entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Processed {
        before: Option<FileDigest>,
        after: Option<FileDigest>,
        changed: bool,
    },
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub path: PathBuf,
    pub status: OutcomeStatus,
}

impl EntryOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Processed { .. })
    }
}

/// Streamed while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    DirectoryEntered(PathBuf),
    /// One event per file so its before/after digests stay together.
    FileProcessed {
        path: PathBuf,
        before: Option<FileDigest>,
        after: Option<FileDigest>,
        changed: bool,
    },
    Skipped {
        path: PathBuf,
        reason: SkipReason,
    },
    Failed(OperationError),
    Complete(BatchComplete),
}

/// Result of a completed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchComplete {
    pub action: FileAction,
    /// One entry per leaf reached, in completion order.
    pub outcomes: Vec<EntryOutcome>,
    pub elapsed_ms: u64,
}

impl BatchComplete {
    pub fn processed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_processed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.errors().count()
    }

    pub fn errors(&self) -> impl Iterator<Item = OperationError> + '_ {
        self.outcomes.iter().filter_map(|o| match &o.status {
            OutcomeStatus::Failed(message) => Some(OperationError::new(o.path.clone(), message)),
            _ => None,
        })
    }

    /// Check if every reached file was processed or skipped.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Get a human-readable summary of the batch.
    pub fn summary(&self) -> String {
        let failed = self.failed();
        if failed == 0 {
            format!(
                "{}: {} files processed, {} skipped",
                self.action,
                self.processed(),
                self.skipped()
            )
        } else {
            format!(
                "{}: {} files processed, {} skipped, {} failed",
                self.action,
                self.processed(),
                self.skipped(),
                failed
            )
        }
    }
}

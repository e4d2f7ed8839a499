//! Batch file operations engine for hashzip.
//!
//! This crate walks file selections and applies marker transforms with
//! progress reporting via channels, and drives an external zip tool to
//! compress or extract selections.

mod archive;
mod marker;
mod operation;
mod progress;
mod tool;
mod unique;
mod walk;

pub use archive::{
    ArchiveError, Extracted, compress, compress_target, decompress, decompress_target, is_zip,
};
pub use marker::{MarkerChange, append_marker, remove_marker, strip_marker};
pub use operation::{FileAction, OperationError};
pub use progress::{BatchComplete, BatchEvent, EntryOutcome, OutcomeStatus, SkipReason};
pub use tool::{ArchiveTool, CompressJob, ExtractJob, ZipCommand};
pub use unique::unique_path;
pub use walk::{BatchOptions, MediaFilter, start_batch, walk};

/// Default channel buffer size for batch progress events.
pub const OPERATION_CHANNEL_SIZE: usize = 100;

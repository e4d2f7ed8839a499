//! Command entry points for hashzip.
//!
//! [`Commands`] runs modify-hash, restore-hash, zip compress and zip
//! decompress against a [`Selection`], streaming a markdown report to any
//! [`ReportSurface`].

mod commands;
mod report;
mod selection;

pub use commands::{CommandKind, CommandStatus, CommandSummary, Commands};
pub use report::{MemorySurface, Notice, NoticeLevel, ProgressLog, ReportSurface, TerminalSurface};
pub use selection::Selection;

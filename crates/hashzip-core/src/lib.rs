//! Core types for hashzip.
//!
//! This crate provides the pieces every command shares: settings, the error
//! type, media classification and content digests.

mod config;
mod digest;
mod error;
mod media;

pub use config::{DEFAULT_MARKER, RemovalMode, Settings, SettingsBuilder};
pub use digest::{DigestMethod, Digester, FileDigest, digest_file, parse_digest_output};
pub use error::{HashzipError, Result};
pub use media::{
    ContentOracle, EnabledTypes, MediaClassifier, MediaInfo, MediaKind, Sniffed, TreeMagicOracle,
};

//! Zip compression and extraction of a selection.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use thiserror::Error;

use hashzip_core::HashzipError;

use crate::tool::{ArchiveTool, CompressJob, ExtractJob};
use crate::unique::unique_path;

/// Errors from the archive service.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("No file selected")]
    EmptySelection,

    #[error("No zip archive selected")]
    NoArchiveSelected,

    #[error(transparent)]
    Failed(#[from] HashzipError),

    /// Extraction failed and the target directory was removed.
    #[error("Extraction failed, removed {}: {source}", target.display())]
    RolledBack {
        target: PathBuf,
        #[source]
        source: HashzipError,
    },
}

impl ArchiveError {
    /// Captured diagnostic text of the failing tool, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        let source = match self {
            Self::Failed(e) | Self::RolledBack { source: e, .. } => e,
            _ => return None,
        };
        match source {
            HashzipError::ExternalProcess { stderr, .. } => Some(stderr.as_str()),
            _ => None,
        }
    }
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub target: PathBuf,
    pub archives: Vec<PathBuf>,
}

/// Candidate archive path for a selection, before collision resolution.
///
/// One entry gives `<name>.zip` next to it; several give
/// `<first stem> (<count> files).zip` next to the first.
pub fn compress_target(paths: &[PathBuf]) -> Option<PathBuf> {
    let first = paths.first()?;
    let parent = first.parent().unwrap_or(Path::new(""));
    let name = if paths.len() == 1 {
        format!("{}.zip", first.file_name()?.to_string_lossy())
    } else {
        format!(
            "{} ({} files).zip",
            first.file_stem()?.to_string_lossy(),
            paths.len()
        )
    };
    Some(parent.join(name))
}

/// Candidate extraction directory: the first archive's path without `.zip`.
pub fn decompress_target(archives: &[PathBuf]) -> Option<PathBuf> {
    let first = archives.first()?;
    let stem = first.file_stem()?;
    Some(first.with_file_name(stem))
}

/// Whether a path names a zip archive by extension.
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Compress `paths` into one archive and return its path.
pub async fn compress<T: ArchiveTool>(
    tool: &T,
    paths: &[PathBuf],
    password: Option<&str>,
) -> Result<PathBuf, ArchiveError> {
    let candidate = compress_target(paths).ok_or(ArchiveError::EmptySelection)?;
    let archive = unique_path(&candidate);
    let working_dir = common_parent(paths);
    let inputs = paths
        .iter()
        .map(|p| p.strip_prefix(&working_dir).unwrap_or(p).to_path_buf())
        .collect();

    let job = CompressJob {
        working_dir,
        archive: archive.clone(),
        inputs,
        password: password.map(str::to_string),
    };
    tracing::info!(archive = %archive.display(), entries = paths.len(), "compressing");
    tool.compress(&job).await?;
    Ok(archive)
}

/// Extract every zip in `paths` into one fresh directory.
///
/// All archives are extracted concurrently. If any extraction fails the
/// directory is removed, including whatever the other extractions wrote.
pub async fn decompress<T: ArchiveTool>(
    tool: &T,
    paths: &[PathBuf],
    password: Option<&str>,
) -> Result<Extracted, ArchiveError> {
    let archives: Vec<PathBuf> = paths.iter().filter(|p| is_zip(p)).cloned().collect();
    let candidate = decompress_target(&archives).ok_or(ArchiveError::NoArchiveSelected)?;
    let target = unique_path(&candidate);
    let working_dir = target.parent().map(Path::to_path_buf).unwrap_or_default();

    tokio::fs::create_dir(&target)
        .await
        .map_err(|e| HashzipError::io(&target, e))?;
    tracing::info!(target = %target.display(), archives = archives.len(), "extracting");

    let jobs: Vec<ExtractJob> = archives
        .iter()
        .map(|archive| ExtractJob {
            working_dir: working_dir.clone(),
            archive: archive.clone(),
            target: target.clone(),
            password: password.map(str::to_string),
        })
        .collect();
    let results = join_all(jobs.iter().map(|job| tool.extract(job))).await;

    if let Some(error) = results.into_iter().find_map(Result::err) {
        if let Err(e) = tokio::fs::remove_dir_all(&target).await {
            tracing::warn!(target = %target.display(), error = %e, "rollback failed");
        }
        return Err(ArchiveError::RolledBack { target, source: error });
    }

    Ok(Extracted { target, archives })
}

/// Deepest directory containing every path's parent.
fn common_parent(paths: &[PathBuf]) -> PathBuf {
    let mut parents = paths.iter().map(|p| p.parent().unwrap_or(Path::new("")));
    let Some(first) = parents.next() else {
        return PathBuf::new();
    };
    let mut common = first.to_path_buf();
    for parent in parents {
        while !parent.starts_with(&common) {
            if !common.pop() {
                return PathBuf::new();
            }
        }
    }
    common
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_target_single_file() {
        let target = compress_target(&[PathBuf::from("/m/a.mp4")]).unwrap();
        assert_eq!(target, PathBuf::from("/m/a.mp4.zip"));
    }

    #[test]
    fn test_compress_target_single_dir_with_trailing_slash() {
        let target = compress_target(&[PathBuf::from("/m/dir/")]).unwrap();
        assert_eq!(target, PathBuf::from("/m/dir.zip"));
    }

    #[test]
    fn test_compress_target_many() {
        let paths = ["/m/a.mp4", "/m/b.mp4", "/m/c.mp4"].map(PathBuf::from);
        assert_eq!(
            compress_target(&paths).unwrap(),
            PathBuf::from("/m/a (3 files).zip")
        );
        assert_eq!(compress_target(&[]), None);
    }

    #[test]
    fn test_decompress_target() {
        let target = decompress_target(&[PathBuf::from("/m/photos.ZIP")]).unwrap();
        assert_eq!(target, PathBuf::from("/m/photos"));
    }

    #[test]
    fn test_is_zip() {
        assert!(is_zip(Path::new("a.zip")));
        assert!(is_zip(Path::new("a.ZIP")));
        assert!(!is_zip(Path::new("a.zip.part")));
        assert!(!is_zip(Path::new("zip")));
    }

    #[test]
    fn test_common_parent() {
        let paths = ["/m/x/a.mp4", "/m/y/b.mp4", "/m/c.mp4"].map(PathBuf::from);
        assert_eq!(common_parent(&paths), PathBuf::from("/m"));
        let same = ["/m/a", "/m/b"].map(PathBuf::from);
        assert_eq!(common_parent(&same), PathBuf::from("/m"));
    }
}

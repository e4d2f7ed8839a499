//! Collision-free naming for output archives and extraction directories.

use std::path::{Path, PathBuf};

/// Return `path` if nothing exists there, otherwise the first free numbered variant.
///
/// For "movie.zip", tries "movie 2.zip", "movie 3.zip", etc. Only names the
/// path, never creates it.
pub fn unique_path(path: &Path) -> PathBuf {
    if !exists(path) {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    (2u64..)
        .map(|i| {
            let new_name = match &extension {
                Some(ext) => format!("{stem} {i}.{ext}"),
                None => format!("{stem} {i}"),
            };
            parent.join(new_name)
        })
        .find(|candidate| !exists(candidate))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Like `Path::exists` but also true for dangling symlinks.
fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

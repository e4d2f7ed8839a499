//! Reversible marker append/strip on a file's trailing bytes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use hashzip_core::{HashzipError, RemovalMode, Result};

/// Whether a marker operation changed the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerChange {
    Changed,
    Unchanged,
}

/// Append `marker` to the end of the file.
pub fn append_marker(path: &Path, marker: &str) -> Result<MarkerChange> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| HashzipError::io(path, e))?;
    file.write_all(marker.as_bytes())
        .map_err(|e| HashzipError::io(path, e))?;
    Ok(MarkerChange::Changed)
}

/// Strip `marker` from the file's last line; untouched if it does not end with it.
pub fn remove_marker(path: &Path, marker: &str, mode: RemovalMode) -> Result<MarkerChange> {
    let content = fs::read(path).map_err(|e| HashzipError::io(path, e))?;
    match strip_marker(&content, marker.as_bytes(), mode) {
        Some(stripped) => {
            fs::write(path, stripped).map_err(|e| HashzipError::io(path, e))?;
            Ok(MarkerChange::Changed)
        }
        None => Ok(MarkerChange::Unchanged),
    }
}

/// Compute the content with the marker stripped, or `None` when nothing changes.
pub fn strip_marker(content: &[u8], marker: &[u8], mode: RemovalMode) -> Option<Vec<u8>> {
    if marker.is_empty() {
        return None;
    }

    let line_start = content
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    let (head, last_line) = content.split_at(line_start);

    if !last_line.ends_with(marker) {
        return None;
    }

    let new_last = match mode {
        RemovalMode::Trailing => last_line[..last_line.len() - marker.len()].to_vec(),
        RemovalMode::LastLine => remove_all(last_line, marker),
    };

    let mut out = Vec::with_capacity(head.len() + new_last.len());
    out.extend_from_slice(head);
    out.extend_from_slice(&new_last);
    Some(out)
}

fn remove_all(haystack: &[u8], needle: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(needle) {
            i += needle.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

//! Song lookup by file-selector index.
//!
//! Songs are plain files whose names start with the selector index as two
//! hex digits, e.g. `2a-groove.mid` for index 42. Case is not significant.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Returns the first file in `directory` (by name) whose name starts with
/// `index` as two hex digits.
pub fn find_song(directory: &Path, index: u8) -> io::Result<Option<PathBuf>> {
    let prefix = format!("{:02x}", index);

    let mut candidates: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.get(..2))
                .is_some_and(|head| head.eq_ignore_ascii_case(&prefix))
        })
        .collect();

    candidates.sort();
    Ok(candidates.into_iter().next())
}

//! Directory listing and timestamp helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

/// Final path component as UTF-8, or `""`
#[must_use]
pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Sorted entries of `dir` whose file name satisfies `keep`.
///
/// A missing directory yields an empty list.
///
/// # Errors
///
/// Returns an IO error if `dir` exists but cannot be read.
pub fn list_entries<F>(dir: &Path, keep: F) -> io::Result<Vec<PathBuf>>
where
    F: Fn(&str, &Path) -> bool,
{
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if keep(file_name(&path), &path) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Sorted subdirectories of `dir` whose names satisfy `keep`
///
/// # Errors
///
/// See [`list_entries`].
pub fn list_dirs<F>(dir: &Path, keep: F) -> io::Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    list_entries(dir, |name, path| path.is_dir() && keep(name))
}

/// Sorted regular files in `dir` whose names satisfy `keep`
///
/// # Errors
///
/// See [`list_entries`].
pub fn list_files<F>(dir: &Path, keep: F) -> io::Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    list_entries(dir, |name, path| path.is_file() && keep(name))
}

/// Modification time of a path in UTC, truncated to whole seconds
#[must_use]
pub fn mtime(path: &Path) -> Option<NaiveDateTime> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    DateTime::<Utc>::from(modified).naive_utc().with_nanosecond(0)
}

/// Newest modification time of `dir` and every directory below it.
///
/// Directories change whenever an entry is added or removed, so this tracks
/// a runfolder that is still being written without visiting every file.
#[must_use]
pub fn newest_dir_mtime(dir: &Path) -> Option<NaiveDateTime> {
    let mut newest = mtime(dir);
    let mut pending = vec![dir.to_path_buf()];
    while let Some(next) = pending.pop() {
        let Ok(children) = list_dirs(&next, |_| true) else {
            continue;
        };
        for child in children.into_iter().filter(|c| !c.is_symlink()) {
            newest = newest.max(mtime(&child));
            pending.push(child);
        }
    }
    newest
}

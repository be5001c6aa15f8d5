//! Filesystem probes and path helpers.
//!
//! Every probe here degrades to a sentinel (`false` or `None`) instead of
//! returning an error. Callers treat a failed probe the same as a missing
//! path.

use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Check whether `path` exists and is a directory.
#[must_use]
pub fn is_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Check whether `path` exists and is a regular file.
#[must_use]
pub fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Read and parse a JSON file.
///
/// Returns `None` if the file is missing, unreadable, or not valid JSON.
#[must_use]
pub fn read_json(path: &Path) -> Option<Value> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Join path segments the way Node's `path.join` does.
///
/// Returns `None` when no segments are given or any segment is empty.
/// Later segments never reset the path to the root: `join_path(["foo/", "/bar"])`
/// is `foo/bar`. The result is lexically normalized.
#[must_use]
pub fn join_path<I, S>(segments: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<Path>,
{
    let mut joined = PathBuf::new();
    let mut count = 0usize;

    for segment in segments {
        let segment = segment.as_ref();
        if segment.as_os_str().is_empty() {
            return None;
        }
        for component in segment.components() {
            match component {
                Component::Prefix(_) | Component::RootDir if count > 0 => {}
                other => joined.push(other.as_os_str()),
            }
        }
        count += 1;
    }

    if count == 0 {
        return None;
    }
    Some(normalize_path(&joined))
}

/// Lexically normalize a path: drop `.` components and fold `..` into
/// the preceding component. Does not touch the filesystem.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// The file will either have the old contents or the new contents, never a
/// partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));

    // Same directory keeps the rename on one filesystem
    let mut temp_path = parent.to_path_buf();
    temp_path.push(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Windows refuses to rename over an existing file.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

//! Browsing and managing the files directory.
//!
//! All paths coming from clients are relative to a single root directory and
//! are resolved through [`resolve_path`], which refuses anything that could
//! step outside that root.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::FileError;
use crate::format::is_slice_file_name;

use super::cache::SliceCache;

// =============================================================================
// Listing types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub dirname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub filename: String,
    /// Path relative to the files directory, `/`-separated
    pub path: String,
    /// Only present for slice files that decode successfully
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_time_secs: Option<u32>,
    pub can_be_printed: bool,
}

/// Contents of one directory, each list sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub directories: Vec<DirectoryEntry>,
    pub files: Vec<FileEntry>,
}

// =============================================================================
// Path handling
// =============================================================================

/// Validate a client-supplied relative path.
///
/// Returns the path as a sequence of plain components. Absolute paths, `..`,
/// `.` and drive prefixes are all rejected.
pub fn normalize_relative(relative: &str) -> Result<PathBuf, FileError> {
    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            _ => return Err(FileError::InvalidPath(relative.to_string())),
        }
    }
    Ok(normalized)
}

/// Resolve a client-supplied relative path against `root`.
pub fn resolve_path(root: &Path, relative: &str) -> Result<PathBuf, FileError> {
    Ok(root.join(normalize_relative(relative)?))
}

/// `/`-separated form of a normalized relative path.
fn display_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reduce an uploaded file name to a safe, flat file name.
///
/// Path separators and whitespace become `_`, everything outside
/// `[A-Za-z0-9_.-]` is dropped and leading or trailing `.`/`_` are trimmed.
/// The result may be empty.
pub fn sanitize_filename(name: &str) -> String {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

// =============================================================================
// Operations
// =============================================================================

/// List one directory under `root`.
///
/// Slice files are decoded through `cache` to report their print time; a
/// file that fails to decode is still listed, without a print time.
pub async fn list_directory(
    root: &Path,
    relative: &str,
    cache: &SliceCache,
) -> Result<DirectoryListing, FileError> {
    let relative_path = normalize_relative(relative)?;
    let directory = root.join(&relative_path);
    let prefix = display_path(&relative_path);

    let mut entries = tokio::fs::read_dir(&directory)
        .await
        .map_err(|e| FileError::from_io(e, relative))?;

    let mut listing = DirectoryListing::default();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FileError::from_io(e, relative))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let entry_path = entry.path();

        // Follow symlinks
        let metadata = match tokio::fs::metadata(&entry_path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(entry = %name, error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        if metadata.is_dir() {
            listing.directories.push(DirectoryEntry { dirname: name });
            continue;
        }
        if !metadata.is_file() {
            continue;
        }

        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        let can_be_printed = is_slice_file_name(&name);
        let print_time_secs = if can_be_printed {
            match cache.load(&entry_path, &path).await {
                Ok(document) => Some(document.print_time_secs),
                Err(e) => {
                    debug!(file = %path, error = %e, "Listing slice file without metadata");
                    None
                }
            }
        } else {
            None
        };

        listing.files.push(FileEntry {
            filename: name,
            path,
            print_time_secs,
            can_be_printed,
        });
    }

    listing.directories.sort_by(|a, b| a.dirname.cmp(&b.dirname));
    listing.files.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(listing)
}

/// Store an uploaded file directly under `root`.
///
/// Returns the sanitized name the file was saved as.
///
/// # Errors
/// - `InvalidPath` if nothing usable is left of the name after sanitizing
/// - `UnsupportedExtension` if the name is not a slice file
pub async fn save_upload(root: &Path, original_name: &str, data: &[u8]) -> Result<String, FileError> {
    let filename = sanitize_filename(original_name);
    if filename.is_empty() {
        return Err(FileError::InvalidPath(original_name.to_string()));
    }
    if !is_slice_file_name(&filename) {
        return Err(FileError::UnsupportedExtension(filename));
    }

    tokio::fs::write(root.join(&filename), data)
        .await
        .map_err(|e| FileError::from_io(e, &filename))?;

    info!(file = %filename, bytes = data.len(), "Saved uploaded file");
    Ok(filename)
}

/// Delete a regular file under `root`.
///
/// # Errors
/// `NotAFile` if the path is missing or is not a regular file.
pub async fn delete_file(root: &Path, relative: &str) -> Result<(), FileError> {
    let path = resolve_path(root, relative)?;

    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(FileError::NotAFile(relative.to_string()));
    }

    tokio::fs::remove_file(&path)
        .await
        .map_err(|e| FileError::from_io(e, relative))?;

    info!(file = %relative, "Deleted file");
    Ok(())
}

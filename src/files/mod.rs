//! The files directory: browsing, uploads, deletion and decoded-file caching.
//!
//! Everything here is rooted at an explicit directory passed in by the caller;
//! there is no global storage location.

mod browse;
mod cache;

pub use browse::{
    delete_file, list_directory, normalize_relative, resolve_path, sanitize_filename, save_upload,
    DirectoryEntry, DirectoryListing, FileEntry,
};
pub use cache::{SliceCache, SliceCacheKey, DEFAULT_SLICE_CACHE_ENTRIES};

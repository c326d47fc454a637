//! Files directory tests.
//!
//! Tests verify:
//! - Listings mix slice files and other files, with print times from the cache
//! - Cache invalidation when a file is rewritten
//! - Upload and delete round trips on disk

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use mariner::error::FileError;
use mariner::files::{delete_file, list_directory, save_upload, SliceCache};

use super::test_utils::CtbBuilder;

#[tokio::test]
async fn test_listing_uses_cached_documents() {
    let dir = tempfile::tempdir().unwrap();
    CtbBuilder::new().print_time(100).write_to(dir.path(), "a.ctb");
    CtbBuilder::new().print_time(200).write_to(dir.path(), "b.cbddlp");
    std::fs::write(dir.path().join("notes.txt"), b"resin: grey").unwrap();

    let cache = SliceCache::new();
    let listing = list_directory(dir.path(), "", &cache).await.unwrap();

    let times: Vec<_> = listing
        .files
        .iter()
        .map(|f| (f.filename.as_str(), f.print_time_secs))
        .collect();
    assert_eq!(
        times,
        vec![("a.ctb", Some(100)), ("b.cbddlp", Some(200)), ("notes.txt", None)]
    );
    assert_eq!(cache.len().await, 2);

    // A second listing is served from the cache
    list_directory(dir.path(), "", &cache).await.unwrap();
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn test_rewritten_file_is_decoded_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = CtbBuilder::new().print_time(100).write_to(dir.path(), "part.ctb");

    let cache = SliceCache::new();
    let first = cache.load(&path, "part.ctb").await.unwrap();
    assert_eq!(first.print_time_secs, 100);

    CtbBuilder::new().print_time(300).write_to(dir.path(), "part.ctb");
    // Make sure the modification time moves even on coarse filesystems
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();

    let second = cache.load(&path, "part.ctb").await.unwrap();
    assert_eq!(second.print_time_secs, 300);
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_nested_listing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("functional/brackets")).unwrap();
    CtbBuilder::new().write_to(&dir.path().join("functional"), "stairs.ctb");

    let cache = SliceCache::new();
    let listing = list_directory(dir.path(), "functional", &cache)
        .await
        .unwrap();

    assert_eq!(listing.directories.len(), 1);
    assert_eq!(listing.directories[0].dirname, "brackets");
    assert_eq!(listing.files[0].path, "functional/stairs.ctb");
    assert!(listing.files[0].can_be_printed);
}

#[tokio::test]
async fn test_upload_then_delete() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = CtbBuilder::new().build();

    let saved = save_upload(dir.path(), "my part (v2).ctb", &bytes)
        .await
        .unwrap();
    assert_eq!(saved, "my_part_v2.ctb");
    assert_eq!(std::fs::read(dir.path().join(&saved)).unwrap(), bytes);

    delete_file(dir.path(), &saved).await.unwrap();
    assert!(matches!(
        delete_file(dir.path(), &saved).await,
        Err(FileError::NotAFile(_))
    ));
}

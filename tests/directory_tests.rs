#![cfg(unix)]
//! Integration tests for directory operations
//!
//! Covers recursive creation (including idempotence and relative paths),
//! enumeration, removal and the process working directory.

mod common;

use boundfs::directory::{
    change_working_directory, contents_of_directory, create_directory, file_exists,
    is_directory, remove_directory, remove_file, working_directory,
};
use boundfs::{Deadline, DeadlineFile, FileMode, SystemError};
use common::{path_in, path_str};
use std::fs;
use tempfile::TempDir;

/// Test: recursive creation builds the whole missing chain and is idempotent
#[compio::test]
async fn test_create_directory_with_intermediates() {
    let temp_dir = TempDir::new().unwrap();
    let deep = path_in(&temp_dir, "a/b/c/d");

    create_directory(&deep, true).await.unwrap();
    for rel in ["a", "a/b", "a/b/c", "a/b/c/d"] {
        assert!(temp_dir.path().join(rel).is_dir(), "{rel} missing");
    }

    // second call is a no-op
    create_directory(&deep, true).await.unwrap();
    assert!(is_directory(&deep).await);
}

/// Test: redundant slashes in the requested path are tolerated
#[compio::test]
async fn test_create_directory_with_messy_slashes() {
    let temp_dir = TempDir::new().unwrap();
    let messy = format!("{}//x///y//", path_str(temp_dir.path()));

    create_directory(&messy, true).await.unwrap();
    assert!(temp_dir.path().join("x/y").is_dir());
}

/// Test: an ancestor that is a regular file stops recursive creation
#[compio::test]
async fn test_create_directory_through_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("blocker"), b"").unwrap();

    let result = create_directory(&path_in(&temp_dir, "blocker/child"), true).await;
    assert!(result.is_err());
    assert!(!temp_dir.path().join("blocker/child").exists());
}

/// Test: plain creation fails on an existing directory
#[compio::test]
async fn test_create_directory_existing_without_intermediates() {
    let temp_dir = TempDir::new().unwrap();
    let dir = path_in(&temp_dir, "once");

    create_directory(&dir, false).await.unwrap();
    let err = create_directory(&dir, false).await.unwrap_err();
    assert_eq!(err.as_system(), Some(&SystemError::FileExists));
}

/// Test: enumeration lists every entry once and never `.` or `..`
#[compio::test]
async fn test_contents_of_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = path_in(&temp_dir, "listing");
    create_directory(&root, false).await.unwrap();

    assert!(contents_of_directory(&root).await.unwrap().is_empty());

    let mut expected = Vec::new();
    for i in 0..20 {
        let name = format!("entry-{i:02}");
        fs::write(temp_dir.path().join("listing").join(&name), b"").unwrap();
        expected.push(name);
    }
    fs::create_dir(temp_dir.path().join("listing/.hidden")).unwrap();
    expected.push(".hidden".to_string());

    let mut names = contents_of_directory(&root).await.unwrap();
    assert!(!names.iter().any(|n| n == "." || n == ".."));
    names.sort();
    expected.sort();
    assert_eq!(names, expected);
}

/// Test: listing a regular file surfaces the OS error
#[compio::test]
async fn test_contents_of_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("plain"), b"").unwrap();

    let err = contents_of_directory(&path_in(&temp_dir, "plain"))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_system(),
        Some(&SystemError::Other {
            code: libc::ENOTDIR
        })
    );
}

/// Test: files and directories are removed by their matching operation only
#[compio::test]
async fn test_remove_file_and_directory() {
    let temp_dir = TempDir::new().unwrap();
    let dir = path_in(&temp_dir, "d");
    let file = path_in(&temp_dir, "d/f.txt");

    create_directory(&dir, false).await.unwrap();
    let mut handle = DeadlineFile::open(file.clone(), FileMode::CreateWrite)
        .await
        .unwrap();
    handle.write(b"x", Deadline::Never).await.unwrap();
    handle.close().await.unwrap();

    // non-empty directory stays
    assert!(remove_directory(&dir).await.is_err());
    assert!(file_exists(&file).await);

    remove_file(&file).await.unwrap();
    assert!(!file_exists(&file).await);
    let err = remove_file(&file).await.unwrap_err();
    assert_eq!(err.as_system(), Some(&SystemError::NotFound));

    remove_directory(&dir).await.unwrap();
    assert!(!file_exists(&dir).await);
}

/// Test: working directory round trip
///
/// This is the only test in this binary that touches the process-wide
/// working directory, and it restores the original before returning.
#[compio::test]
async fn test_working_directory_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let original = working_directory().await.unwrap();
    assert!(original.starts_with('/'));

    let target = path_str(&temp_dir.path().canonicalize().unwrap());
    change_working_directory(&target).await.unwrap();
    let now = working_directory().await.unwrap();
    change_working_directory(&original).await.unwrap();

    assert_eq!(now, target);
    assert_eq!(working_directory().await.unwrap(), original);

    let err = change_working_directory(&path_in(&temp_dir, "missing"))
        .await
        .unwrap_err();
    assert_eq!(err.as_system(), Some(&SystemError::NotFound));
}

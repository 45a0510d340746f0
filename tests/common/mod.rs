//! Shared helpers for integration tests

use std::path::Path;
use tempfile::TempDir;

/// Path inside `dir` as the UTF-8 string the crate's API takes
#[allow(dead_code)]
pub fn path_in(dir: &TempDir, rel: &str) -> String {
    path_str(&dir.path().join(rel))
}

/// A `Path` as an owned UTF-8 string
#[allow(dead_code)]
pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Deterministic, non-repeating-looking test payload
#[allow(dead_code)]
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#![cfg(unix)]
//! End-to-end tests for the `boundfs` binary

mod common;

use assert_cmd::Command;
use common::path_in;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn boundfs() -> Command {
    Command::cargo_bin("boundfs").unwrap()
}

#[test]
fn test_write_then_cat() {
    let temp_dir = TempDir::new().unwrap();
    let file = path_in(&temp_dir, "out.txt");

    boundfs()
        .args(["write", &file, "--timeout-ms", "5000"])
        .write_stdin("hello from stdin\n")
        .assert()
        .success();

    boundfs()
        .args(["cat", &file, "--chunk-size", "4"])
        .assert()
        .success()
        .stdout("hello from stdin\n");
}

#[test]
fn test_write_append_and_exclusive() {
    let temp_dir = TempDir::new().unwrap();
    let file = path_in(&temp_dir, "log.txt");

    boundfs()
        .args(["write", &file, "--exclusive"])
        .write_stdin("one\n")
        .assert()
        .success();
    boundfs()
        .args(["write", &file, "--append"])
        .write_stdin("two\n")
        .assert()
        .success();
    boundfs()
        .args(["write", &file, "--exclusive"])
        .write_stdin("three\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("file exists"));

    assert_eq!(fs::read_to_string(&file).unwrap(), "one\ntwo\n");
}

#[test]
fn test_mkdir_ls_rm_rmdir() {
    let temp_dir = TempDir::new().unwrap();
    let nested = path_in(&temp_dir, "p/q");

    boundfs().args(["mkdir", &nested]).assert().failure();
    boundfs().args(["mkdir", "-p", &nested]).assert().success();
    boundfs().args(["mkdir", "-p", &nested]).assert().success();

    fs::write(temp_dir.path().join("p/q/b.txt"), b"").unwrap();
    fs::write(temp_dir.path().join("p/q/a.txt"), b"").unwrap();

    boundfs()
        .args(["ls", &nested])
        .assert()
        .success()
        .stdout("a.txt\nb.txt\n");

    boundfs()
        .args(["rm", &path_in(&temp_dir, "p/q/a.txt")])
        .assert()
        .success();
    boundfs().args(["rmdir", &nested]).assert().failure();
    boundfs()
        .args(["rm", &path_in(&temp_dir, "p/q/b.txt")])
        .assert()
        .success();
    boundfs().args(["rmdir", &nested]).assert().success();
    assert!(!temp_dir.path().join("p/q").exists());
}

#[test]
fn test_exists_and_is_dir() {
    let temp_dir = TempDir::new().unwrap();
    let dir = path_in(&temp_dir, "");

    boundfs()
        .args(["exists", &dir])
        .assert()
        .success()
        .stdout("true\n");
    boundfs()
        .args(["is-dir", &dir])
        .assert()
        .success()
        .stdout("true\n");
    boundfs()
        .args(["exists", &path_in(&temp_dir, "nothing")])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn test_path_commands() {
    boundfs()
        .args(["normalize", "//usr///lib//"])
        .assert()
        .success()
        .stdout("/usr/lib\n");
    boundfs()
        .args(["dirname", "/a/b/c"])
        .assert()
        .success()
        .stdout("/a/b\n");
    boundfs()
        .args(["dirname", "a"])
        .assert()
        .success()
        .stdout("\n");
}

#[test]
fn test_pwd_runs_in_current_dir() {
    let temp_dir = TempDir::new().unwrap();
    let canonical = temp_dir.path().canonicalize().unwrap();

    boundfs()
        .current_dir(&canonical)
        .arg("pwd")
        .assert()
        .success()
        .stdout(format!("{}\n", canonical.display()));
}

#[test]
fn test_invalid_options_rejected() {
    boundfs()
        .args(["pwd", "--quiet", "--verbose"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--quiet"));
    boundfs()
        .args(["cat", "x", "--chunk-size", "0"])
        .assert()
        .failure();
}

#[test]
fn test_cat_missing_file_reports_error() {
    let temp_dir = TempDir::new().unwrap();
    boundfs()
        .args(["cat", &path_in(&temp_dir, "missing.txt")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

//! Path-level directory operations
//!
//! Handle-less operations on the filesystem namespace. Syscalls that have
//! an io_uring opcode (mkdir, unlink, rmdir) go through `compio::fs`; the
//! rest (stat, lstat, opendir/readdir, getcwd, chdir) run on the runtime's
//! blocking pool so they never stall other tasks.
//!
//! The working directory is process-global state. Changing it affects every
//! task in the process, so prefer passing absolute paths around over
//! calling [`change_working_directory`] from concurrent tasks.

use crate::deadline::blocking;
use crate::error::{Result, SystemError};
use crate::path::drop_last_path_component;
use nix::dir::Dir;
use nix::fcntl::OFlag;
use nix::sys::stat::{FileStat, Mode, SFlag};
use std::path::Path;
use tracing::debug;

/// Current working directory of the process as an absolute path
///
/// Non-UTF-8 bytes in the path are replaced with `U+FFFD`.
///
/// # Errors
///
/// Returns the classified OS error from `getcwd(3)`, e.g.
/// [`SystemError::NotFound`] if the directory has been removed.
pub async fn working_directory() -> Result<String> {
    blocking(|| {
        let cwd = nix::unistd::getcwd()?;
        Ok(cwd.to_string_lossy().into_owned())
    })
    .await
}

/// Change the working directory of the whole process
///
/// # Errors
///
/// Returns the classified OS error from `chdir(2)`.
pub async fn change_working_directory(path: &str) -> Result<()> {
    let path = path.to_string();
    blocking(move || {
        nix::unistd::chdir(Path::new(&path))?;
        debug!("Changed working directory to {}", path);
        Ok(())
    })
    .await
}

/// Names of the entries in a directory
///
/// `.` and `..` are never included. Order is whatever the OS returns.
/// Names that are not valid UTF-8 are skipped. The directory stream is
/// closed before this returns, on success and on error.
///
/// # Errors
///
/// Returns the classified OS error if the directory cannot be opened or
/// read; an unopenable directory is an error, not an empty listing.
pub async fn contents_of_directory(path: &str) -> Result<Vec<String>> {
    let path = path.to_string();
    blocking(move || {
        // Dir closes the stream when dropped
        let mut dir = Dir::open(
            Path::new(&path),
            OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )?;

        let mut contents = Vec::new();
        for entry in dir.iter() {
            let entry = entry?;
            let name = entry.file_name().to_bytes();
            if name == b"." || name == b".." {
                continue;
            }
            match std::str::from_utf8(name) {
                Ok(name) => contents.push(name.to_string()),
                Err(_) => debug!(
                    "Skipping non-UTF-8 entry {} in {}",
                    String::from_utf8_lossy(name),
                    path
                ),
            }
        }
        Ok(contents)
    })
    .await
}

/// Whether anything exists at `path`, without following symlinks
///
/// A dangling symlink exists.
pub async fn file_exists(path: &str) -> bool {
    let path = path.to_string();
    blocking(move || {
        nix::sys::stat::lstat(Path::new(&path))?;
        Ok(())
    })
    .await
    .is_ok()
}

/// Whether `path` is a directory
///
/// A symlink is followed one level: a link to a directory counts, a
/// dangling link does not.
pub async fn is_directory(path: &str) -> bool {
    let path = path.to_string();
    blocking(move || {
        let path = Path::new(&path);
        let stat = nix::sys::stat::lstat(path)?;
        if file_type(&stat) == SFlag::S_IFLNK {
            return Ok(file_type(&nix::sys::stat::stat(path)?) == SFlag::S_IFDIR);
        }
        Ok(file_type(&stat) == SFlag::S_IFDIR)
    })
    .await
    .unwrap_or(false)
}

fn file_type(stat: &FileStat) -> SFlag {
    SFlag::from_bits_truncate(stat.st_mode) & SFlag::S_IFMT
}

/// Create a directory, optionally with its missing ancestors
///
/// New directories get mode `0o777` less the process umask.
///
/// With `with_intermediate_directories`, an existing directory at `path`
/// is a successful no-op, and ancestors are created parent-first until an
/// existing prefix is reached. Ancestors are found with
/// [`drop_last_path_component`], so `path` may contain redundant slashes.
/// A concurrent creator racing on the same ancestors is tolerated.
///
/// # Errors
///
/// Returns [`SystemError::FileExists`] if `path` (or, with intermediates,
/// an ancestor) exists but is not a directory, otherwise the classified OS
/// error from `mkdir(2)`.
pub async fn create_directory(path: &str, with_intermediate_directories: bool) -> Result<()> {
    if !with_intermediate_directories {
        compio::fs::create_dir(path).await?;
        return Ok(());
    }

    if file_exists(path).await {
        return if is_directory(path).await {
            Ok(())
        } else {
            Err(SystemError::FileExists.into())
        };
    }

    // Collect missing ancestors nearest-first, stopping at the first prefix
    // that exists (or at the root / an empty relative parent)
    let mut missing = vec![path.to_string()];
    let mut current = drop_last_path_component(path);
    while !current.is_empty() && current != "/" && !file_exists(&current).await {
        let parent = drop_last_path_component(&current);
        missing.push(current);
        current = parent;
    }

    for dir in missing.iter().rev() {
        debug!("Creating directory {}", dir);
        if let Err(e) = compio::fs::create_dir(dir).await {
            if e.kind() != std::io::ErrorKind::AlreadyExists || !is_directory(dir).await {
                return Err(e.into());
            }
            debug!("Directory {} appeared concurrently", dir);
        }
    }
    Ok(())
}

/// Remove a single non-directory entry
///
/// # Errors
///
/// Returns the classified OS error from `unlink(2)`; removing a directory
/// fails (`EISDIR` on Linux, `EPERM` elsewhere).
pub async fn remove_file(path: &str) -> Result<()> {
    compio::fs::remove_file(path).await?;
    Ok(())
}

/// Remove an empty directory
///
/// Not recursive: a directory with entries fails with `ENOTEMPTY`.
///
/// # Errors
///
/// Returns the classified OS error from `rmdir(2)`.
pub async fn remove_directory(path: &str) -> Result<()> {
    compio::fs::remove_dir(path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn join(dir: &TempDir, rel: &str) -> String {
        dir.path().join(rel).to_string_lossy().into_owned()
    }

    #[compio::test]
    async fn test_contents_excludes_dot_entries() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let mut names = contents_of_directory(&join(&temp_dir, ""))
            .await
            .unwrap();
        names.sort();
        assert_eq!(names, vec!["a.txt".to_string(), "sub".to_string()]);
    }

    #[compio::test]
    async fn test_contents_of_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = contents_of_directory(&join(&temp_dir, "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.as_system(), Some(&SystemError::NotFound));
    }

    #[compio::test]
    async fn test_is_directory_follows_one_symlink() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("real"), temp_dir.path().join("link"))
            .unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("gone"), temp_dir.path().join("dangling"))
            .unwrap();

        assert!(is_directory(&join(&temp_dir, "real")).await);
        assert!(is_directory(&join(&temp_dir, "link")).await);
        assert!(!is_directory(&join(&temp_dir, "dangling")).await);
        assert!(file_exists(&join(&temp_dir, "dangling")).await);
        assert!(!file_exists(&join(&temp_dir, "gone")).await);
    }

    #[compio::test]
    async fn test_create_directory_without_intermediates_needs_parent() {
        let temp_dir = TempDir::new().unwrap();
        let err = create_directory(&join(&temp_dir, "x/y"), false)
            .await
            .unwrap_err();
        assert_eq!(err.as_system(), Some(&SystemError::NotFound));
    }

    #[compio::test]
    async fn test_create_directory_over_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("plain"), b"").unwrap();

        let err = create_directory(&join(&temp_dir, "plain"), true)
            .await
            .unwrap_err();
        assert_eq!(err.as_system(), Some(&SystemError::FileExists));
    }

    #[compio::test]
    async fn test_remove_file_rejects_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("d")).unwrap();
        assert!(remove_file(&join(&temp_dir, "d")).await.is_err());
        assert!(temp_dir.path().join("d").is_dir());
    }
}

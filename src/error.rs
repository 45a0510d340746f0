//! Error types and OS error translation
//!
//! Every failing syscall in this crate reports a platform error number.
//! This module is the only place that inspects those numbers: it folds them
//! into the small closed set of [`SystemError`] kinds that the rest of the
//! crate (and its callers) match on.

use nix::errno::Errno;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for file and directory operations
#[derive(Debug, Error)]
pub enum Error {
    /// An OS-level failure, already classified
    #[error(transparent)]
    System(#[from] SystemError),

    /// An operation on a stream that can no longer be used
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// A blocking helper task panicked before producing a result
    #[error("blocking task failed: {0}")]
    SpawnJoin(String),
}

/// Classified OS-level failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SystemError {
    /// The target already exists (`EEXIST`)
    #[error("file exists")]
    FileExists,

    /// The target does not exist (`ENOENT`)
    #[error("no such file or directory")]
    NotFound,

    /// Access was refused (`EACCES`)
    #[error("permission denied")]
    PermissionDenied,

    /// The caller's deadline elapsed before the operation completed (`ETIMEDOUT`)
    ///
    /// The underlying request may still complete after this is reported.
    #[error("operation timed out")]
    TimedOut,

    /// The OS accepted fewer bytes than requested
    ///
    /// Treated as a generic I/O failure (`EIO`); the write is not retried.
    #[error("short write: {written} of {expected} bytes written")]
    ShortWrite {
        /// Bytes the OS reported as written
        written: usize,
        /// Bytes the caller asked to write
        expected: usize,
    },

    /// Any other OS error number
    #[error("system error: {}", std::io::Error::from_raw_os_error(*code))]
    Other {
        /// Raw errno value
        code: i32,
    },
}

/// Failures tied to the state of a stream rather than to the OS
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The handle was closed before the operation was attempted
    ///
    /// `buffer` holds whatever content had been accumulated by the failing
    /// operation before the closed state was detected.
    #[error("closed stream ({} buffered bytes)", buffer.len())]
    ClosedStream {
        /// Content accumulated before the close was detected
        buffer: Vec<u8>,
    },
}

impl SystemError {
    /// Classify a raw errno value
    #[must_use]
    pub const fn from_errno(code: i32) -> Self {
        match code {
            libc::EEXIST => Self::FileExists,
            libc::ENOENT => Self::NotFound,
            libc::EACCES => Self::PermissionDenied,
            libc::ETIMEDOUT => Self::TimedOut,
            code => Self::Other { code },
        }
    }

    /// The errno equivalent of this error
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::FileExists => libc::EEXIST,
            Self::NotFound => libc::ENOENT,
            Self::PermissionDenied => libc::EACCES,
            Self::TimedOut => libc::ETIMEDOUT,
            Self::ShortWrite { .. } => libc::EIO,
            Self::Other { code } => *code,
        }
    }
}

impl From<Errno> for SystemError {
    fn from(errno: Errno) -> Self {
        Self::from_errno(errno as i32)
    }
}

impl From<std::io::Error> for SystemError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        if let Some(code) = err.raw_os_error() {
            return Self::from_errno(code);
        }

        // Errors synthesized by std or the runtime carry no errno
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::PermissionDenied => Self::PermissionDenied,
            ErrorKind::AlreadyExists => Self::FileExists,
            ErrorKind::TimedOut => Self::TimedOut,
            ErrorKind::InvalidInput => Self::Other { code: libc::EINVAL },
            _ => Self::Other { code: libc::EIO },
        }
    }
}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        Self::System(errno.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::System(err.into())
    }
}

impl From<SystemError> for std::io::Error {
    fn from(err: SystemError) -> Self {
        Self::from_raw_os_error(err.code())
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::System(e) => e.into(),
            other => Self::other(other),
        }
    }
}

impl Error {
    /// Construct the closed-stream error with no buffered content
    #[must_use]
    pub const fn closed_stream() -> Self {
        Self::Stream(StreamError::ClosedStream { buffer: Vec::new() })
    }

    /// The classified system error, if this is one
    #[must_use]
    pub const fn as_system(&self) -> Option<&SystemError> {
        match self {
            Self::System(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the caller's deadline elapsed
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::System(SystemError::TimedOut))
    }

    /// Whether the handle was already closed
    #[must_use]
    pub const fn is_closed_stream(&self) -> bool {
        matches!(self, Self::Stream(StreamError::ClosedStream { .. }))
    }
}

/// Map a compio/std join failure from a blocking task into an [`Error`]
pub(crate) fn spawn_join_error<E: std::fmt::Debug>(err: E) -> Error {
    Error::SpawnJoin(format!("{err:?}"))
}

//! # boundfs
//!
//! Deadline-bounded file I/O for the compio runtime, with:
//! - [`DeadlineFile`]: an owned file handle with a cursor, where every
//!   blocking read, write and flush gives up waiting at a [`Deadline`]
//! - [`directory`]: handle-less namespace operations (working directory,
//!   existence checks, recursive creation, enumeration, removal)
//! - [`path`]: pure slash normalization and parent-path helpers
//! - [`error`]: the small error taxonomy every OS failure is mapped into
//!
//! A deadline bounds how long the calling task waits, not how long the OS
//! works on the request. A timed-out operation may still complete later.
//!
//! ## Example
//!
//! ```rust,no_run
//! use boundfs::{directory, Deadline, DeadlineFile, FileMode};
//! use std::time::Duration;
//!
//! # async fn example() -> boundfs::Result<()> {
//! directory::create_directory("/tmp/boundfs/demo", true).await?;
//!
//! let mut file = DeadlineFile::open("/tmp/boundfs/demo/data.txt", FileMode::TruncateWrite).await?;
//! file.write(b"payload", Deadline::after(Duration::from_millis(500))).await?;
//! file.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod deadline;
pub mod directory;
pub mod error;
pub mod file;
pub mod mode;
pub mod path;

pub use deadline::Deadline;
pub use error::{Error, Result, StreamError, SystemError};
pub use file::{DeadlineFile, DEFAULT_CHUNK_SIZE};
pub use mode::FileMode;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Command-line interface definitions
//!
//! Options are grouped by the part of the program that consumes them: the
//! I/O settings feed every [`crate::DeadlineFile`] call, the output
//! settings feed logging initialization.

use crate::{Deadline, FileMode, DEFAULT_CHUNK_SIZE};
use anyhow::Result;
use clap::{Parser, Subcommand};

/// Deadline-bounded file and directory operations
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Operation to perform
    #[command(subcommand)]
    pub command: Command,

    /// I/O configuration (deadlines, chunking)
    #[command(flatten)]
    pub io: IoConfig,

    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,
}

/// Operations exposed on the command line
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the working directory
    Pwd,
    /// List directory entries, one per line
    Ls {
        /// Directory to list
        #[arg(default_value = ".")]
        path: String,
    },
    /// Print a file's contents
    Cat {
        /// File to read
        path: String,
    },
    /// Copy standard input into a file
    Write {
        /// File to write
        path: String,
        /// Append instead of truncating
        #[arg(long, conflicts_with = "exclusive")]
        append: bool,
        /// Fail if the file already exists
        #[arg(long)]
        exclusive: bool,
    },
    /// Create a directory
    Mkdir {
        /// Directory to create
        path: String,
        /// Create missing parents; succeed if the directory exists
        #[arg(short, long)]
        parents: bool,
    },
    /// Remove a file
    Rm {
        /// File to remove
        path: String,
    },
    /// Remove an empty directory
    Rmdir {
        /// Directory to remove
        path: String,
    },
    /// Print whether anything exists at a path (symlinks not followed)
    Exists {
        /// Path to check
        path: String,
    },
    /// Print whether a path is a directory (one symlink level followed)
    IsDir {
        /// Path to check
        path: String,
    },
    /// Print a path with redundant and trailing slashes removed
    Normalize {
        /// Path to normalize
        path: String,
    },
    /// Print a path with its last component removed
    Dirname {
        /// Path to shorten
        path: String,
    },
}

impl Command {
    /// Open mode for the `write` subcommand
    #[must_use]
    pub const fn write_mode(append: bool, exclusive: bool) -> FileMode {
        match (append, exclusive) {
            (_, true) => FileMode::CreateWrite,
            (true, false) => FileMode::AppendWrite,
            (false, false) => FileMode::TruncateWrite,
        }
    }
}

/// I/O configuration
///
/// Used by: every file operation issued from `main()`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "I/O Options")]
pub struct IoConfig {
    /// Per-operation deadline in milliseconds (default: wait forever)
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<f64>,

    /// Chunk size in bytes for whole-file reads
    #[arg(long, global = true, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl IoConfig {
    /// A fresh deadline for the next operation
    #[must_use]
    pub fn deadline(&self) -> Deadline {
        self.timeout_ms.map_or(Deadline::Never, Deadline::in_millis)
    }
}

/// Output and logging configuration
///
/// Used by: logging initialization in `main()`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl OutputConfig {
    /// Maximum log level implied by the flags
    #[must_use]
    pub const fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Both --quiet and --verbose options are used
    /// - The chunk size is 0
    /// - The timeout is negative or not a number
    pub fn validate(&self) -> Result<()> {
        if self.output.quiet && self.output.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        if self.io.chunk_size == 0 {
            anyhow::bail!("Chunk size must be greater than 0");
        }

        if let Some(timeout) = self.io.timeout_ms {
            if timeout.is_nan() || timeout < 0.0 {
                anyhow::bail!("Timeout must be a non-negative number of milliseconds, got: {timeout}");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("boundfs").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["pwd"]);
        assert_eq!(args.command, Command::Pwd);
        assert_eq!(args.io.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(args.io.deadline(), Deadline::Never);
        assert_eq!(args.output.log_level(), tracing::Level::WARN);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = parse(&["cat", "f.txt", "--timeout-ms", "250", "-vv"]);
        assert_eq!(
            args.command,
            Command::Cat {
                path: "f.txt".to_string()
            }
        );
        assert!(matches!(args.io.deadline(), Deadline::At(_)));
        assert_eq!(args.output.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_validate_rejects_conflicts() {
        assert!(parse(&["pwd", "-q", "-v"]).validate().is_err());
        assert!(parse(&["pwd", "--chunk-size", "0"]).validate().is_err());
        assert!(parse(&["pwd", "--timeout-ms=-1"]).validate().is_err());
        assert!(parse(&["pwd", "--timeout-ms", "NaN"]).validate().is_err());
    }

    #[test]
    fn test_write_flags_conflict() {
        let result = Args::try_parse_from(["boundfs", "write", "f", "--append", "--exclusive"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_write_mode() {
        assert_eq!(Command::write_mode(false, false), FileMode::TruncateWrite);
        assert_eq!(Command::write_mode(true, false), FileMode::AppendWrite);
        assert_eq!(Command::write_mode(false, true), FileMode::CreateWrite);
    }
}

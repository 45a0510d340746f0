//! Open intents and their OS flag mapping

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

/// Permission bits applied when an open creates the file (`0o644`)
///
/// Owner read/write, group read, other read. Subject to the process umask.
pub const CREATE_PERMISSIONS: Mode = Mode::S_IRUSR
    .union(Mode::S_IWUSR)
    .union(Mode::S_IRGRP)
    .union(Mode::S_IROTH);

/// What the caller intends to do with a file it opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileMode {
    /// Read only; the file must exist
    #[default]
    Read,
    /// Write only; create the file, failing if it already exists
    CreateWrite,
    /// Write only; create or truncate
    TruncateWrite,
    /// Write only; create if missing, every write goes to the end
    AppendWrite,
    /// Read and write; the file must exist
    ReadWrite,
    /// Read and write; create the file, failing if it already exists
    CreateReadWrite,
    /// Read and write; create or truncate
    TruncateReadWrite,
    /// Read and write; create if missing, every write goes to the end
    AppendReadWrite,
}

impl FileMode {
    /// Every mode, in declaration order
    pub const ALL: [Self; 8] = [
        Self::Read,
        Self::CreateWrite,
        Self::TruncateWrite,
        Self::AppendWrite,
        Self::ReadWrite,
        Self::CreateReadWrite,
        Self::TruncateReadWrite,
        Self::AppendReadWrite,
    ];

    /// The `open(2)` flags for this mode
    #[must_use]
    pub const fn flags(self) -> OFlag {
        match self {
            Self::Read => OFlag::O_RDONLY,
            Self::CreateWrite => OFlag::O_WRONLY.union(OFlag::O_CREAT).union(OFlag::O_EXCL),
            Self::TruncateWrite => OFlag::O_WRONLY.union(OFlag::O_CREAT).union(OFlag::O_TRUNC),
            Self::AppendWrite => OFlag::O_WRONLY.union(OFlag::O_CREAT).union(OFlag::O_APPEND),
            Self::ReadWrite => OFlag::O_RDWR,
            Self::CreateReadWrite => OFlag::O_RDWR.union(OFlag::O_CREAT).union(OFlag::O_EXCL),
            Self::TruncateReadWrite => OFlag::O_RDWR.union(OFlag::O_CREAT).union(OFlag::O_TRUNC),
            Self::AppendReadWrite => OFlag::O_RDWR.union(OFlag::O_CREAT).union(OFlag::O_APPEND),
        }
    }

    /// Whether reads are permitted
    #[must_use]
    pub const fn is_readable(self) -> bool {
        !matches!(
            self,
            Self::CreateWrite | Self::TruncateWrite | Self::AppendWrite
        )
    }

    /// Whether writes are permitted
    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Whether writes always land at the end of the file
    #[must_use]
    pub const fn is_append(self) -> bool {
        matches!(self, Self::AppendWrite | Self::AppendReadWrite)
    }
}

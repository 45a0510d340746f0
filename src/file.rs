//! Deadline-bounded file handle
//!
//! [`DeadlineFile`] owns one open descriptor and keeps its own cursor. All
//! data transfer is positional (`pread`/`pwrite`-style through compio), so
//! the cursor only moves once an operation has completed. A read or write
//! that times out leaves the cursor where it was, even if the kernel later
//! finishes the request in the background.
//!
//! Descriptors that cannot seek (pipes, sockets, terminals) have no
//! position to read at. For those the handle waits for readiness with
//! `poll(2)` until the deadline and then reads or writes the stream
//! directly; end of file is a read that returns nothing.
//!
//! Methods that change handle state take `&mut self`. Sharing one handle
//! between tasks therefore needs the caller's own synchronisation, and no
//! locking happens here.

use crate::deadline::{blocking, bounded, Deadline};
use crate::error::{Error, Result, StreamError, SystemError};
use crate::mode::{FileMode, CREATE_PERMISSIONS};
use compio::fs::File;
use compio::io::{AsyncReadAt, AsyncWriteAt};
use compio::BufResult;
use nix::errno::Errno;
use nix::fcntl::{FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd::Whence;
use std::cell::OnceCell;
use std::io::{ErrorKind, Read, SeekFrom, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::path::Path;
use tracing::{debug, warn};

/// Chunk size used by [`DeadlineFile::read_all`] when none is given
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// An open file whose blocking operations honour a [`Deadline`]
///
/// Dropping a handle that was never closed releases the descriptor the
/// same way [`DeadlineFile::close`] would, but any close error is lost.
/// Call `close` explicitly to observe it.
///
/// # Example
///
/// ```rust,no_run
/// use boundfs::{Deadline, DeadlineFile, FileMode};
/// use std::time::Duration;
///
/// # async fn example() -> boundfs::Result<()> {
/// let mut file = DeadlineFile::open("notes.txt", FileMode::TruncateReadWrite).await?;
/// let deadline = Deadline::after(Duration::from_secs(2));
/// file.write(b"hello", deadline).await?;
/// file.seek(0)?;
/// let contents = file.read_all(4096, deadline).await?;
/// assert_eq!(contents, b"hello");
/// file.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DeadlineFile {
    /// The descriptor; `None` once the handle is closed
    file: Option<File>,
    /// Position for the next read or write
    cursor: u64,
    /// Set only when opened by path
    path: Option<String>,
    /// Set only when opened by path
    mode: Option<FileMode>,
    /// Writes land at end of file regardless of the cursor
    append: bool,
    /// `false` for pipes, sockets and other stream descriptors
    seekable: bool,
    /// The last stream read returned nothing
    at_eof: bool,
    /// Computed on first access
    extension: OnceCell<Option<String>>,
}

impl DeadlineFile {
    /// Open `path` with the flags for `mode`
    ///
    /// Files created by the open get [`CREATE_PERMISSIONS`]. The path is
    /// used exactly as given; normalize it first with [`crate::path`] if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns a [`SystemError`] if `open(2)` fails, for example
    /// [`SystemError::NotFound`], [`SystemError::PermissionDenied`], or
    /// [`SystemError::FileExists`] for the exclusive-create modes.
    pub async fn open(path: impl Into<String>, mode: FileMode) -> Result<Self> {
        let path = path.into();
        let target = path.clone();

        let (fd, seekable) = blocking(move || {
            // O_CLOEXEC keeps the descriptor out of child processes
            let raw = nix::fcntl::open(
                Path::new(&target),
                mode.flags() | OFlag::O_CLOEXEC,
                CREATE_PERMISSIONS,
            )?;
            // SAFETY: open(2) just returned this descriptor and nothing else owns it
            let fd = unsafe { OwnedFd::from_raw_fd(raw) };
            let seekable = stream_offset(raw)?.is_some();
            Ok((fd, seekable))
        })
        .await?;

        debug!("Opened {} as {:?} (fd {})", path, mode, fd.as_raw_fd());
        Ok(Self::from_owned(
            fd,
            0,
            Some(path),
            Some(mode),
            mode.is_append(),
            seekable,
        ))
    }

    /// Wrap an already-open descriptor
    ///
    /// The handle takes ownership of `fd`. No path is known, so
    /// [`DeadlineFile::path`] and [`DeadlineFile::file_extension`] return
    /// `None`. The cursor starts at the descriptor's current offset, or 0
    /// for descriptors that cannot seek.
    ///
    /// # Errors
    ///
    /// Returns a [`SystemError`] if the descriptor is not valid.
    pub fn attach(fd: OwnedFd) -> Result<Self> {
        let raw = fd.as_raw_fd();
        let flags = OFlag::from_bits_truncate(nix::fcntl::fcntl(raw, FcntlArg::F_GETFL)?);
        let offset = stream_offset(raw)?;

        match offset {
            Some(cursor) => debug!("Attached fd {} at offset {}", raw, cursor),
            None => debug!("Attached fd {} as a stream", raw),
        }
        Ok(Self::from_owned(
            fd,
            offset.unwrap_or(0),
            None,
            None,
            flags.contains(OFlag::O_APPEND),
            offset.is_some(),
        ))
    }

    fn from_owned(
        fd: OwnedFd,
        cursor: u64,
        path: Option<String>,
        mode: Option<FileMode>,
        append: bool,
        seekable: bool,
    ) -> Self {
        // SAFETY: ownership of the descriptor moves from `fd` into the compio file
        let file = unsafe { File::from_raw_fd(fd.into_raw_fd()) };
        Self {
            file: Some(file),
            cursor,
            path,
            mode,
            append,
            seekable,
            at_eof: false,
            extension: OnceCell::new(),
        }
    }

    /// The path this handle was opened with, if any
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The mode this handle was opened with, `None` when attached
    #[must_use]
    pub const fn mode(&self) -> Option<FileMode> {
        self.mode
    }

    /// Whether [`DeadlineFile::close`] has been called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// The raw descriptor while the handle is open
    #[must_use]
    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.file.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Whether the descriptor has a position (`false` for pipes and sockets)
    #[must_use]
    pub const fn is_seekable(&self) -> bool {
        self.seekable
    }

    fn open_file(&self) -> Result<&File> {
        self.file.as_ref().ok_or_else(Error::closed_stream)
    }

    /// A duplicate of the descriptor that a pool thread can own
    fn stream_fd(&self) -> Result<OwnedFd> {
        let file = self.open_file()?;
        // SAFETY: `file` keeps the descriptor open while it is borrowed here
        let borrowed = unsafe { BorrowedFd::borrow_raw(file.as_raw_fd()) };
        Ok(borrowed.try_clone_to_owned()?)
    }

    /// Read up to `buf.len()` bytes at the cursor
    ///
    /// Returns the number of bytes read; `0` means end of file. An empty
    /// `buf` returns `0` without touching the OS. Any OS failure behind a
    /// zero-byte read is reported as an error, never as end of file.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ClosedStream`] on a closed handle,
    /// [`SystemError::TimedOut`] if `deadline` elapses (the cursor does not
    /// move), or the classified OS error.
    pub async fn read(&mut self, buf: &mut [u8], deadline: Deadline) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let chunk = self.read_chunk(buf.len(), deadline).await?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    /// Read up to `max_len` bytes at the cursor into a fresh buffer
    ///
    /// An empty result means end of file.
    ///
    /// # Errors
    ///
    /// Same as [`DeadlineFile::read`].
    pub async fn read_chunk(&mut self, max_len: usize, deadline: Deadline) -> Result<Vec<u8>> {
        if max_len == 0 {
            return Ok(Vec::new());
        }

        let buffer = if self.seekable {
            let file = self.open_file()?;
            let BufResult(result, mut buffer) =
                bounded(deadline, file.read_at(Vec::with_capacity(max_len), self.cursor)).await?;
            buffer.truncate(result?);
            buffer
        } else {
            let fd = self.stream_fd()?;
            blocking(move || stream_read(fd, max_len, deadline)).await?
        };

        self.at_eof = buffer.is_empty();
        self.cursor += buffer.len() as u64;
        Ok(buffer)
    }

    /// Read from the cursor to end of file
    ///
    /// Reads `chunk_size` bytes at a time (`0` means [`DEFAULT_CHUNK_SIZE`])
    /// until a read returns nothing or the cursor reaches end of file. A
    /// stream descriptor is read until the writer closes its end.
    /// Every chunk is bounded by the same `deadline`.
    ///
    /// # Errors
    ///
    /// Returns the first error from an underlying read. A closed-stream
    /// error carries the bytes read so far.
    pub async fn read_all(&mut self, chunk_size: usize, deadline: Deadline) -> Result<Vec<u8>> {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        let mut contents = Vec::new();

        loop {
            let chunk = match self.read_chunk(chunk_size, deadline).await {
                Ok(chunk) => chunk,
                Err(Error::Stream(StreamError::ClosedStream { .. })) => {
                    return Err(StreamError::ClosedStream { buffer: contents }.into());
                }
                Err(e) => return Err(e),
            };

            if chunk.is_empty() {
                break;
            }
            contents.extend_from_slice(&chunk);

            if self.seekable && self.cursor_is_at_end_of_file().await {
                break;
            }
        }

        Ok(contents)
    }

    /// Write all of `data` at the cursor
    ///
    /// An empty `data` is a no-op. A write that the OS accepts only in part
    /// is not retried: it fails with [`SystemError::ShortWrite`] and the
    /// handle should be considered unusable for further writes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ClosedStream`] on a closed handle,
    /// [`SystemError::TimedOut`] if `deadline` elapses (the cursor does not
    /// move, though the data may still reach the file), a short-write error,
    /// or the classified OS error.
    pub async fn write(&mut self, data: &[u8], deadline: Deadline) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let expected = data.len();

        let written = if self.seekable {
            let cursor = self.cursor;
            let file = self.file.as_mut().ok_or_else(Error::closed_stream)?;
            let BufResult(result, _) =
                bounded(deadline, file.write_at(data.to_vec(), cursor)).await?;
            result?
        } else {
            let fd = self.stream_fd()?;
            let data = data.to_vec();
            blocking(move || stream_write(fd, &data, deadline)).await?
        };

        self.cursor += written as u64;
        if written != expected {
            warn!(
                "Short write on {}: {} of {} bytes",
                self.path.as_deref().unwrap_or("<fd>"),
                written,
                expected
            );
            return Err(SystemError::ShortWrite { written, expected }.into());
        }

        // O_APPEND writes ignore the offset; follow the end of file instead
        if self.append && self.seekable {
            self.cursor = self.current_length().await?;
        }
        Ok(())
    }

    /// Write a UTF-8 string at the cursor
    ///
    /// # Errors
    ///
    /// Same as [`DeadlineFile::write`].
    pub async fn write_str(&mut self, text: &str, deadline: Deadline) -> Result<()> {
        self.write(text.as_bytes(), deadline).await
    }

    /// Force written data down to the storage device
    ///
    /// Stream descriptors have nothing to sync and return at once.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ClosedStream`] on a closed handle,
    /// [`SystemError::TimedOut`] if `deadline` elapses, or the classified
    /// OS error from `fdatasync(2)`.
    pub async fn flush(&mut self, deadline: Deadline) -> Result<()> {
        let file = self.open_file()?;
        if !self.seekable {
            return Ok(());
        }
        bounded(deadline, file.sync_data()).await??;
        Ok(())
    }

    /// Move the cursor to an absolute byte offset
    ///
    /// Offsets past end of file are allowed; a later write fills the gap.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ClosedStream`] on a closed handle, or `ESPIPE`
    /// for a stream descriptor.
    pub fn seek(&mut self, position: u64) -> Result<u64> {
        self.open_file()?;
        if !self.seekable {
            return Err(SystemError::Other { code: libc::ESPIPE }.into());
        }
        self.cursor = position;
        Ok(position)
    }

    /// Move the cursor relative to the start, the cursor, or end of file
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ClosedStream`] on a closed handle, the OS
    /// error if the length lookup fails, or `EINVAL` for a target before
    /// offset 0.
    pub async fn seek_from(&mut self, target: SeekFrom) -> Result<u64> {
        let (base, delta) = match target {
            SeekFrom::Start(position) => return self.seek(position),
            SeekFrom::Current(delta) => (self.cursor_position()?, delta),
            SeekFrom::End(delta) => (self.current_length().await?, delta),
        };
        let position = base
            .checked_add_signed(delta)
            .ok_or(SystemError::Other { code: libc::EINVAL })?;
        self.seek(position)
    }

    /// The cursor's byte offset
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ClosedStream`] on a closed handle.
    pub fn cursor_position(&self) -> Result<u64> {
        self.open_file()?;
        Ok(self.cursor)
    }

    /// Whether the cursor is at or past end of file
    ///
    /// Best effort: a closed handle, or one whose length cannot be
    /// determined, reports `true`. A stream descriptor is at end of file
    /// once a read has returned nothing.
    pub async fn cursor_is_at_end_of_file(&self) -> bool {
        if !self.seekable {
            return self.at_eof || self.is_closed();
        }
        self.cursor >= self.length().await
    }

    /// File length in bytes, or 0 if it cannot be determined
    pub async fn length(&self) -> u64 {
        match self.current_length().await {
            Ok(len) => len,
            Err(e) => {
                debug!("Length lookup failed: {}", e);
                0
            }
        }
    }

    async fn current_length(&self) -> Result<u64> {
        let metadata = self.open_file()?.metadata().await?;
        Ok(metadata.len())
    }

    /// Close the handle
    ///
    /// Safe to call any number of times: the descriptor is released on the
    /// first call and later calls return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns the classified OS error if `close(2)` fails on the first
    /// call. The handle counts as closed either way.
    pub async fn close(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        debug!("Closing {}", self.path.as_deref().unwrap_or("<fd>"));
        file.close().await?;
        Ok(())
    }

    /// The extension of the file name, computed once
    ///
    /// The text after the last `.` of the path, or `None` when no path is
    /// known, there is no `.`, the text is empty, or the last `.` belongs to
    /// a directory (`"a.b/c"`).
    pub fn file_extension(&self) -> Option<&str> {
        self.extension
            .get_or_init(|| self.path.as_deref().and_then(extension_of))
            .as_deref()
    }
}

impl Drop for DeadlineFile {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            debug!(
                "Releasing unclosed file {} on drop",
                self.path.as_deref().unwrap_or("<fd>")
            );
            // compio closes the descriptor when the last reference goes away
            drop(file);
        }
    }
}

/// Current offset of `raw`, or `None` if it cannot seek
fn stream_offset(raw: RawFd) -> Result<Option<u64>> {
    match nix::unistd::lseek(raw, 0, Whence::SeekCur) {
        Ok(offset) => Ok(Some(u64::try_from(offset).unwrap_or(0))),
        Err(Errno::ESPIPE) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Block until `fd` is ready for `events` or `deadline` elapses
///
/// Nothing is consumed from the descriptor, so a timeout loses no data.
fn wait_ready(fd: BorrowedFd<'_>, events: PollFlags, deadline: Deadline) -> Result<()> {
    loop {
        let timeout = match deadline.remaining() {
            None => PollTimeout::NONE,
            Some(left) if left.is_zero() => return Err(SystemError::TimedOut.into()),
            // one poll waits at most u16::MAX ms; longer deadlines loop
            Some(left) => {
                PollTimeout::from(u16::try_from(left.as_millis().max(1)).unwrap_or(u16::MAX))
            }
        };
        let mut fds = [PollFd::new(fd, events)];
        match poll(&mut fds, timeout) {
            Ok(0) | Err(Errno::EINTR) => {}
            Ok(_) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}

fn stream_read(fd: OwnedFd, max_len: usize, deadline: Deadline) -> Result<Vec<u8>> {
    let mut stream = std::fs::File::from(fd);
    let mut buffer = vec![0u8; max_len];
    loop {
        wait_ready(stream.as_fd(), PollFlags::POLLIN, deadline)?;
        match stream.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                return Ok(buffer);
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
            Err(e) => return Err(e.into()),
        }
    }
}

fn stream_write(fd: OwnedFd, data: &[u8], deadline: Deadline) -> Result<usize> {
    let mut stream = std::fs::File::from(fd);
    loop {
        wait_ready(stream.as_fd(), PollFlags::POLLOUT, deadline)?;
        match stream.write(data) {
            Ok(n) => return Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
            Err(e) => return Err(e.into()),
        }
    }
}

/// Extension rule shared by [`DeadlineFile::file_extension`]
pub(crate) fn extension_of(path: &str) -> Option<String> {
    let (_, candidate) = path.rsplit_once('.')?;
    if candidate.is_empty() || candidate.contains('/') {
        return None;
    }
    Some(candidate.to_string())
}

//! Deadlines for suspension points
//!
//! A [`Deadline`] bounds how long a task waits on an I/O operation. It is
//! not a cancellation of the OS request: when the deadline elapses the
//! caller gets [`SystemError::TimedOut`] back, but the kernel (or the
//! blocking thread pool) may still finish the operation afterwards. Callers
//! must treat a timed-out operation as indeterminate.
//!
//! A deadline is an absolute point in time. Passing the same value to every
//! iteration of a loop bounds the whole loop, not each call separately.

use crate::error::{spawn_join_error, SystemError};
use std::future::Future;
use std::time::{Duration, Instant};

/// Point in time after which a pending operation returns control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deadline {
    /// Wait for completion however long it takes
    #[default]
    Never,
    /// Give up waiting at this instant
    At(Instant),
}

impl Deadline {
    /// A deadline `timeout` from now
    ///
    /// Durations too large to represent as an [`Instant`] mean [`Deadline::Never`].
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or(Self::Never, Self::At)
    }

    /// A deadline a real number of milliseconds from now
    ///
    /// `+inf` and NaN mean [`Deadline::Never`]; zero or negative values
    /// produce a deadline that has already elapsed.
    #[must_use]
    pub fn in_millis(millis: f64) -> Self {
        if millis.is_nan() || millis == f64::INFINITY {
            return Self::Never;
        }
        if millis <= 0.0 {
            return Self::At(Instant::now());
        }
        Duration::try_from_secs_f64(millis / 1000.0).map_or(Self::Never, Self::after)
    }

    /// Time left before the deadline, `None` for [`Deadline::Never`]
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::At(instant) => Some(instant.saturating_duration_since(Instant::now())),
        }
    }

    /// Whether the deadline is already in the past
    #[must_use]
    pub fn has_elapsed(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}

impl From<Duration> for Deadline {
    fn from(timeout: Duration) -> Self {
        Self::after(timeout)
    }
}

impl From<Option<Duration>> for Deadline {
    fn from(timeout: Option<Duration>) -> Self {
        timeout.map_or(Self::Never, Self::after)
    }
}

/// Drive `fut` until it completes or `deadline` elapses
///
/// An already-elapsed deadline fails without polling the future, so no
/// operation is started.
///
/// # Errors
///
/// Returns [`SystemError::TimedOut`] if the deadline elapses first.
pub(crate) async fn bounded<F: Future>(
    deadline: Deadline,
    fut: F,
) -> std::result::Result<F::Output, SystemError> {
    match deadline.remaining() {
        None => Ok(fut.await),
        Some(left) if left.is_zero() => Err(SystemError::TimedOut),
        Some(left) => compio::time::timeout(left, fut)
            .await
            .map_err(|_| SystemError::TimedOut),
    }
}

/// Run a blocking syscall on the runtime's thread pool, bounded by `deadline`
///
/// When the deadline elapses the closure keeps running on its pool thread;
/// its result is dropped.
///
/// # Errors
///
/// Returns [`SystemError::TimedOut`] on expiry, [`crate::Error::SpawnJoin`] if the
/// closure panicked, or whatever the closure itself returned.
pub(crate) async fn bounded_blocking<T, F>(deadline: Deadline, op: F) -> crate::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> crate::Result<T> + Send + 'static,
{
    // spawn_blocking dispatches at once, so an expired deadline must stop it here
    if deadline.has_elapsed() {
        return Err(SystemError::TimedOut.into());
    }
    bounded(deadline, compio::runtime::spawn_blocking(op))
        .await?
        .map_err(spawn_join_error)?
}

/// [`bounded_blocking`] with no deadline
pub(crate) async fn blocking<T, F>(op: F) -> crate::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> crate::Result<T> + Send + 'static,
{
    bounded_blocking(Deadline::Never, op).await
}

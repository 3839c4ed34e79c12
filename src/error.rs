use std::time::Duration;

/// The deadline elapsed before the guarded operation completed.
///
/// This is the only failure the guard manufactures itself. It is always
/// delivered, never thrown: callback mode passes it as the `Err` arm of the
/// wrapped callback's input, deferred mode rejects the proxy with it.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Timeout after {milliseconds} milliseconds")]
pub struct TimeoutError {
    /// The configured deadline, in milliseconds.
    pub milliseconds: u64,
}

impl TimeoutError {
    /// Symbolic kind name, for callers that key on it.
    pub const NAME: &'static str = "TimeoutError";

    pub(crate) fn after(duration: Duration) -> Self {
        Self {
            milliseconds: duration.as_millis().min(u128::from(u64::MAX)) as u64,
        }
    }

    /// The configured deadline as a [`Duration`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.milliseconds)
    }
}

/// Rejection reason of a guarded promise: either the deadline fired, or the
/// operation failed on its own before the deadline.
///
/// The operation's reason is carried verbatim, never wrapped in a message or
/// reinterpreted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError<E> {
    /// The deadline elapsed first.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// The operation rejected before the deadline.
    #[error("{0}")]
    Rejected(E),
}

impl<E> GuardError<E> {
    /// Returns true if the deadline fired before the operation settled.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

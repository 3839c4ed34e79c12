//! Deadline guards for asynchronous operations.
//!
//! Wrap an operation — a callback-style function, a deferred value, or a
//! plain `Future` — with a time limit. If the operation completes in time,
//! its outcome flows through untouched and the deadline timer is cancelled.
//! If the deadline fires first, the caller's primary channel receives a
//! [`TimeoutError`] carrying the configured duration, and the operation's
//! eventual outcome is routed to an optional late channel instead of being
//! silently double-delivered.
//!
//! The whole crate is that one race. Each guard owns a single one-shot timer
//! obtained from a [`Schedule`] collaborator and a single atomic phase cell;
//! whichever of {deadline, operation} claims the cell first wins the primary
//! channel, exactly once, even across threads.
//!
//! ```
//! use overdue::{ManualScheduler, guard_callback};
//! use std::time::Duration;
//!
//! let clock = ManualScheduler::new();
//! let mut proxy = guard_callback(&clock, Duration::from_millis(34), |input| {
//!     match input {
//!         Ok((a, b)) => format!("{a}{b}"),
//!         Err(timeout) => timeout.to_string(),
//!     }
//! });
//!
//! // Invoked before the deadline: arguments and return value pass through.
//! assert_eq!(proxy(("a", "b")), Some(String::from("ab")));
//! clock.advance(Duration::from_millis(100)); // the cancelled timer stays silent
//! ```

pub mod error;
pub use error::{GuardError, TimeoutError};

pub mod timer;
pub use timer::{ManualScheduler, OnFire, Schedule, ThreadScheduler, TimerHandle};

pub mod promise;
pub use promise::{Promise, Settler, promise};

pub mod guard;
pub use guard::{guard_callback, guard_callback_with_late, guard_promise, guard_promise_with_late};

pub mod future;
pub use future::{Timeout, timeout};

#[cfg(test)]
mod test_utils;

//! The timeout guard: one deadline racing one operation.
//!
//! Mode dispatch is static. Pick the entry point matching the shape of the
//! guarded operation:
//!
//! - [`guard_callback`] / [`guard_callback_with_late`] for an operation that
//!   signals completion by invoking a function;
//! - [`guard_promise`] / [`guard_promise_with_late`] for an operation that
//!   settles a deferred value;
//! - [`crate::future::timeout`] for an operation that is already a `Future`
//!   (primary channel only).
//!
//! Every guard owns exactly one timer and exactly one piece of state: the
//! timer's phase cell. Whichever side claims it first owns the primary
//! channel; the loser's outcome goes to the late channel or vanishes.

pub mod callback;
pub use callback::{guard_callback, guard_callback_with_late};

pub mod deferred;
pub use deferred::{guard_promise, guard_promise_with_late};

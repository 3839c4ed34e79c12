//! Deferred-value-mode guard.

use crate::error::{GuardError, TimeoutError};
use crate::promise::{Promise, Settler, promise};
use crate::timer::{OnFire, Schedule};
use std::time::Duration;

/// Guards a [`Promise`] with a deadline, without a late channel.
///
/// The returned proxy settles exactly once, from whichever side wins:
/// - the operation, in time: its value resolves the proxy, its failure
///   rejects the proxy with [`GuardError::Rejected`] carrying the reason
///   verbatim, and either way the timer is cancelled;
/// - the deadline: the proxy rejects with [`GuardError::Timeout`], and the
///   operation's eventual outcome silently vanishes.
pub fn guard_promise<S, T, E>(
    scheduler: &S,
    duration: Duration,
    operation: Promise<T, E>,
) -> Promise<T, GuardError<E>>
where
    S: Schedule + ?Sized,
    T: Send + 'static,
    E: Send + 'static,
{
    guarded(scheduler, duration, operation, None::<fn(Result<T, E>)>)
}

/// Like [`guard_promise`], with a late channel.
///
/// If the operation settles after the deadline already rejected the proxy,
/// `late` receives the outcome — `Ok(value)` or `Err(reason)`, untouched — on
/// the stack of whoever settled the operation.
pub fn guard_promise_with_late<S, T, E, L>(
    scheduler: &S,
    duration: Duration,
    operation: Promise<T, E>,
    late: L,
) -> Promise<T, GuardError<E>>
where
    S: Schedule + ?Sized,
    T: Send + 'static,
    E: Send + 'static,
    L: FnOnce(Result<T, E>) + Send + 'static,
{
    guarded(scheduler, duration, operation, Some(late))
}

fn guarded<S, T, E, L>(
    scheduler: &S,
    duration: Duration,
    operation: Promise<T, E>,
    late: Option<L>,
) -> Promise<T, GuardError<E>>
where
    S: Schedule + ?Sized,
    T: Send + 'static,
    E: Send + 'static,
    L: FnOnce(Result<T, E>) + Send + 'static,
{
    let (settler, proxy) = promise::<T, GuardError<E>>();

    let handle = scheduler.schedule(duration, expiry(settler.clone(), duration));

    operation.on_settled(move |outcome| {
        if handle.cancel() {
            // Claimed the race: this outcome owns the primary channel.
            match outcome {
                Ok(value) => settler.resolve(value),
                Err(reason) => settler.reject(GuardError::Rejected(reason)),
            };
        } else if let Some(late) = late {
            late(outcome);
        }
    });

    proxy
}

fn expiry<T, E>(settler: Settler<T, GuardError<E>>, duration: Duration) -> OnFire
where
    T: Send + 'static,
    E: Send + 'static,
{
    Box::new(move || {
        settler.reject(GuardError::Timeout(TimeoutError::after(duration)));
    })
}

//! Callback-mode guard.

use crate::error::TimeoutError;
use crate::timer::{OnFire, Schedule};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Wraps `callback` with a deadline, without a late channel.
///
/// Returns a proxy immediately. The callback is invoked exactly once with:
/// - `Err(TimeoutError)` if `duration` elapses before the proxy is invoked, or
/// - `Ok(args)` when the proxy is invoked in time, in which case the
///   callback's return value is handed back as `Some(r)`.
///
/// Proxy invocations that find nothing to do (a second in-time call, or a
/// post-deadline call with no late handler) return `None`.
///
/// Multiple positional arguments travel as a tuple; calling context is
/// whatever the callback closure captures.
pub fn guard_callback<S, A, R, F>(
    scheduler: &S,
    duration: Duration,
    callback: F,
) -> impl FnMut(A) -> Option<R> + use<S, A, R, F>
where
    S: Schedule + ?Sized,
    A: 'static,
    R: 'static,
    F: FnOnce(Result<A, TimeoutError>) -> R + Send + 'static,
{
    guarded(scheduler, duration, callback, None::<fn(A) -> R>)
}

/// Like [`guard_callback`], with a late channel.
///
/// Once the deadline has fired, every proxy invocation routes its arguments
/// to `late` and returns `Some` of its result. The primary callback still
/// runs at most once.
pub fn guard_callback_with_late<S, A, R, F, L>(
    scheduler: &S,
    duration: Duration,
    callback: F,
    late: L,
) -> impl FnMut(A) -> Option<R> + use<S, A, R, F, L>
where
    S: Schedule + ?Sized,
    A: 'static,
    R: 'static,
    F: FnOnce(Result<A, TimeoutError>) -> R + Send + 'static,
    L: FnMut(A) -> R,
{
    guarded(scheduler, duration, callback, Some(late))
}

fn guarded<S, A, R, F, L>(
    scheduler: &S,
    duration: Duration,
    callback: F,
    mut late: Option<L>,
) -> impl FnMut(A) -> Option<R> + use<S, A, R, F, L>
where
    S: Schedule + ?Sized,
    A: 'static,
    R: 'static,
    F: FnOnce(Result<A, TimeoutError>) -> R + Send + 'static,
    L: FnMut(A) -> R,
{
    // The callback lives in a shared slot reachable from both completion
    // paths. The timer's phase cell decides which path may take it.
    let slot = Arc::new(Mutex::new(Some(callback)));
    let handle = scheduler.schedule(duration, expiry(Arc::clone(&slot), duration));

    move |args: A| {
        if handle.cancel() {
            // Claimed the race: the deadline can no longer fire.
            slot.lock().take().map(|callback| callback(Ok(args)))
        } else if handle.fired() {
            late.as_mut().map(|late| late(args))
        } else {
            // In-time invocation already consumed the callback.
            None
        }
    }
}

fn expiry<A, R, F>(slot: Arc<Mutex<Option<F>>>, duration: Duration) -> OnFire
where
    A: 'static,
    R: 'static,
    F: FnOnce(Result<A, TimeoutError>) -> R + Send + 'static,
{
    Box::new(move || {
        if let Some(callback) = slot.lock().take() {
            callback(Err(TimeoutError::after(duration)));
        }
    })
}

//! Deadline adapter for operations that are already futures.

use crate::error::TimeoutError;
use crate::timer::{Schedule, TimerHandle};
use parking_lot::Mutex;
use pin_project::{pin_project, pinned_drop};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

/// Races `inner` against a deadline.
///
/// The timer starts now, not at first poll. The returned future yields
/// `Ok(output)` if `inner` completes first and `Err(TimeoutError)` if the
/// deadline fires first; either way the loser is discarded. Operations that
/// need the late channel go through [`crate::guard_promise_with_late`]
/// instead — a resolved future cannot be driven any further, so there is
/// nothing left to deliver late.
pub fn timeout<S, F>(scheduler: &S, duration: Duration, inner: F) -> Timeout<F>
where
    S: Schedule + ?Sized,
    F: Future,
{
    let waker: Arc<Mutex<Option<Waker>>> = Arc::new(Mutex::new(None));

    let to_wake = Arc::clone(&waker);
    let handle = scheduler.schedule(
        duration,
        Box::new(move || {
            // The phase cell is already Fired; wake whoever polled us last.
            if let Some(waker) = to_wake.lock().take() {
                waker.wake();
            }
        }),
    );

    Timeout {
        inner,
        duration,
        handle,
        waker,
    }
}

/// Future returned by [`timeout`].
#[pin_project(PinnedDrop)]
pub struct Timeout<F> {
    #[pin]
    inner: F,
    duration: Duration,
    handle: TimerHandle,
    waker: Arc<Mutex<Option<Waker>>>,
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output, TimeoutError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        // Park the waker before looking at anything, so a fire that lands
        // mid-poll still wakes us.
        *this.waker.lock() = Some(cx.waker().clone());

        match this.inner.poll(cx) {
            Poll::Ready(output) => {
                if this.handle.cancel() {
                    Poll::Ready(Ok(output))
                } else {
                    // The deadline claimed the race first; the primary
                    // channel belongs to it and the output is discarded.
                    Poll::Ready(Err(TimeoutError::after(*this.duration)))
                }
            }
            Poll::Pending => {
                if this.handle.fired() {
                    Poll::Ready(Err(TimeoutError::after(*this.duration)))
                } else {
                    Poll::Pending
                }
            }
        }
    }
}

#[pinned_drop]
impl<F> PinnedDrop for Timeout<F> {
    fn drop(self: Pin<&mut Self>) {
        // Dropping the guard releases its deadline timer.
        self.project().handle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{ManualScheduler, ThreadScheduler};
    use futures::executor::block_on;
    use futures::task::noop_waker;
    use std::pin::pin;
    use std::time::Instant;

    #[test]
    fn inner_completion_before_the_deadline_passes_through() {
        let scheduler = ManualScheduler::new();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut guarded = pin!(timeout(
            &scheduler,
            Duration::from_millis(34),
            std::future::ready(5u32),
        ));

        assert_eq!(guarded.as_mut().poll(&mut cx), Poll::Ready(Ok(5)));
        assert_eq!(scheduler.pending(), 0, "winning the race cancels the timer");
    }

    #[test]
    fn deadline_fires_while_inner_is_pending() {
        let scheduler = ManualScheduler::new();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut guarded = pin!(timeout(
            &scheduler,
            Duration::from_millis(34),
            std::future::pending::<u32>(),
        ));

        assert_eq!(guarded.as_mut().poll(&mut cx), Poll::Pending);

        scheduler.advance(Duration::from_millis(33));
        assert_eq!(guarded.as_mut().poll(&mut cx), Poll::Pending);

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(
            guarded.as_mut().poll(&mut cx),
            Poll::Ready(Err(TimeoutError { milliseconds: 34 })),
        );
    }

    #[test]
    fn dropping_the_guard_releases_the_timer() {
        let scheduler = ManualScheduler::new();
        {
            let _guarded = timeout(
                &scheduler,
                Duration::from_millis(34),
                std::future::pending::<u32>(),
            );
            assert_eq!(scheduler.pending(), 1);
        }
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn wall_clock_timeout_wakes_the_executor() {
        let scheduler = ThreadScheduler::new();

        let start = Instant::now();
        let duration = Duration::from_millis(10);
        let result = block_on(timeout(
            &scheduler,
            duration,
            std::future::pending::<u32>(),
        ));

        assert_eq!(result, Err(TimeoutError { milliseconds: 10 }));
        assert!(start.elapsed() >= duration);
    }

    #[test]
    fn wall_clock_completion_beats_the_deadline() {
        let scheduler = ThreadScheduler::new();
        let (settler, operation) = crate::promise::promise::<u32, &str>();

        std::thread::spawn(move || {
            settler.resolve(42);
        });

        let result = block_on(timeout(&scheduler, Duration::from_secs(5), operation));
        assert_eq!(result, Ok(Ok(42)));
    }
}

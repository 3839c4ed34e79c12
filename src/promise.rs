//! Single-consumer one-shot deferred values.
//!
//! A [`Promise`] is the crate's rendering of "a deferred value that will
//! eventually settle to success-with-value or failure-with-reason". It is
//! deliberately minimal: one producer side ([`Settler`], cloneable, first
//! settlement wins), one consumer side (await it, or attach exactly one
//! continuation with [`Promise::on_settled`]).
//!
//! Settlement is push-driven: the continuation runs on the stack of whoever
//! settles, immediately, with no executor in between. That is what lets the
//! guard's late channel observe an outcome at the moment it happens even
//! though nobody is polling anymore.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

type Continuation<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

enum State<T, E> {
    /// Not settled. At most one of waker/continuation is ever populated in
    /// practice, but nothing enforces it; last waker wins, continuation is
    /// single-slot.
    Pending {
        waker: Option<Waker>,
        continuation: Option<Continuation<T, E>>,
    },
    /// Settled, outcome not yet delivered to the consumer.
    Settled(Result<T, E>),
    /// Outcome handed to the consumer (polled out or fed to a continuation).
    Finished,
}

struct Shared<T, E> {
    state: Mutex<State<T, E>>,
}

/// Creates a connected settler/promise pair.
pub fn promise<T, E>() -> (Settler<T, E>, Promise<T, E>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending {
            waker: None,
            continuation: None,
        }),
    });
    (
        Settler {
            shared: Arc::clone(&shared),
        },
        Promise { shared },
    )
}

/// Producer side of a [`Promise`]. Cloneable; the first `resolve`/`reject`
/// across all clones settles the promise, every later attempt is a no-op
/// returning false.
pub struct Settler<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Settler<T, E> {
    /// Settles with success. Returns true iff this call won.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settles with failure. Returns true iff this call won.
    pub fn reject(&self, reason: E) -> bool {
        self.settle(Err(reason))
    }

    fn settle(&self, outcome: Result<T, E>) -> bool {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, State::Finished) {
            State::Pending {
                waker: _,
                continuation: Some(continuation),
            } => {
                drop(state);
                // Deliver on our own stack, outside the lock.
                continuation(outcome);
                true
            }
            State::Pending {
                waker,
                continuation: None,
            } => {
                *state = State::Settled(outcome);
                drop(state);
                if let Some(waker) = waker {
                    waker.wake();
                }
                true
            }
            settled @ State::Settled(_) => {
                *state = settled;
                false
            }
            State::Finished => false,
        }
    }
}

/// Consumer side of a one-shot deferred value.
///
/// Implements [`Future`], so it can be awaited on any executor; or consume it
/// with [`on_settled`](Self::on_settled) for push-style delivery.
pub struct Promise<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Promise<T, E> {
    /// Registers the single continuation, consuming the promise.
    ///
    /// If the promise is already settled the continuation runs immediately on
    /// the calling stack; otherwise it runs on the settling stack at
    /// settlement time.
    pub fn on_settled<F>(self, f: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, State::Finished) {
            State::Pending { waker, .. } => {
                *state = State::Pending {
                    waker,
                    continuation: Some(Box::new(f)),
                };
            }
            State::Settled(outcome) => {
                drop(state);
                f(outcome);
            }
            // Only reachable if the promise was polled to completion first;
            // the outcome is gone and there is nothing to deliver.
            State::Finished => {}
        }
    }

    /// True once settled (whether or not the outcome was consumed yet).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(&*self.shared.state.lock(), State::Pending { .. })
    }
}

impl<T, E> Future for Promise<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, State::Finished) {
            State::Pending { continuation, .. } => {
                *state = State::Pending {
                    waker: Some(cx.waker().clone()),
                    continuation,
                };
                Poll::Pending
            }
            State::Settled(outcome) => Poll::Ready(outcome),
            State::Finished => panic!("Promise polled after completion"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::time::Duration;

    #[test]
    fn first_settlement_wins() {
        let (settler, p) = promise::<u32, &str>();
        assert!(settler.resolve(7));
        assert!(!settler.reject("too late"));
        assert!(!settler.resolve(8));
        assert_eq!(block_on(p), Ok(7));
    }

    #[test]
    fn clones_share_the_single_settlement() {
        let (settler, p) = promise::<u32, &str>();
        let other = settler.clone();
        assert!(other.reject("boom"));
        assert!(!settler.resolve(1));
        assert_eq!(block_on(p), Err("boom"));
    }

    #[test]
    fn continuation_runs_at_settlement_time() {
        let (settler, p) = promise::<u32, &str>();
        let seen = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&seen);
        p.on_settled(move |outcome| *sink.lock() = Some(outcome));
        assert!(seen.lock().is_none());

        settler.resolve(42);
        assert_eq!(*seen.lock(), Some(Ok(42)));
    }

    #[test]
    fn continuation_runs_immediately_when_already_settled() {
        let (settler, p) = promise::<u32, &str>();
        settler.reject("gone");

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        p.on_settled(move |outcome| *sink.lock() = Some(outcome));
        assert_eq!(*seen.lock(), Some(Err("gone")));
    }

    #[test]
    fn await_wakes_when_settled_from_another_thread() {
        let (settler, p) = promise::<u32, &str>();

        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            settler.resolve(99);
        });

        assert_eq!(block_on(p), Ok(99));
        producer.join().expect("producer panicked");
    }

    #[test]
    fn is_settled_flips_exactly_once() {
        let (settler, p) = promise::<(), ()>();
        assert!(!p.is_settled());
        settler.resolve(());
        assert!(p.is_settled());
    }
}

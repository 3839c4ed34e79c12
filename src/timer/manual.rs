//! Virtual-clock scheduler for deterministic tests.

use super::{OnFire, Schedule, TimerCore, TimerHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct Entry {
    due: Duration,
    seq: u64,
    core: Arc<TimerCore>,
    on_fire: OnFire,
}

#[derive(Default)]
struct Inner {
    now: Duration,
    next_seq: u64,
    entries: Vec<Entry>,
}

/// A scheduler whose clock only moves when told to.
///
/// Time starts at zero and advances via [`advance`](Self::advance), firing
/// due entries in `(deadline, schedule order)` sequence. Callbacks run on the
/// advancing thread, outside the internal lock, so they may schedule further
/// timers. This is the controllable-clock collaborator the guard tests are
/// driven with.
#[derive(Default)]
pub struct ManualScheduler {
    inner: Mutex<Inner>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time, measured from the scheduler's creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.lock().now
    }

    /// Number of scheduled entries that are still pending: not yet fired,
    /// not cancelled. Lets tests assert that winning the race released the
    /// deadline timer.
    #[must_use]
    pub fn pending(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.entries.retain(|e| e.core.is_pending());
        inner.entries.len()
    }

    /// Moves the clock forward by `by`, firing every due entry.
    ///
    /// Entries fire in deadline order, ties in schedule order, with the clock
    /// positioned at each entry's own deadline while its callback runs.
    pub fn advance(&self, by: Duration) {
        let target = {
            let inner = self.inner.lock();
            inner.now.saturating_add(by)
        };

        loop {
            let entry = {
                let mut inner = self.inner.lock();
                let next = inner
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(_, e)| (e.due, e.seq))
                    .map(|(i, _)| i);
                match next {
                    Some(i) => {
                        let entry = inner.entries.swap_remove(i);
                        inner.now = inner.now.max(entry.due);
                        entry
                    }
                    None => {
                        inner.now = target;
                        return;
                    }
                }
            };

            // Claim and run outside the lock; the callback may re-enter.
            if entry.core.claim_fire() {
                (entry.on_fire)();
            }
        }
    }
}

impl Schedule for ManualScheduler {
    fn schedule(&self, after: Duration, on_fire: OnFire) -> TimerHandle {
        let core = TimerCore::new();
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let due = inner.now.saturating_add(after);
        inner.entries.push(Entry {
            due,
            seq,
            core: Arc::clone(&core),
            on_fire,
        });
        TimerHandle::new(core)
    }
}

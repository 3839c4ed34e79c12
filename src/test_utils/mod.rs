use crate::timer::{OnFire, Schedule, TimerHandle};
use parking_lot::Mutex;
use std::time::Duration;

/// Wraps any scheduler and records every `schedule` call, so tests can
/// assert how a guard talks to its timer collaborator.
pub(crate) struct SpyScheduler<S> {
    inner: S,
    scheduled: Mutex<Vec<Duration>>,
}

impl<S> SpyScheduler<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            scheduled: Mutex::new(Vec::new()),
        }
    }

    /// Durations of every schedule call, in call order.
    pub(crate) fn scheduled(&self) -> Vec<Duration> {
        self.scheduled.lock().clone()
    }
}

impl<S: Schedule> Schedule for SpyScheduler<S> {
    fn schedule(&self, after: Duration, on_fire: OnFire) -> TimerHandle {
        self.scheduled.lock().push(after);
        self.inner.schedule(after, on_fire)
    }
}

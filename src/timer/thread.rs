//! Wall-clock scheduler backed by a single worker thread.

use super::{OnFire, Schedule, TimerCore, TimerHandle};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

struct Entry {
    deadline: Instant,
    seq: u64,
    core: Arc<TimerCore>,
    on_fire: OnFire,
}

impl Eq for Entry {}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for a min-heap: earliest deadline first, ties
        // broken by schedule order.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Queue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    wakeup: Condvar,
}

/// One-shot wall-clock timers, all served by one worker thread.
///
/// The worker parks until the earliest pending deadline, claims the entry
/// (`Pending -> Fired`) and runs its callback outside the queue lock.
/// Cancelled entries stay in the heap and are discarded unrun when they come
/// due. Dropping the scheduler stops the worker; callbacks still pending at
/// that point never run.
pub struct ThreadScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    #[must_use]
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            wakeup: Condvar::new(),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("overdue-timer".into())
                .spawn(move || run_worker(&shared))
                .expect("failed to spawn timer worker thread")
        };

        Self {
            shared,
            worker: Some(worker),
        }
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule for ThreadScheduler {
    fn schedule(&self, after: Duration, on_fire: OnFire) -> TimerHandle {
        let core = TimerCore::new();
        // An unrepresentable deadline behaves as "never": the entry sits in
        // the heap until cancelled or the scheduler is dropped.
        let deadline = Instant::now()
            .checked_add(after)
            .unwrap_or_else(far_future);

        let mut queue = self.shared.queue.lock();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.heap.push(Entry {
            deadline,
            seq,
            core: Arc::clone(&core),
            on_fire,
        });
        tracing::trace!(after_ms = after.as_millis() as u64, seq, "timer scheduled");
        drop(queue);

        self.shared.wakeup.notify_one();
        TimerHandle::new(core)
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.wakeup.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn far_future() -> Instant {
    // ~30 years out; effectively never for a deadline guard.
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}

fn run_worker(shared: &Shared) {
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            return;
        }

        let Some(next_deadline) = queue.heap.peek().map(|e| e.deadline) else {
            shared.wakeup.wait(&mut queue);
            continue;
        };

        if Instant::now() < next_deadline {
            shared.wakeup.wait_until(&mut queue, next_deadline);
            // Re-check everything: a nearer deadline may have been pushed,
            // or shutdown requested, while we were parked.
            continue;
        }

        let entry = match queue.heap.pop() {
            Some(entry) => entry,
            None => continue,
        };

        if entry.core.claim_fire() {
            tracing::trace!(seq = entry.seq, "timer fired");
            MutexGuard::unlocked(&mut queue, move || (entry.on_fire)());
        } else {
            // Lost the claim to a cancel; drop the callback unrun.
            tracing::trace!(seq = entry.seq, "cancelled timer discarded");
        }
    }
}

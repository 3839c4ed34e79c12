//! One-shot deadline timers.
//!
//! The guard never owns a clock. It asks a [`Schedule`] collaborator for a
//! single delayed callback and gets back a [`TimerHandle`]: a claimable
//! three-phase cell that decides the race between "deadline fired" and
//! "operation completed first". Exactly one of the two transitions out of
//! `Pending` ever happens, enforced by a single compare-and-swap.
//!
//! Two collaborators ship with the crate:
//! - [`ThreadScheduler`]: wall clock, one worker thread, min-heap of deadlines.
//! - [`ManualScheduler`]: virtual clock driven by `advance`, for deterministic tests.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

pub mod manual;
pub use manual::ManualScheduler;

pub mod thread;
pub use thread::ThreadScheduler;

/// Callback run when a timer comes due. Runs at most once.
pub type OnFire = Box<dyn FnOnce() + Send>;

/// A source of one-shot delayed callbacks.
///
/// `schedule` must run `on_fire` no sooner than `after` from now, and only
/// if the returned handle has not been cancelled by then. Implementations
/// claim the handle (`Pending -> Fired`) immediately before invoking
/// `on_fire`; a claim that fails means the timer was cancelled and `on_fire`
/// must be dropped unrun.
pub trait Schedule {
    fn schedule(&self, after: Duration, on_fire: OnFire) -> TimerHandle;
}

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared three-phase cell behind a [`TimerHandle`].
pub(crate) struct TimerCore {
    phase: AtomicU8,
}

impl TimerCore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            phase: AtomicU8::new(PENDING),
        })
    }

    /// Claims the `Pending -> Fired` transition. Schedulers call this right
    /// before running `on_fire`; a false return means a cancel got there
    /// first and the callback must not run.
    pub(crate) fn claim_fire(&self) -> bool {
        self.phase
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn claim_cancel(&self) -> bool {
        self.phase
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn phase(&self) -> u8 {
        self.phase.load(Ordering::Acquire)
    }

    /// True while neither fire nor cancel has claimed the cell.
    pub(crate) fn is_pending(&self) -> bool {
        self.phase() == PENDING
    }
}

/// Handle to a scheduled one-shot callback.
///
/// Cloneable; all clones observe the same phase. Owned by the guard that
/// created it and never reused across guards.
#[derive(Clone)]
pub struct TimerHandle {
    core: Arc<TimerCore>,
}

impl TimerHandle {
    pub(crate) fn new(core: Arc<TimerCore>) -> Self {
        Self { core }
    }

    /// True once the scheduler has begun running `on_fire`.
    #[must_use]
    pub fn fired(&self) -> bool {
        self.core.phase() == FIRED
    }

    /// Attempts to prevent `on_fire` from running.
    ///
    /// Returns true iff this call won the race: the timer was still pending
    /// and is now cancelled. Idempotent — calling after a fire or a previous
    /// cancel is a silent no-op returning false, never an error.
    pub fn cancel(&self) -> bool {
        self.core.claim_cancel()
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.core.phase() {
            PENDING => "Pending",
            FIRED => "Fired",
            _ => "Cancelled",
        };
        f.debug_struct("TimerHandle").field("phase", &phase).finish()
    }
}

/*!
 * Gate Statistics
 *
 * Diagnostic counters for a `ValueGate`. Every counter is updated while the
 * gate lock is held, so relaxed atomics are enough; they only exist so
 * `stats()` can read them without touching the lock.
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time snapshot of a gate's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    /// Value changes applied by `set_value`
    pub transitions: u64,
    /// Condvar broadcasts issued (transitions plus cancellation wakeups)
    pub broadcasts: u64,
    /// Times a blocked waiter woke and re-checked its condition
    pub wakeups: u64,
    /// Waits that ended because their context was cancelled
    pub cancellations: u64,
    /// Waiters currently suspended on the gate
    pub waiters: usize,
}

#[derive(Default)]
pub(super) struct GateCounters {
    transitions: AtomicU64,
    broadcasts: AtomicU64,
    wakeups: AtomicU64,
    cancellations: AtomicU64,
    waiters: AtomicUsize,
}

impl GateCounters {
    #[inline(always)]
    pub(super) fn record_transition(&self) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(super) fn record_cancel_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(super) fn record_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(super) fn record_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(super) fn waiter_enter(&self) {
        self.waiters.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(super) fn waiter_exit(&self) {
        self.waiters.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }

    pub(super) fn snapshot(&self) -> GateStats {
        GateStats {
            transitions: self.transitions.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            waiters: self.waiters(),
        }
    }
}

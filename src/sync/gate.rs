/*!
 * Value Gate
 *
 * Monitor-style primitive: one value, one mutex, one condvar.
 *
 * # Design: Broadcast on Every Change
 *
 * `set_value` wakes every suspended waiter and each one re-checks its own
 * target under the lock. There is no per-target registry; a waiter that
 * loses a race may see a later value and go back to sleep. Intermediate
 * values can therefore be skipped, but a waiter whose target is the value
 * at the time it re-acquires the lock always returns.
 */

use super::config::GateConfig;
use super::stats::{GateCounters, GateStats};
use crate::context::Context;
use crate::errors::{CancelReason, WaitError, WaitResult};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

struct GateShared<T> {
    value: Mutex<T>,
    signal: Condvar,
    config: GateConfig,
    counters: GateCounters,
}

impl<T> GateShared<T> {
    /// Park on the condvar; the lock is released while suspended
    #[inline]
    fn suspend(&self, current: &mut MutexGuard<'_, T>) {
        self.counters.waiter_enter();
        self.signal.wait(current);
        self.counters.waiter_exit();
        self.counters.record_wakeup();
    }

    /// Wake every waiter so it can observe a cancelled context
    fn broadcast_cancel(&self) {
        let _current = self.value.lock();
        self.counters.record_cancel_broadcast();
        self.signal.notify_all();
        trace!(
            gate = %self.config.label,
            waiters = self.counters.waiters(),
            "Cancellation broadcast"
        );
    }
}

/// A value that threads can block on until it equals a chosen target
///
/// Cloning a `ValueGate` yields another handle to the same gate.
///
/// # Examples
///
/// ```
/// use value_gate::ValueGate;
/// use std::thread;
///
/// let gate = ValueGate::new(0u32);
/// let waiter = {
///     let gate = gate.clone();
///     thread::spawn(move || gate.wait_value(2))
/// };
///
/// gate.set_value(1);
/// gate.set_value(2);
/// waiter.join().unwrap();
/// assert_eq!(gate.get_value(), 2);
/// ```
pub struct ValueGate<T> {
    shared: Arc<GateShared<T>>,
}

impl<T: PartialEq> ValueGate<T> {
    /// Create a gate holding `initial`
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, GateConfig::default())
    }

    /// Create a gate holding `initial` with an explicit configuration
    pub fn with_config(initial: T, config: GateConfig) -> Self {
        Self {
            shared: Arc::new(GateShared {
                value: Mutex::new(initial),
                signal: Condvar::new(),
                config,
                counters: GateCounters::default(),
            }),
        }
    }

    /// Current value
    #[inline]
    pub fn get_value(&self) -> T
    where
        T: Clone,
    {
        self.shared.value.lock().clone()
    }

    /// Inspect the current value under the lock without cloning it
    ///
    /// `f` runs with the gate lock held and the lock is not reentrant: calling
    /// back into the same gate from `f` (including formatting it with `{:?}`)
    /// deadlocks.
    #[inline]
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let current = self.shared.value.lock();
        f(&*current)
    }

    /// Replace the value and wake all waiters
    ///
    /// Setting the value it already holds is a no-op: nothing is broadcast.
    pub fn set_value(&self, value: T) {
        let mut current = self.shared.value.lock();
        if *current == value {
            return;
        }
        *current = value;
        self.shared.counters.record_transition();
        self.shared.signal.notify_all();

        if self.shared.config.trace_transitions {
            trace!(
                gate = %self.shared.config.label,
                waiters = self.shared.counters.waiters(),
                "Value changed"
            );
        }
    }

    /// Block until the value equals `target`
    ///
    /// Returns immediately if it already does. Never fails, and never returns
    /// if `target` is never set; use [`wait_value_context`] for a bounded wait.
    ///
    /// [`wait_value_context`]: ValueGate::wait_value_context
    pub fn wait_value(&self, target: T) {
        let mut current = self.shared.value.lock();
        let mut wakeups = 0u64;
        while *current != target {
            self.shared.suspend(&mut current);
            wakeups += 1;
        }

        if wakeups > 0 {
            trace!(gate = %self.shared.config.label, wakeups, "Wait satisfied");
        }
    }

    /// Block until the value equals `target` or `ctx` is cancelled
    ///
    /// Cancellation is checked before the value on every pass, so a context
    /// that is already cancelled wins even if the value matches.
    ///
    /// # Performance
    ///
    /// Cancelling `ctx` broadcasts to every waiter on this gate, not just this
    /// one. The others re-check and go back to sleep.
    pub fn wait_value_context(&self, ctx: &Context, target: T) -> WaitResult<()>
    where
        T: Send + 'static,
    {
        let mut current = self.shared.value.lock();

        // Already cancelled: no registration, no broadcast to other waiters
        if let Some(reason) = ctx.err() {
            return Err(self.cancelled(reason, 0));
        }

        let shared = Arc::downgrade(&self.shared);
        let mut registration = ctx.after_func(move || {
            if let Some(shared) = shared.upgrade() {
                shared.broadcast_cancel();
            }
        });

        let mut wakeups = 0u64;
        let result = loop {
            if let Some(reason) = ctx.err() {
                break Err(self.cancelled(reason, wakeups));
            }
            if *current == target {
                break Ok(());
            }
            self.shared.suspend(&mut current);
            wakeups += 1;
        };

        registration.stop();
        result
    }

    fn cancelled(&self, reason: CancelReason, wakeups: u64) -> WaitError {
        self.shared.counters.record_cancellation();
        debug!(
            gate = %self.shared.config.label,
            reason = %reason,
            wakeups,
            "Wait cancelled"
        );
        WaitError::Cancelled(reason)
    }

    /// Block until the value equals `target` or `timeout` elapses
    ///
    /// Shorthand for waiting on a fresh `Context::with_timeout`. Each call
    /// spawns one deadline timer thread, which exits when this call returns.
    /// A timeout too large to represent as an `Instant` never expires.
    pub fn wait_value_timeout(&self, target: T, timeout: Duration) -> WaitResult<()>
    where
        T: Send + 'static,
    {
        let (ctx, _cancel) = Context::with_timeout(&Context::background(), timeout);
        self.wait_value_context(&ctx, target)
    }

    /// Async-compatible cancellable wait using tokio::spawn_blocking
    ///
    /// The wait runs on tokio's blocking pool. Dropping the returned future
    /// does not stop it; cancel `ctx` for that.
    #[cfg(feature = "tokio")]
    pub async fn wait_value_context_async(&self, ctx: &Context, target: T) -> WaitResult<()>
    where
        T: Send + 'static,
    {
        let gate = self.clone();
        let ctx = ctx.clone();
        match tokio::task::spawn_blocking(move || gate.wait_value_context(&ctx, target)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(WaitError::Cancelled(CancelReason::Canceled)),
        }
    }
}

impl<T> ValueGate<T> {
    /// Waiters currently suspended on the gate (for diagnostics)
    #[inline]
    pub fn waiter_count(&self) -> usize {
        self.shared.counters.waiters()
    }

    /// Snapshot of the gate's counters
    pub fn stats(&self) -> GateStats {
        self.shared.counters.snapshot()
    }

    #[inline]
    pub fn config(&self) -> &GateConfig {
        &self.shared.config
    }
}

impl<T> Clone for ValueGate<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: PartialEq + Default> Default for ValueGate<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Locks the gate to read the value; see [`ValueGate::with_value`]
impl<T: std::fmt::Debug> std::fmt::Debug for ValueGate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueGate")
            .field("label", &self.shared.config.label)
            .field("value", &*self.shared.value.lock())
            .field("waiters", &self.waiter_count())
            .finish()
    }
}

/*!
 * Context State and Cancellation
 */

use super::after_func::AfterFunc;
use super::deadline;
use crate::errors::CancelReason;
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Callback invoked with the reason the context was cancelled
pub(super) type Callback = Box<dyn FnOnce(CancelReason) + Send + 'static>;

pub(super) struct ContextState {
    pub(super) err: Option<CancelReason>,
    callbacks: Vec<(u64, Callback)>,
    next_id: u64,
}

pub(crate) struct ContextInner {
    pub(super) state: Mutex<ContextState>,
    /// Signalled once, when `err` is first set
    pub(super) done: Condvar,
    deadline: Option<Instant>,
    /// Registration on the parent; released as soon as this context is cancelled
    parent_link: Mutex<Option<AfterFunc>>,
}

impl ContextInner {
    fn new(deadline: Option<Instant>) -> Self {
        Self {
            state: Mutex::new(ContextState {
                err: None,
                callbacks: Vec::new(),
                next_id: 0,
            }),
            done: Condvar::new(),
            deadline,
            parent_link: Mutex::new(None),
        }
    }

    /// Record `reason` and run every pending callback
    ///
    /// Returns `false` if the context was already cancelled.
    pub(super) fn cancel(&self, reason: CancelReason) -> bool {
        let callbacks = {
            let mut state = self.state.lock();
            if state.err.is_some() {
                return false;
            }
            state.err = Some(reason);
            self.done.notify_all();
            std::mem::take(&mut state.callbacks)
        };

        debug!(reason = %reason, callbacks = callbacks.len(), "Context cancelled");

        let link = self.parent_link.lock().take();
        drop(link);

        for (_, callback) in callbacks {
            callback(reason);
        }
        true
    }

    /// Register a callback, or hand it back if the context is already cancelled
    fn try_register(
        self: &Arc<Self>,
        callback: Callback,
    ) -> Result<AfterFunc, (CancelReason, Callback)> {
        let mut state = self.state.lock();
        if let Some(reason) = state.err {
            return Err((reason, callback));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.callbacks.push((id, callback));
        Ok(AfterFunc::registered(Arc::clone(self), id))
    }

    /// Remove a pending callback; `true` if it had not run yet
    pub(super) fn deregister(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        match state.callbacks.iter().position(|(cb_id, _)| *cb_id == id) {
            Some(idx) => {
                drop(state.callbacks.swap_remove(idx));
                true
            }
            None => false,
        }
    }

    #[inline]
    fn err(&self) -> Option<CancelReason> {
        self.state.lock().err
    }
}

/// A cancellation context
///
/// Cheap to clone; all clones observe the same cancellation. A context is
/// cancelled at most once, and the first reason sticks.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextInner::new(None)),
        }
    }

    /// Derive a context cancelled by the returned handle or by `parent`
    pub fn with_cancel(parent: &Context) -> (Context, CancelHandle) {
        Self::derive(parent, parent.deadline())
    }

    /// Derive a context that is also cancelled once `deadline` passes
    ///
    /// If the parent's deadline is earlier, the parent's deadline applies and
    /// no extra timer is started. Otherwise a dedicated timer thread is
    /// spawned; it exits at the deadline or as soon as the context is
    /// cancelled, so drop the handle early when the deadline is far away.
    pub fn with_deadline(parent: &Context, deadline: Instant) -> (Context, CancelHandle) {
        if let Some(parent_deadline) = parent.deadline() {
            if parent_deadline <= deadline {
                return Self::with_cancel(parent);
            }
        }

        let (ctx, handle) = Self::derive(parent, Some(deadline));
        if ctx.inner.err().is_none() {
            if Instant::now() >= deadline {
                ctx.inner.cancel(CancelReason::DeadlineExceeded);
            } else {
                deadline::arm(&ctx.inner, deadline);
            }
        }
        (ctx, handle)
    }

    /// Derive a context that is cancelled after `timeout` elapses
    ///
    /// A timeout too large to represent as an `Instant` means no deadline.
    pub fn with_timeout(parent: &Context, timeout: Duration) -> (Context, CancelHandle) {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(parent, deadline),
            None => Self::with_cancel(parent),
        }
    }

    fn derive(parent: &Context, deadline: Option<Instant>) -> (Context, CancelHandle) {
        let inner = Arc::new(ContextInner::new(deadline));
        let child: Weak<ContextInner> = Arc::downgrade(&inner);

        let propagate: Callback = Box::new(move |reason| {
            if let Some(child) = child.upgrade() {
                child.cancel(reason);
            }
        });

        match parent.inner.try_register(propagate) {
            Ok(link) => *inner.parent_link.lock() = Some(link),
            Err((reason, _)) => {
                inner.cancel(reason);
            }
        }

        let handle = CancelHandle {
            inner: Arc::clone(&inner),
        };
        (Context { inner }, handle)
    }

    /// The cancellation reason, or `None` while the context is live
    #[inline]
    pub fn err(&self) -> Option<CancelReason> {
        self.inner.err()
    }

    /// True once the context has been cancelled for any reason
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// The effective deadline, if any
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Block until the context is cancelled and return the reason
    pub fn wait_cancelled(&self) -> CancelReason {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(reason) = state.err {
                return reason;
            }
            self.inner.done.wait(&mut state);
        }
    }

    /// Run `f` once when this context is cancelled
    ///
    /// If the context is already cancelled, `f` runs on a freshly spawned
    /// thread so the caller may hold locks that `f` needs. Dropping the
    /// returned handle deregisters `f`.
    pub fn after_func<F>(&self, f: F) -> AfterFunc
    where
        F: FnOnce() + Send + 'static,
    {
        match self.inner.try_register(Box::new(move |_| f())) {
            Ok(registration) => registration,
            Err((reason, callback)) => {
                let spawned = thread::Builder::new()
                    .name("context-after-func".into())
                    .spawn(move || callback(reason));
                if let Err(e) = spawned {
                    warn!(error = %e, "Could not spawn after-func thread");
                }
                AfterFunc::dispatched()
            }
        }
    }

    /// Number of callbacks still waiting for cancellation (for diagnostics)
    pub fn pending_callbacks(&self) -> usize {
        self.inner.state.lock().callbacks.len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("err", &self.err())
            .field("deadline", &self.deadline())
            .finish()
    }
}

/// Cancels its context when `cancel` is called or when dropped
#[must_use = "dropping a CancelHandle cancels its context immediately"]
pub struct CancelHandle {
    inner: Arc<ContextInner>,
}

impl CancelHandle {
    /// Cancel the context with `CancelReason::Canceled`
    ///
    /// Has no effect if the context was already cancelled.
    pub fn cancel(&self) {
        self.inner.cancel(CancelReason::Canceled);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("err", &self.inner.err())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_background_is_live() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_is_sticky() {
        let (ctx, handle) = Context::with_cancel(&Context::background());
        assert!(ctx.inner.cancel(CancelReason::DeadlineExceeded));
        handle.cancel();
        assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_drop_handle_cancels() {
        let (ctx, handle) = Context::with_cancel(&Context::background());
        drop(handle);
        assert_eq!(ctx.err(), Some(CancelReason::Canceled));
    }

    #[test]
    fn test_parent_cancel_propagates() {
        let (parent, parent_handle) = Context::with_cancel(&Context::background());
        let (child, _child_handle) = Context::with_cancel(&parent);
        assert_eq!(parent.pending_callbacks(), 1);

        parent_handle.cancel();
        assert_eq!(child.err(), Some(CancelReason::Canceled));
    }

    #[test]
    fn test_child_cancel_releases_parent_link() {
        let (parent, _parent_handle) = Context::with_cancel(&Context::background());
        let (child, child_handle) = Context::with_cancel(&parent);
        assert_eq!(parent.pending_callbacks(), 1);

        child_handle.cancel();
        assert!(child.is_cancelled());
        assert!(parent.err().is_none());
        assert_eq!(parent.pending_callbacks(), 0);
    }

    #[test]
    fn test_derive_from_cancelled_parent() {
        let (parent, parent_handle) = Context::with_cancel(&Context::background());
        parent_handle.cancel();

        let (child, _child_handle) = Context::with_cancel(&parent);
        assert_eq!(child.err(), Some(CancelReason::Canceled));
    }

    #[test]
    fn test_past_deadline_cancels_immediately() {
        let past = Instant::now() - Duration::from_millis(1);
        let (ctx, _handle) = Context::with_deadline(&Context::background(), past);
        assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_earlier_parent_deadline_wins() {
        let (parent, _parent_handle) =
            Context::with_timeout(&Context::background(), Duration::from_secs(1));
        let (child, _child_handle) = Context::with_timeout(&parent, Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn test_unrepresentable_timeout_has_no_deadline() {
        let (ctx, handle) = Context::with_timeout(&Context::background(), Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.err().is_none());

        handle.cancel();
        assert_eq!(ctx.err(), Some(CancelReason::Canceled));
    }

    #[test]
    fn test_callbacks_run_once() {
        let (ctx, handle) = Context::with_cancel(&Context::background());
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let _registration = ctx.after_func(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        handle.cancel();
        handle.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.pending_callbacks(), 0);
    }

    #[test]
    fn test_after_func_on_cancelled_context_runs() {
        let (ctx, handle) = Context::with_cancel(&Context::background());
        handle.cancel();

        let (done, done_handle) = Context::with_cancel(&Context::background());
        let _registration = ctx.after_func(move || done_handle.cancel());

        // Runs on its own thread
        assert_eq!(done.wait_cancelled(), CancelReason::Canceled);
    }

    #[test]
    fn test_wait_cancelled_blocks_until_cancel() {
        let (ctx, handle) = Context::with_cancel(&Context::background());
        let ctx_clone = ctx.clone();

        let waiter = thread::spawn(move || ctx_clone.wait_cancelled());

        thread::sleep(Duration::from_millis(20));
        handle.cancel();

        assert_eq!(waiter.join().unwrap(), CancelReason::Canceled);
    }
}

/*!
 * Cancellation Contexts
 *
 * Cooperative cancellation for blocking waits:
 * - Explicit cancellation through a `CancelHandle`
 * - Deadlines driven by a dedicated timer thread
 * - Parent/child propagation (a child never outlives its parent's cancellation)
 * - After-func callbacks that fire once on cancellation and can be stopped
 *
 * # Architecture
 *
 * Every context owns a small state block behind a `parking_lot::Mutex`:
 * the first cancellation reason and the list of pending callbacks. The
 * paired condvar wakes the deadline timer and `wait_cancelled` callers.
 *
 * Callbacks run on the cancelling thread after the state lock has been
 * released, so they are free to take other locks.
 *
 * # Example
 *
 * ```
 * use value_gate::{CancelReason, Context};
 * use std::time::Duration;
 *
 * let (ctx, handle) = Context::with_timeout(&Context::background(), Duration::from_secs(5));
 * assert!(ctx.err().is_none());
 *
 * handle.cancel();
 * assert_eq!(ctx.err(), Some(CancelReason::Canceled));
 * ```
 */

mod after_func;
mod cancel;
mod deadline;

pub use after_func::AfterFunc;
pub use cancel::{CancelHandle, Context};

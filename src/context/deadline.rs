/*!
 * Deadline Timer
 *
 * One parked thread per deadline context. The thread sleeps on the
 * context's condvar until the deadline passes or the context is cancelled
 * some other way, whichever comes first.
 */

use super::cancel::ContextInner;
use crate::errors::CancelReason;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::warn;

/// Start the timer that cancels `ctx` with `DeadlineExceeded` at `deadline`
pub(super) fn arm(ctx: &Arc<ContextInner>, deadline: Instant) {
    let ctx = Arc::clone(ctx);
    let spawned = thread::Builder::new()
        .name("context-deadline".into())
        .spawn(move || run(ctx, deadline));

    if let Err(e) = spawned {
        warn!(error = %e, "Could not spawn deadline timer; context will only cancel explicitly");
    }
}

fn run(ctx: Arc<ContextInner>, deadline: Instant) {
    {
        let mut state = ctx.state.lock();
        while state.err.is_none() {
            if ctx.done.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        if state.err.is_some() {
            return;
        }
    }

    ctx.cancel(CancelReason::DeadlineExceeded);
}

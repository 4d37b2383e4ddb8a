/*!
 * After-Func Registration
 *
 * RAII handle for a callback registered on a context
 */

use super::cancel::ContextInner;
use std::sync::Arc;

/// A callback registered to run once when a context is cancelled
///
/// Dropping the handle deregisters the callback, so a registration can
/// never leak past the scope that created it.
#[must_use = "dropping an AfterFunc deregisters its callback immediately"]
pub struct AfterFunc {
    /// `None` once the callback has fired or been handed to a thread
    ctx: Option<Arc<ContextInner>>,
    id: u64,
}

impl AfterFunc {
    #[inline]
    pub(super) fn registered(ctx: Arc<ContextInner>, id: u64) -> Self {
        Self { ctx: Some(ctx), id }
    }

    /// Handle for a callback that was already dispatched at registration time
    #[inline]
    pub(super) fn dispatched() -> Self {
        Self { ctx: None, id: 0 }
    }

    /// Deregister the callback
    ///
    /// Returns `true` if this call stopped the callback from running, `false`
    /// if it already ran (or is running) or was stopped earlier.
    pub fn stop(&mut self) -> bool {
        match self.ctx.take() {
            Some(ctx) => ctx.deregister(self.id),
            None => false,
        }
    }
}

impl Drop for AfterFunc {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AfterFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AfterFunc")
            .field("id", &self.id)
            .field("armed", &self.ctx.is_some())
            .finish()
    }
}

/*!
 * Error Types
 * Cancellation errors with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for cancellable wait operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Why a context stopped being live
///
/// The first reason recorded on a context wins; later cancellations never
/// overwrite it.
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Diagnostic)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    #[error("context canceled")]
    #[diagnostic(
        code(context::canceled),
        help("The context was cancelled explicitly or its cancel handle was dropped.")
    )]
    Canceled,

    #[error("context deadline exceeded")]
    #[diagnostic(
        code(context::deadline_exceeded),
        help("The deadline passed before the operation completed. Extend the timeout if expected.")
    )]
    DeadlineExceeded,
}

/// Errors returned by cancellable gate waits
///
/// There is exactly one kind: the wait was abandoned because its context was
/// cancelled. The underlying reason is carried through unchanged.
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum WaitError {
    #[error("wait cancelled: {0}")]
    #[diagnostic(
        code(value_gate::cancelled),
        help("The gate never reached the target value before the context was cancelled.")
    )]
    Cancelled(#[from] CancelReason),
}

impl WaitError {
    /// The cancellation reason reported by the context
    #[inline]
    pub fn reason(&self) -> CancelReason {
        match self {
            WaitError::Cancelled(reason) => *reason,
        }
    }

    /// True if the wait ended because a deadline passed
    #[inline]
    pub fn is_deadline_exceeded(&self) -> bool {
        self.reason() == CancelReason::DeadlineExceeded
    }
}

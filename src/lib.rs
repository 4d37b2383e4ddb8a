/*!
 * Value Gate Library
 * Block until a shared value reaches a target, with optional cancellation
 */

pub mod context;
pub mod errors;
pub mod monitoring;
pub mod sync;

// Re-exports
pub use context::{AfterFunc, CancelHandle, Context};
pub use errors::{CancelReason, WaitError, WaitResult};
pub use monitoring::init_tracing;
pub use sync::{GateConfig, GateStats, ValueGate};

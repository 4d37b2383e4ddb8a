/*!
 * Synchronization Primitives
 *
 * Value-gated wait/notify built on a `parking_lot` mutex and condvar:
 * - `set_value` replaces the value and broadcasts to every waiter
 * - `wait_value` blocks until the value equals a target
 * - `wait_value_context` does the same, but gives up when a context is cancelled
 *
 * # Use Cases
 *
 * - **Lifecycle status**: Block until a worker reports `Running`
 * - **Phase barriers**: Hold threads until a coordinator advances a phase counter
 * - **Feature flags**: Wait for a boolean to flip
 */

mod config;
mod gate;
mod stats;

pub use config::GateConfig;
pub use gate::ValueGate;
pub use stats::GateStats;

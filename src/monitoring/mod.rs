/*!
 * Monitoring
 * Tracing subscriber setup; gates and contexts emit events through `tracing`
 */

mod tracer;

pub use tracer::{init_tracing, TRACE_JSON_ENV};

/*!
 * Async Bridge Tests
 *
 * Requires the `tokio` feature
 */

#![cfg(feature = "tokio")]

use std::time::Duration;
use value_gate::{CancelReason, Context, ValueGate};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_wait_completes() {
    let gate = ValueGate::new(0u32);
    let (ctx, _cancel) = Context::with_timeout(&Context::background(), Duration::from_secs(5));

    let setter = {
        let gate = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            gate.set_value(3);
        })
    };

    assert!(gate.wait_value_context_async(&ctx, 3).await.is_ok());
    setter.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_wait_times_out() {
    let gate = ValueGate::new("idle");
    let (ctx, _cancel) = Context::with_timeout(&Context::background(), Duration::from_millis(10));

    let err = gate
        .wait_value_context_async(&ctx, "running")
        .await
        .unwrap_err();
    assert_eq!(err.reason(), CancelReason::DeadlineExceeded);
}

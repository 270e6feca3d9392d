use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{Level, Span, field};

use super::TraceId;

/// Create a root span for a connection / session / job
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::span!(
        Level::INFO,
        "root",
        name = %name,
        trace_id = %trace_id.as_str(),
        inst_id = field::Empty
    )
}

/// Create a child span (inherits trace_id from the current root)
pub fn child_span(name: &'static str) -> Span {
    tracing::span!(Level::INFO, "child", name = %name, inst_id = field::Empty)
}

/// Run `op` and emit a warning if it took longer than `max`.
pub fn warn_if_slow<F, T>(label: &'static str, max: Duration, op: F) -> T
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let out = op();
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            label = label,
            elapsed_us = elapsed.as_micros() as u64,
            budget_us = max.as_micros() as u64,
            "slow operation detected"
        );
    }
    out
}

/// Async flavour of [`warn_if_slow`].
pub async fn warn_if_slow_async<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            label = label,
            elapsed_us = elapsed.as_micros() as u64,
            budget_us = max.as_micros() as u64,
            "slow operation detected"
        );
    }
    out
}

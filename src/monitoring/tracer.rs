/*!
 * Structured Tracing
 * Subscriber setup and per-operation spans
 */

use crate::core::limits::SLOW_OPERATION_THRESHOLD;
use std::fmt::Display;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, field, info, span::Entered, warn, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};
use uuid::Uuid;

/// Set to `1` or `true` for JSON log lines
pub const TRACE_JSON_ENV: &str = "SANDBOX_TRACE_JSON";

/// Install the global subscriber
///
/// `RUST_LOG` filters (default `info`). Only the first call installs
/// anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(TRACE_JSON_ENV)
        .map(|v| matches!(v.as_str(), "1" | "true"))
        .unwrap_or(false);

    let fmt = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE);
    let layer = if json {
        fmt.json().with_current_span(true).boxed()
    } else {
        fmt.compact().boxed()
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_ok()
    {
        info!(json, "tracing initialized");
    }
}

pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// One broker operation on one path
///
/// The outcome is recorded on the span; dropping it logs the duration,
/// at warn level past `SLOW_OPERATION_THRESHOLD`.
pub struct OperationSpan {
    span: Span,
    operation: &'static str,
    trace_id: String,
    started: Instant,
}

impl OperationSpan {
    pub fn new(operation: &'static str, path: &Path) -> Self {
        let trace_id = generate_trace_id();
        let span = tracing::span!(
            Level::DEBUG,
            "operation",
            trace_id = %trace_id,
            operation,
            path = %path.display(),
            outcome = field::Empty,
            error = field::Empty,
        );
        Self {
            span,
            operation,
            trace_id,
            started: Instant::now(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn succeeded(&self) {
        self.span.record("outcome", "ok");
    }

    /// Access was refused and the policy kept it quiet
    pub fn denied(&self) {
        self.span.record("outcome", "denied");
    }

    pub fn failed(&self, error: &dyn Display) {
        self.span.record("outcome", "failed");
        self.span.record("error", field::display(error));
    }

    pub fn enter(&self) -> Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let _entered = self.span.enter();
        if elapsed > SLOW_OPERATION_THRESHOLD {
            warn!(
                operation = self.operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow operation"
            );
        } else {
            debug!(
                operation = self.operation,
                elapsed_us = elapsed.as_micros() as u64,
                "operation finished"
            );
        }
    }
}

pub fn span_operation(operation: &'static str, path: &Path) -> OperationSpan {
    OperationSpan::new(operation, path)
}

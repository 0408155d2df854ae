/*!
 * Monitoring
 * Structured tracing and broker metrics
 */

mod metrics;
mod tracer;

pub use metrics::{names as metric_names, MetricsCollector, MetricsSnapshot};
pub use tracer::{generate_trace_id, init_tracing, span_operation, OperationSpan, TRACE_JSON_ENV};

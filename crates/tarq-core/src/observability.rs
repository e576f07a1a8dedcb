//! Observability infrastructure for tarq.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors used by every component
//! so per-tick output stays machine-parseable.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `tarq_flow=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for a single orchestration tick.
#[must_use]
pub fn tick_span(operation: &str) -> Span {
    tracing::info_span!("tick", op = operation)
}

/// Creates a span for operations scoped to one array job.
#[must_use]
pub fn run_span(operation: &str, job_id: &str) -> Span {
    tracing::info_span!("run", op = operation, job_id = job_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty); // Second call should be no-op
    }

    #[test]
    fn span_helpers_create_spans() {
        let span = tick_span("poll");
        let _guard = span.enter();
        tracing::info!("tick message");

        let span = run_span("aggregate", "J1");
        let _guard = span.enter();
        tracing::info!("run message");
    }
}

//! Logging utilities for the calwater server.
//!
//! This module provides structured logging functionality to make logs more
//! searchable, analyzable, and useful for production deployments.

use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};

use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use uuid::Uuid;

use crate::error::CalWaterError;
use crate::store::DatasetKind;

/// Creates the tracing layer for HTTP request/response logging
pub fn create_http_trace_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    DefaultMakeSpan,
    DefaultOnRequest,
    DefaultOnResponse,
> {
    let response_formatter = DefaultOnResponse::new()
        .level(Level::DEBUG)
        .latency_unit(LatencyUnit::Micros);

    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(response_formatter)
}

/// Initialize the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(operation = operation, "Starting operation");
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed with errors"
        );
    }
}

/// Log an operation with timing and result in a single statement
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let request_id = Uuid::new_v4();

    debug!(
        operation = operation,
        request_id = %request_id,
        "Starting operation"
    );

    let result = f();

    info!(
        operation = operation,
        request_id = %request_id,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log detailed information about a loaded dataset
pub fn log_dataset_load_stats(dataset: DatasetKind, path: &Path, rows: usize, start: Instant) {
    info!(
        operation = "dataset_load",
        dataset = %dataset,
        file_path = %path.display(),
        rows = rows,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Dataset loaded successfully"
    );
}

/// Log an error with context
pub fn log_error(error: &CalWaterError, context: &str) {
    error!(
        error = %error,
        context = context,
        error_type = error.kind(),
        "Error occurred"
    );
}

/// Log an error that occurred during request processing
pub fn log_request_error(
    error: &CalWaterError,
    endpoint: &str,
    request_id: &str,
    params: Option<&str>,
) {
    match error {
        CalWaterError::NotFound { .. } | CalWaterError::Validation { .. } => debug!(
            error = %error,
            endpoint = endpoint,
            request_id = request_id,
            params = params.unwrap_or("none"),
            error_type = error.kind(),
            "Request rejected"
        ),
        _ => error!(
            error = %error,
            endpoint = endpoint,
            request_id = request_id,
            params = params.unwrap_or("none"),
            error_type = error.kind(),
            "Request processing error"
        ),
    }
}

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

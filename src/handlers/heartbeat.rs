//! Health endpoint handler.
//!
//! Returns server status information, including uptime and the load state of
//! every dataset. Checking health never triggers a dataset load.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::AppState;
use crate::store::{DatasetStatus, LoadState};

/// Random ID generated once per process
static SERVER_ID: once_cell::sync::Lazy<String> =
    once_cell::sync::Lazy::new(|| Uuid::new_v4().to_string());

/// Health response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" once any dataset has failed to load
    pub status: &'static str,
    /// Server ID (unique per instance)
    pub server_id: String,
    pub version: &'static str,
    /// Current timestamp (ISO 8601 format)
    pub timestamp: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    pub data_dir: String,
    pub datasets: Vec<DatasetStatus>,
}

/// Overall status for a set of dataset states
fn overall_status(datasets: &[DatasetStatus]) -> &'static str {
    if datasets
        .iter()
        .any(|d| matches!(d.state, LoadState::Failed { .. }))
    {
        "degraded"
    } else {
        "healthy"
    }
}

/// Handle GET /health requests
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = chrono::DateTime::<chrono::Utc>::from(SystemTime::now())
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let datasets = state.dataset.status();

    Json(HealthResponse {
        status: overall_status(&datasets),
        server_id: SERVER_ID.clone(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp,
        uptime_seconds: state.uptime().as_secs(),
        data_dir: state.config.data.data_dir.display().to_string(),
        datasets,
    })
}

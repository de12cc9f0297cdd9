//! HTTP request handlers for the calwater API.
//!
//! Handlers parse their arguments, call into [`crate::service`] and wrap the
//! outcome in the JSON envelope shared by every endpoint:
//! `{"status": "success", "data": ..., "count": n}` on success and
//! `{"status": "error", "message": ..., "request_id": ...}` on failure.

pub mod counties;
pub mod heartbeat;
pub mod treatment_plants;
pub mod water_quality;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::CalWaterError;
use crate::logging::{create_http_trace_layer, generate_request_id, log_request_error};
use crate::state::AppState;

pub use counties::{
    county_boundaries_handler, county_handler, list_counties_handler, population_handler,
};
pub use heartbeat::health_handler;
pub use treatment_plants::{
    list_treatment_plants_handler, nearby_treatment_plants_handler, treatment_plant_handler,
    treatment_plants_by_county_handler,
};
pub use water_quality::{
    county_water_quality_handler, list_water_quality_handler, statistics_handler,
    worst_counties_handler,
};

/// Successful response body
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Endpoint-specific top-level fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl<T: Serialize> Envelope<T> {
    /// Envelope around a single value
    pub fn single(data: T) -> Self {
        Self {
            status: "success",
            data,
            count: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Add a top-level field next to `data`
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// Envelope around a list, carrying its length as `count`
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            count: Some(count),
            ..Self::single(data)
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// HTTP status for an error
pub fn status_for(error: &CalWaterError) -> StatusCode {
    match error {
        CalWaterError::NotFound { .. } => StatusCode::NOT_FOUND,
        CalWaterError::Validation { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A failed request, logged when created
#[derive(Debug)]
pub struct ApiError {
    pub error: CalWaterError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(error: CalWaterError, endpoint: &str, params: Option<&str>) -> Self {
        let request_id = generate_request_id();
        log_request_error(&error, endpoint, &request_id, params);
        Self { error, request_id }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    message: String,
    request_id: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            message: error_message(&self.error),
            request_id: &self.request_id,
        };
        (status_for(&self.error), Json(body)).into_response()
    }
}

/// Client-facing message; not-found and validation errors are reported
/// without the category prefix
fn error_message(error: &CalWaterError) -> String {
    match error {
        CalWaterError::NotFound { message } => message.clone(),
        CalWaterError::Validation { param, message } => format!("{}: {}", param, message),
        other => other.to_string(),
    }
}

/// Failure of a dataset the request depends on.
///
/// A missing backing file is a server fault, so it is reported as an
/// internal error rather than as a missing entity.
pub fn dataset_failure(error: CalWaterError) -> CalWaterError {
    match error {
        CalWaterError::NotFound { message } => CalWaterError::Internal { message },
        other => other,
    }
}

/// Parse an optional query parameter; a present but malformed value is an error
pub fn parse_param<T>(name: &str, raw: Option<&str>) -> Result<Option<T>, CalWaterError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
            CalWaterError::validation(name, format!("invalid value '{}': {}", raw, e))
        }),
    }
}

/// Parse a finite floating point query parameter
pub fn parse_float(name: &str, raw: Option<&str>) -> Result<Option<f64>, CalWaterError> {
    match parse_param::<f64>(name, raw)? {
        Some(value) if !value.is_finite() => Err(CalWaterError::validation(
            name,
            format!("must be a finite number, got {}", value),
        )),
        value => Ok(value),
    }
}

/// Parse a boolean flag; absent means false
pub fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool, CalWaterError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(value) => match value.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            _ => Err(CalWaterError::validation(
                name,
                format!("expected true or false, got '{}'", value),
            )),
        },
    }
}

/// Routes relative to the API prefix
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/counties", get(list_counties_handler))
        .route("/counties/boundaries", get(county_boundaries_handler))
        .route("/counties/population", get(population_handler))
        .route("/counties/:name", get(county_handler))
        .route("/water-quality", get(list_water_quality_handler))
        .route("/water-quality/statistics", get(statistics_handler))
        .route("/water-quality/worst-counties", get(worst_counties_handler))
        .route("/water-quality/:name", get(county_water_quality_handler))
        .route("/treatment-plants", get(list_treatment_plants_handler))
        .route("/treatment-plants/nearby", get(nearby_treatment_plants_handler))
        .route(
            "/treatment-plants/county/:name",
            get(treatment_plants_by_county_handler),
        )
        .route("/treatment-plants/:id", get(treatment_plant_handler))
}

/// Build the application router, mounted under the configured API prefix
pub fn router(state: Arc<AppState>) -> Router {
    let prefix = state.config.server.api_prefix.trim_end_matches('/').to_string();
    let app = if prefix.is_empty() {
        Router::new().merge(api_routes())
    } else {
        Router::new().nest(&prefix, api_routes())
    };

    app.layer(CorsLayer::permissive())
        .layer(create_http_trace_layer())
        .with_state(state)
}

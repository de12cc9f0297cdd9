//! County endpoints: merged county records, population and boundaries.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::{dataset_failure, ApiError, Envelope};
use crate::error::CalWaterError;
use crate::query::SortOrder;
use crate::records::columns;
use crate::service;
use crate::state::AppState;

/// Query parameters for the population endpoint
#[derive(Debug, Default, Deserialize)]
pub struct PopulationQuery {
    /// Column to sort by, the county name by default
    pub sort_by: Option<String>,
    /// "asc" or "desc"
    pub order: Option<String>,
}

/// Handle GET /counties requests
pub async fn list_counties_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let counties = service::list_counties(&state.dataset)
        .map_err(|e| ApiError::new(dataset_failure(e), "/counties", None))?;
    Ok(Envelope::list(counties).into_response())
}

/// Handle GET /counties/{name} requests
pub async fn county_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let endpoint = "/counties/{name}";
    let found = service::get_county(&state.dataset, &name);
    match found {
        Ok(Some(county)) => Ok(Envelope::single(county).into_response()),
        Ok(None) => Err(ApiError::new(
            CalWaterError::not_found(format!("County \"{}\" not found", name)),
            endpoint,
            Some(name.as_str()),
        )),
        Err(e) => Err(ApiError::new(dataset_failure(e), endpoint, Some(name.as_str()))),
    }
}

/// Handle GET /counties/boundaries requests
pub async fn county_boundaries_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let boundaries = service::get_county_boundaries(&state.dataset)
        .map_err(|e| ApiError::new(dataset_failure(e), "/counties/boundaries", None))?;
    Ok(Envelope::single(boundaries).into_response())
}

/// Handle GET /counties/population requests
///
/// `sort_by` defaults to the county name and `order` to ascending.
pub async fn population_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopulationQuery>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let endpoint = "/counties/population";
    let fail = |e: CalWaterError| ApiError::new(e, endpoint, Some(&format!("{:?}", params)));

    let sort_by = params.sort_by.as_deref().unwrap_or(columns::COUNTY_NAME);
    let order = match params.order.as_deref() {
        Some(raw) => raw.parse::<SortOrder>().map_err(fail)?,
        None => SortOrder::Ascending,
    };

    let rows = service::list_population(&state.dataset, sort_by, order)
        .map_err(dataset_failure)
        .map_err(fail)?;

    debug!(
        endpoint = endpoint,
        sort_by = sort_by,
        rows = rows.len(),
        duration_us = start.elapsed().as_micros() as u64,
        "Population request successful"
    );
    Ok(Envelope::list(rows).into_response())
}

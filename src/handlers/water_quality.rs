//! Water quality endpoints.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::{dataset_failure, parse_float, parse_param, ApiError, Envelope};
use crate::error::CalWaterError;
use crate::service::{self, WaterQualityFilter};
use crate::state::AppState;

/// Number of counties per contaminant when `limit` is not given
pub const DEFAULT_WORST_LIMIT: usize = 10;

/// Query parameters for the water quality listing; each bound is inclusive
#[derive(Debug, Default, Deserialize)]
pub struct WaterQualityQuery {
    pub max_lead: Option<String>,
    pub max_arsenic: Option<String>,
    pub max_nitrate: Option<String>,
}

/// Query parameters for the worst counties ranking
#[derive(Debug, Default, Deserialize)]
pub struct WorstCountiesQuery {
    /// Counties per contaminant
    pub limit: Option<String>,
}

/// Handle GET /water-quality requests
pub async fn list_water_quality_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WaterQualityQuery>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let endpoint = "/water-quality";
    let fail = |e: CalWaterError| ApiError::new(e, endpoint, Some(&format!("{:?}", params)));

    let filter = WaterQualityFilter {
        max_lead: parse_float("max_lead", params.max_lead.as_deref()).map_err(fail)?,
        max_arsenic: parse_float("max_arsenic", params.max_arsenic.as_deref()).map_err(fail)?,
        max_nitrate: parse_float("max_nitrate", params.max_nitrate.as_deref()).map_err(fail)?,
    };

    let rows = service::list_water_quality(&state.dataset, filter)
        .map_err(dataset_failure)
        .map_err(fail)?;

    debug!(
        endpoint = endpoint,
        rows = rows.len(),
        duration_us = start.elapsed().as_micros() as u64,
        "Water quality request successful"
    );
    Ok(Envelope::list(rows).into_response())
}

/// Handle GET /water-quality/{name} requests
pub async fn county_water_quality_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let endpoint = "/water-quality/{name}";
    let found = service::get_county_water_quality(&state.dataset, &name);
    match found {
        Ok(Some(record)) => Ok(Envelope::single(record).into_response()),
        Ok(None) => Err(ApiError::new(
            CalWaterError::not_found(format!("Water quality data for \"{}\" not found", name)),
            endpoint,
            Some(name.as_str()),
        )),
        Err(e) => Err(ApiError::new(dataset_failure(e), endpoint, Some(name.as_str()))),
    }
}

/// Handle GET /water-quality/statistics requests
pub async fn statistics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let stats = service::water_quality_statistics(&state.dataset)
        .map_err(|e| ApiError::new(dataset_failure(e), "/water-quality/statistics", None))?;
    Ok(Envelope::single(stats).into_response())
}

/// Handle GET /water-quality/worst-counties requests
pub async fn worst_counties_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WorstCountiesQuery>,
) -> Result<Response, ApiError> {
    let fail = |e: CalWaterError| {
        ApiError::new(
            e,
            "/water-quality/worst-counties",
            Some(&format!("{:?}", params)),
        )
    };

    let limit = parse_param::<usize>("limit", params.limit.as_deref())
        .map_err(fail)?
        .unwrap_or(DEFAULT_WORST_LIMIT);
    let worst = service::worst_counties(&state.dataset, limit)
        .map_err(dataset_failure)
        .map_err(fail)?;
    Ok(Envelope::single(worst).into_response())
}

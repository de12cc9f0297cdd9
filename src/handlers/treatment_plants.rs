//! Treatment plant endpoints, including the proximity search.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{dataset_failure, parse_flag, parse_float, ApiError, Envelope};
use crate::error::CalWaterError;
use crate::geo::GeoPoint;
use crate::logging::generate_request_id;
use crate::service;
use crate::state::AppState;

/// Search radius when `radius` is not given
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Query parameters for the treatment plant listing
#[derive(Debug, Default, Deserialize)]
pub struct TreatmentPlantQuery {
    /// County name, matched case-insensitively
    pub county: Option<String>,
    /// Only plants with public access when true
    pub public_access: Option<String>,
}

/// Query parameters for the proximity search
#[derive(Debug, Default, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// Search radius in kilometers
    pub radius: Option<String>,
}

/// Handle GET /treatment-plants requests
pub async fn list_treatment_plants_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TreatmentPlantQuery>,
) -> Result<Response, ApiError> {
    let fail = |e: CalWaterError| {
        ApiError::new(e, "/treatment-plants", Some(&format!("{:?}", params)))
    };

    let public_only =
        parse_flag("public_access", params.public_access.as_deref()).map_err(fail)?;
    let plants =
        service::list_treatment_plants(&state.dataset, params.county.as_deref(), public_only)
            .map_err(dataset_failure)
            .map_err(fail)?;
    Ok(Envelope::list(plants).into_response())
}

/// Handle GET /treatment-plants/{id} requests
///
/// An id that is not an integer cannot name a plant and is reported as not found.
pub async fn treatment_plant_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let endpoint = "/treatment-plants/{id}";
    let not_found = || {
        ApiError::new(
            CalWaterError::not_found(format!("Treatment plant with ID {} not found", id)),
            endpoint,
            Some(id.as_str()),
        )
    };

    let facility_id = id.trim().parse::<i64>().map_err(|_| not_found())?;
    let found = service::get_treatment_plant(&state.dataset, facility_id);
    match found {
        Ok(Some(plant)) => Ok(Envelope::single(plant).into_response()),
        Ok(None) => Err(not_found()),
        Err(e) => Err(ApiError::new(dataset_failure(e), endpoint, Some(id.as_str()))),
    }
}

/// Handle GET /treatment-plants/county/{name} requests
pub async fn treatment_plants_by_county_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let plants = service::treatment_plants_by_county(&state.dataset, &name)
        .map_err(|e| {
            ApiError::new(
                dataset_failure(e),
                "/treatment-plants/county/{name}",
                Some(name.as_str()),
            )
        })?;
    Ok(Envelope::list(plants)
        .with("county", name.as_str())
        .into_response())
}

/// Handle GET /treatment-plants/nearby requests
///
/// `lat` and `lng` are required; `radius` is in kilometers.
pub async fn nearby_treatment_plants_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQuery>,
) -> Result<Response, ApiError> {
    let request_id = generate_request_id();
    let start = Instant::now();
    let endpoint = "/treatment-plants/nearby";
    let fail = |e: CalWaterError| ApiError::new(e, endpoint, Some(&format!("{:?}", params)));

    debug!(
        endpoint = endpoint,
        request_id = %request_id,
        params = ?params,
        "Processing nearby request"
    );

    let (lat, lng) = match (
        parse_float("lat", params.lat.as_deref()).map_err(fail)?,
        parse_float("lng", params.lng.as_deref()).map_err(fail)?,
    ) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(fail(CalWaterError::validation(
                "lat/lng",
                "latitude and longitude parameters are required",
            )))
        }
    };
    let radius_km = parse_float("radius", params.radius.as_deref())
        .map_err(fail)?
        .unwrap_or(DEFAULT_RADIUS_KM);
    if radius_km < 0.0 {
        return Err(fail(CalWaterError::validation(
            "radius",
            format!("must not be negative, got {}", radius_km),
        )));
    }

    let center = GeoPoint::new(lat, lng).map_err(fail)?;
    let nearby = service::nearby_treatment_plants(&state.dataset, center, radius_km)
        .map_err(dataset_failure)
        .map_err(fail)?;

    info!(
        endpoint = endpoint,
        request_id = %request_id,
        center = %center,
        radius_km = radius_km,
        found = nearby.len(),
        duration_us = start.elapsed().as_micros() as u64,
        "Nearby request successful"
    );

    Ok(Envelope::list(nearby)
        .with("search_center", json!({"latitude": lat, "longitude": lng}))
        .with("radius_km", radius_km)
        .into_response())
}

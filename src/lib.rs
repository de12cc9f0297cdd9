//! # calwater
//!
//! An in-memory query server for California county water data.
//!
//! This library loads four static datasets (county population, water quality
//! contaminant levels, water treatment plant locations and county boundary
//! geometry) into immutable tables and answers read-only queries over them
//! through a versioned HTTP API.
//!
//! ## Architecture
//!
//! - **Dataset Store** ([`store`], [`loader`]): loads each backing file at most
//!   once per process and memoizes the outcome
//! - **Query Engine** ([`query`]): filter, sort, lookup and join over typed
//!   [`records`]
//! - **Aggregation Engine** ([`stats`]): descriptive statistics and top-N rankings
//! - **Geo Index** ([`geo`]): haversine distance and radius search
//! - **Service** ([`service`]): the operations exposed by the API
//! - **API Layer** ([`handlers`]): axum routes and JSON envelopes

pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod loader;
pub mod logging;
pub mod query;
pub mod records;
pub mod service;
pub mod state;
pub mod stats;
pub mod store;

pub use config::Config;
pub use error::{CalWaterError, Result};
pub use logging::{
    create_http_trace_layer, generate_request_id, init_tracing, log_dataset_load_stats, log_error,
    log_operation_end, log_operation_start, log_request_error, log_timed_operation,
};
pub use state::AppState;
pub use store::{Dataset, DatasetKind};

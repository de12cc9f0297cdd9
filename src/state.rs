//! Application state shared by every handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::store::Dataset;

/// The main application state shared across all handlers
#[derive(Debug)]
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// The dataset store
    pub dataset: Dataset,
    /// When the state was built
    pub started_at: Instant,
}

impl AppState {
    /// Create state around a lazy dataset store
    pub fn new(config: Config) -> Self {
        let dataset = Dataset::new(config.data.clone());
        Self::with_dataset(config, dataset)
    }

    /// Create state around an existing store
    pub fn with_dataset(config: Config, dataset: Dataset) -> Self {
        Self {
            config,
            dataset,
            started_at: Instant::now(),
        }
    }

    /// Create state, loading every dataset up front when the configuration
    /// asks for it
    pub fn load(config: Config) -> Result<Self> {
        let dataset = if config.data.preload {
            Dataset::load_all(config.data.clone())?
        } else {
            Dataset::new(config.data.clone())
        };
        Ok(Self::with_dataset(config, dataset))
    }

    /// Create a new AppState wrapped in an Arc for shared ownership
    pub fn new_shared(config: Config) -> Result<Arc<Self>> {
        Self::load(config).map(Arc::new)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

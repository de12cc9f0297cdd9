//! Configuration management for calwater.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CalWaterError, Result};
use crate::store::DatasetKind;

/// Command-line arguments for calwater
#[derive(Parser, Debug, Default)]
#[command(name = "calwater")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing the population, water quality, treatment plant and boundary files
    #[arg(short, long, env = "CALWATER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Host address to bind to
    #[arg(short = 'H', long, env = "CALWATER_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CALWATER_PORT")]
    pub port: Option<u16>,

    /// Number of worker threads
    #[arg(short, long, env = "CALWATER_WORKERS")]
    pub workers: Option<usize>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "CALWATER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CALWATER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Load datasets on first request instead of at startup
    #[arg(long, env = "CALWATER_LAZY")]
    pub lazy: bool,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads (None = number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Path prefix all API routes are mounted under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

/// Location of the backing files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Directory the file names below are resolved against
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_population_file")]
    pub population_file: String,

    #[serde(default = "default_water_quality_file")]
    pub water_quality_file: String,

    #[serde(default = "default_treatment_plants_file")]
    pub treatment_plants_file: String,

    #[serde(default = "default_county_boundaries_file")]
    pub county_boundaries_file: String,

    /// Load every dataset before serving
    #[serde(default = "default_preload")]
    pub preload: bool,
}

impl DataConfig {
    /// Configuration pointing at `data_dir` with the default file names
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Configured file name of a dataset
    pub fn file_name(&self, kind: DatasetKind) -> &str {
        match kind {
            DatasetKind::Population => &self.population_file,
            DatasetKind::WaterQuality => &self.water_quality_file,
            DatasetKind::TreatmentPlants => &self.treatment_plants_file,
            DatasetKind::CountyBoundaries => &self.county_boundaries_file,
        }
    }

    /// Full path of the backing file for a dataset
    pub fn path_for(&self, kind: DatasetKind) -> PathBuf {
        self.data_dir.join(self.file_name(kind))
    }
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Data configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Build a configuration from already parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments and environment
        if let Some(host) = args.host {
            config.server.host = host;
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if args.workers.is_some() {
            config.server.workers = args.workers;
        }
        if let Some(data_dir) = args.data_dir {
            config.data.data_dir = data_dir;
        }
        if let Some(log_level) = args.log_level {
            config.log_level = log_level;
        }
        if args.lazy {
            config.data.preload = false;
        }

        Ok(config)
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CalWaterError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| CalWaterError::Config {
            message: format!("Invalid config file {}: {}", path.display(), e),
        })
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.server.host = other.server.host;
        self.server.port = other.server.port;
        if other.server.workers.is_some() {
            self.server.workers = other.server.workers;
        }
        self.server.api_prefix = other.server.api_prefix;
        self.data = other.data;
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(CalWaterError::Config {
                message: "Server host cannot be empty".to_string(),
            });
        }

        // Validate port (0 is not a valid port for users)
        if self.server.port == 0 {
            return Err(CalWaterError::Config {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if !self.server.api_prefix.starts_with('/') {
            return Err(CalWaterError::Config {
                message: format!(
                    "API prefix must start with '/': {}",
                    self.server.api_prefix
                ),
            });
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(CalWaterError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        for kind in DatasetKind::ALL {
            if self.data.file_name(kind).trim().is_empty() {
                return Err(CalWaterError::Config {
                    message: format!("No file name configured for dataset {}", kind),
                });
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            population_file: default_population_file(),
            water_quality_file: default_water_quality_file(),
            treatment_plants_file: default_treatment_plants_file(),
            county_boundaries_file: default_county_boundaries_file(),
            preload: default_preload(),
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_population_file() -> String {
    "population_by_county.csv".to_string()
}

fn default_water_quality_file() -> String {
    "water_quality_by_county.csv".to_string()
}

fn default_treatment_plants_file() -> String {
    "water_treatment_plants.csv".to_string()
}

fn default_county_boundaries_file() -> String {
    "California_Counties.geojson".to_string()
}

fn default_preload() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

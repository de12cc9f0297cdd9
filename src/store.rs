//! The dataset store.
//!
//! A [`Dataset`] owns the four tables served by calwater. Each table is read
//! from disk at most once per process: the first caller runs the loader
//! inside a one-time cell while concurrent callers block on it, and the
//! outcome (table or error) is memoized for the lifetime of the store.

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::config::DataConfig;
use crate::error::{CalWaterError, Result};
use crate::loader;
use crate::logging::{log_dataset_load_stats, log_error, log_operation_start};
use crate::records::{CountyBoundaries, PopulationRecord, TreatmentPlantRecord, WaterQualityRecord};

/// Logical name of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Population,
    WaterQuality,
    TreatmentPlants,
    CountyBoundaries,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Population,
        DatasetKind::WaterQuality,
        DatasetKind::TreatmentPlants,
        DatasetKind::CountyBoundaries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Population => "population",
            DatasetKind::WaterQuality => "water_quality",
            DatasetKind::TreatmentPlants => "treatment_plants",
            DatasetKind::CountyBoundaries => "county_boundaries",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasetKind {
    type Err = CalWaterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        DatasetKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| CalWaterError::not_found(format!("Unknown dataset: {}", s)))
    }
}

/// Load state of one dataset as reported by the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum LoadState {
    NotLoaded,
    Loaded { rows: usize },
    Failed { error: String },
}

/// Snapshot of a dataset's load state
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatus {
    pub dataset: DatasetKind,
    pub file: String,
    #[serde(flatten)]
    pub state: LoadState,
    pub disk_reads: usize,
}

/// Row count used for load statistics
trait RowCount {
    fn row_count(&self) -> usize;
}

impl<T> RowCount for Vec<T> {
    fn row_count(&self) -> usize {
        self.len()
    }
}

impl RowCount for CountyBoundaries {
    fn row_count(&self) -> usize {
        self.feature_count()
    }
}

/// A lazily loaded, memoized table
struct Slot<T> {
    cell: OnceCell<Result<T>>,
    disk_reads: AtomicUsize,
}

impl<T: RowCount> Slot<T> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            disk_reads: AtomicUsize::new(0),
        }
    }

    fn get_or_load<F>(&self, kind: DatasetKind, config: &DataConfig, load: F) -> Result<&T>
    where
        F: FnOnce(&std::path::Path) -> Result<T>,
    {
        self.cell
            .get_or_init(|| {
                self.disk_reads.fetch_add(1, Ordering::SeqCst);
                let path = config.path_for(kind);
                let start = Instant::now();
                log_operation_start("dataset_load", Some(&path.display().to_string()));

                let outcome = load(&path);
                match &outcome {
                    Ok(table) => log_dataset_load_stats(kind, &path, table.row_count(), start),
                    Err(error) => log_error(error, &format!("loading dataset {}", kind)),
                }
                outcome
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    fn state(&self) -> LoadState {
        match self.cell.get() {
            None => LoadState::NotLoaded,
            Some(Ok(table)) => LoadState::Loaded {
                rows: table.row_count(),
            },
            Some(Err(error)) => LoadState::Failed {
                error: error.to_string(),
            },
        }
    }

    fn disk_reads(&self) -> usize {
        self.disk_reads.load(Ordering::SeqCst)
    }
}

/// The immutable in-memory dataset shared by every request
pub struct Dataset {
    config: DataConfig,
    population: Slot<Vec<PopulationRecord>>,
    water_quality: Slot<Vec<WaterQualityRecord>>,
    treatment_plants: Slot<Vec<TreatmentPlantRecord>>,
    county_boundaries: Slot<CountyBoundaries>,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("data_dir", &self.config.data_dir)
            .field("status", &self.status())
            .finish()
    }
}

impl Dataset {
    /// Create a store that loads each table on first access
    pub fn new(config: DataConfig) -> Self {
        Self {
            config,
            population: Slot::new(),
            water_quality: Slot::new(),
            treatment_plants: Slot::new(),
            county_boundaries: Slot::new(),
        }
    }

    /// Create a store and load every table immediately.
    ///
    /// Fails with the first load error so that broken files are reported at
    /// startup rather than on the first request.
    pub fn load_all(config: DataConfig) -> Result<Self> {
        let dataset = Self::new(config);
        for kind in DatasetKind::ALL {
            dataset.load(kind)?;
        }
        Ok(dataset)
    }

    /// Ensure a dataset is loaded, returning its row (or feature) count
    pub fn load(&self, kind: DatasetKind) -> Result<usize> {
        match kind {
            DatasetKind::Population => self.population().map(<[_]>::len),
            DatasetKind::WaterQuality => self.water_quality().map(<[_]>::len),
            DatasetKind::TreatmentPlants => self.treatment_plants().map(<[_]>::len),
            DatasetKind::CountyBoundaries => {
                self.county_boundaries().map(CountyBoundaries::feature_count)
            }
        }
    }

    pub fn population(&self) -> Result<&[PopulationRecord]> {
        self.population
            .get_or_load(DatasetKind::Population, &self.config, loader::load_population)
            .map(Vec::as_slice)
    }

    pub fn water_quality(&self) -> Result<&[WaterQualityRecord]> {
        self.water_quality
            .get_or_load(DatasetKind::WaterQuality, &self.config, loader::load_water_quality)
            .map(Vec::as_slice)
    }

    pub fn treatment_plants(&self) -> Result<&[TreatmentPlantRecord]> {
        self.treatment_plants
            .get_or_load(
                DatasetKind::TreatmentPlants,
                &self.config,
                loader::load_treatment_plants,
            )
            .map(Vec::as_slice)
    }

    pub fn county_boundaries(&self) -> Result<&CountyBoundaries> {
        self.county_boundaries.get_or_load(
            DatasetKind::CountyBoundaries,
            &self.config,
            loader::load_county_boundaries,
        )
    }

    /// Number of times a dataset's backing file has been read
    pub fn disk_reads(&self, kind: DatasetKind) -> usize {
        match kind {
            DatasetKind::Population => self.population.disk_reads(),
            DatasetKind::WaterQuality => self.water_quality.disk_reads(),
            DatasetKind::TreatmentPlants => self.treatment_plants.disk_reads(),
            DatasetKind::CountyBoundaries => self.county_boundaries.disk_reads(),
        }
    }

    /// Load state of every dataset, without triggering any load
    pub fn status(&self) -> Vec<DatasetStatus> {
        DatasetKind::ALL
            .into_iter()
            .map(|kind| {
                let state = match kind {
                    DatasetKind::Population => self.population.state(),
                    DatasetKind::WaterQuality => self.water_quality.state(),
                    DatasetKind::TreatmentPlants => self.treatment_plants.state(),
                    DatasetKind::CountyBoundaries => self.county_boundaries.state(),
                };
                DatasetStatus {
                    dataset: kind,
                    file: self.config.file_name(kind).to_string(),
                    state,
                    disk_reads: self.disk_reads(kind),
                }
            })
            .collect()
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }
}

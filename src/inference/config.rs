//! Prediction service configuration

use crate::error::{CabRiskError, Result};
use crate::features::TrainingRanges;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Probability above which a booking is flagged as likely to cancel.
///
/// Tuned for recall during training; deliberately distinct from the risk
/// tier boundaries.
pub const DECISION_THRESHOLD: f64 = 0.109;

/// Configuration for loading and running the prediction service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Serialized classifier artifact
    pub model_path: PathBuf,

    /// Optional metadata sidecar
    pub metadata_path: PathBuf,

    /// Rows per batch partition
    pub batch_size: usize,

    /// Number of parallel workers for large batches
    pub n_workers: Option<usize>,

    /// Ranges used for extrapolation warnings
    pub training_ranges: TrainingRanges,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/best_model.json"),
            metadata_path: PathBuf::from("models/model_info.json"),
            batch_size: 5000,
            n_workers: None,
            training_ranges: TrainingRanges::default(),
        }
    }
}

impl PredictorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CabRiskError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            CabRiskError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CabRiskError::ConfigError(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.n_workers == Some(0) {
            return Err(CabRiskError::ConfigError(
                "n_workers must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = path.into();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_n_workers(mut self, n: usize) -> Self {
        self.n_workers = Some(n);
        self
    }

    pub fn with_training_ranges(mut self, ranges: TrainingRanges) -> Self {
        self.training_ranges = ranges;
        self
    }
}

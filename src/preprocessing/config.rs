//! Cleaning configuration

use crate::error::{CabRiskError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for offline booking data cleaning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Label column; never clipped and checked by quality scoring
    pub target_column: String,

    /// IQR multiplier for outlier bounds
    pub iqr_factor: f64,

    /// Extra numeric columns to leave unclipped
    pub clip_exclude: Vec<String>,

    /// Distance above which a trip counts as long (km)
    pub long_distance_km: f64,

    /// Derive `is_round_trip` from leisure travel when the column is absent
    pub infer_round_trip_from_travel_type: bool,

    /// Downcast integers and categorise low-cardinality strings
    pub optimize_dtypes: bool,

    /// String columns with fewer distinct values become categorical
    pub categorical_max_unique: usize,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            target_column: "Car_Cancellation".to_string(),
            iqr_factor: 1.5,
            clip_exclude: Vec::new(),
            long_distance_km: 50.0,
            infer_round_trip_from_travel_type: true,
            optimize_dtypes: true,
            categorical_max_unique: 50,
        }
    }
}

impl CleaningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CabRiskError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CabRiskError::ConfigError(format!("invalid cleaning config {}: {}", path.display(), e))
        })
    }

    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }

    pub fn with_iqr_factor(mut self, factor: f64) -> Self {
        self.iqr_factor = factor;
        self
    }

    pub fn with_clip_exclude(mut self, columns: Vec<String>) -> Self {
        self.clip_exclude = columns;
        self
    }

    pub fn with_long_distance_km(mut self, km: f64) -> Self {
        self.long_distance_km = km;
        self
    }

    pub fn with_round_trip_inference(mut self, enabled: bool) -> Self {
        self.infer_round_trip_from_travel_type = enabled;
        self
    }

    pub fn with_dtype_optimization(mut self, enabled: bool) -> Self {
        self.optimize_dtypes = enabled;
        self
    }

    /// Whether `column` is exempt from clipping
    pub fn is_clip_excluded(&self, column: &str) -> bool {
        column == self.target_column || self.clip_exclude.iter().any(|c| c == column)
    }
}

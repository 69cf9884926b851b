//! Cleaning run report

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::imputer::Imputation;
use super::outlier::ClipRecord;

/// Record of everything one cleaning run did, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// (rows, columns) before cleaning
    pub original_shape: (usize, usize),
    /// (rows, columns) after cleaning
    pub final_shape: (usize, usize),
    /// Human-readable cleaning steps
    pub cleaning_steps: Vec<String>,
    /// Human-readable feature engineering steps
    pub feature_engineering: Vec<String>,
    /// Columns added or rewritten by feature engineering
    pub engineered_features: Vec<String>,
    pub imputations: Vec<Imputation>,
    pub clipped: Vec<ClipRecord>,
    pub cleaned_at: DateTime<Utc>,
}

impl CleaningReport {
    pub fn new(original_shape: (usize, usize)) -> Self {
        Self {
            original_shape,
            final_shape: original_shape,
            cleaning_steps: Vec::new(),
            feature_engineering: Vec::new(),
            engineered_features: Vec::new(),
            imputations: Vec::new(),
            clipped: Vec::new(),
            cleaned_at: Utc::now(),
        }
    }

    pub fn add_step(&mut self, step: impl Into<String>) {
        self.cleaning_steps.push(step.into());
    }

    /// Record an engineering step and the columns it produced
    pub fn add_features(&mut self, description: impl Into<String>, columns: &[&str]) {
        self.feature_engineering.push(description.into());
        for column in columns {
            if !self.engineered_features.iter().any(|c| c == column) {
                self.engineered_features.push(column.to_string());
            }
        }
    }

    pub fn record_imputation(&mut self, imputation: Imputation) {
        self.add_step(format!(
            "Filled {} missing values in {} with {}: {}",
            imputation.filled, imputation.column, imputation.strategy, imputation.value
        ));
        self.imputations.push(imputation);
    }

    pub fn record_clip(&mut self, record: ClipRecord) {
        self.add_step(format!(
            "Clipped {} outliers in {} to [{}, {}]",
            record.clipped, record.column, record.lower, record.upper
        ));
        self.clipped.push(record);
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{ImputeStrategy, ImputeValue};

    #[test]
    fn test_steps_are_appended_in_order() {
        let mut report = CleaningReport::new((10, 4));
        report.record_imputation(Imputation {
            column: "fare".into(),
            strategy: ImputeStrategy::Median,
            value: ImputeValue::Numeric(3.0),
            filled: 2,
        });
        report.record_clip(ClipRecord {
            column: "fare".into(),
            lower: 10.0,
            upper: 50.0,
            clipped: 1,
        });

        assert_eq!(report.cleaning_steps.len(), 2);
        assert_eq!(
            report.cleaning_steps[0],
            "Filled 2 missing values in fare with median: 3"
        );
        assert!(report.cleaning_steps[1].starts_with("Clipped 1 outliers in fare"));
    }

    #[test]
    fn test_add_features_dedupes() {
        let mut report = CleaningReport::new((1, 1));
        report.add_features("Created channel features", &["channel_mobile", "channel_online"]);
        report.add_features("Again", &["channel_mobile"]);
        assert_eq!(report.engineered_features.len(), 2);
        assert_eq!(report.feature_engineering.len(), 2);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = CleaningReport::new((3, 2));
        report.final_shape = (3, 5);
        report.save(&path).unwrap();

        let loaded = CleaningReport::load(&path).unwrap();
        assert_eq!(loaded, report);
    }
}

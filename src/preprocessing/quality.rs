//! Data quality scoring for booking tables.
//!
//! The score starts at 100 and loses points for widespread missing data,
//! duplicated rows and problems in the label column. It never goes below 0.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

const MISSING_THRESHOLD: f64 = 0.05;
const DUPLICATE_THRESHOLD: f64 = 0.01;

const MISSING_PENALTY: u32 = 20;
const DUPLICATE_PENALTY: u32 = 10;
const MISSING_LABEL_PENALTY: u32 = 30;
const INVALID_LABEL_PENALTY: u32 = 20;

/// A problem that lowered the quality score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QualityIssue {
    /// More than 5% of all cells are missing
    HighMissingness { ratio: f64 },
    /// More than 1% of rows repeat an earlier row
    DuplicateRows { count: usize, ratio: f64 },
    /// The label column has nulls
    MissingTargetLabels { column: String, count: usize },
    /// The label column has values other than 0 and 1
    InvalidTargetValues { column: String, count: usize },
}

impl QualityIssue {
    pub fn penalty(&self) -> u32 {
        match self {
            QualityIssue::HighMissingness { .. } => MISSING_PENALTY,
            QualityIssue::DuplicateRows { .. } => DUPLICATE_PENALTY,
            QualityIssue::MissingTargetLabels { .. } => MISSING_LABEL_PENALTY,
            QualityIssue::InvalidTargetValues { .. } => INVALID_LABEL_PENALTY,
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::HighMissingness { ratio } => {
                write!(f, "High missing data: {:.1}%", ratio * 100.0)
            }
            QualityIssue::DuplicateRows { ratio, .. } => {
                write!(f, "Duplicate rows found: {:.1}%", ratio * 100.0)
            }
            QualityIssue::MissingTargetLabels { column, count } => {
                write!(f, "Missing values in target variable {} ({} rows)", column, count)
            }
            QualityIssue::InvalidTargetValues { column, count } => {
                write!(f, "Invalid values in target variable {} ({} rows)", column, count)
            }
        }
    }
}

/// Quality report for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    /// (rows, columns)
    pub shape: (usize, usize),
    /// Null count per column
    pub missing_values: BTreeMap<String, usize>,
    pub duplicate_rows: usize,
    /// Column name to storage type
    pub data_types: BTreeMap<String, String>,
    pub memory_usage_mb: f64,
    /// 0 to 100
    pub quality_score: u32,
    pub issues: Vec<QualityIssue>,
}

impl DataQualityReport {
    pub fn total_missing(&self) -> usize {
        self.missing_values.values().sum()
    }
}

/// Number of rows identical to an earlier row
pub fn count_duplicate_rows(df: &DataFrame) -> Result<usize> {
    if df.width() == 0 {
        return Ok(0);
    }

    let columns = df
        .get_columns()
        .iter()
        .map(|c| c.cast(&DataType::String))
        .collect::<PolarsResult<Vec<_>>>()?;
    let views = columns
        .iter()
        .map(|c| c.str())
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(df.height());
    let mut duplicates = 0;
    for row in 0..df.height() {
        let key: Vec<Option<&str>> = views.iter().map(|ca| ca.get(row)).collect();
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

/// Data quality scorer
pub struct DataQualityScorer;

impl DataQualityScorer {
    /// Score `df`, checking `target` as a 0/1 label column when present
    pub fn score(df: &DataFrame, target: &str) -> Result<DataQualityReport> {
        let (rows, cols) = df.shape();
        let cells = rows * cols;

        let missing_values: BTreeMap<String, usize> = df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect();
        let data_types: BTreeMap<String, String> = df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.dtype().to_string()))
            .collect();
        let total_missing: usize = missing_values.values().sum();
        let duplicate_rows = count_duplicate_rows(df)?;

        let mut issues = Vec::new();

        let missing_ratio = if cells > 0 {
            total_missing as f64 / cells as f64
        } else {
            0.0
        };
        if missing_ratio > MISSING_THRESHOLD {
            issues.push(QualityIssue::HighMissingness {
                ratio: missing_ratio,
            });
        }

        let duplicate_ratio = if rows > 0 {
            duplicate_rows as f64 / rows as f64
        } else {
            0.0
        };
        if duplicate_ratio > DUPLICATE_THRESHOLD {
            issues.push(QualityIssue::DuplicateRows {
                count: duplicate_rows,
                ratio: duplicate_ratio,
            });
        }

        if let Ok(label) = df.column(target) {
            let nulls = label.null_count();
            if nulls > 0 {
                issues.push(QualityIssue::MissingTargetLabels {
                    column: target.to_string(),
                    count: nulls,
                });
            }

            // Nulls are not in {0, 1} either
            let casted = label.as_materialized_series().cast(&DataType::Float64)?;
            let invalid = casted
                .f64()?
                .into_iter()
                .filter(|v| !matches!(v, Some(x) if *x == 0.0 || *x == 1.0))
                .count();
            if invalid > 0 {
                issues.push(QualityIssue::InvalidTargetValues {
                    column: target.to_string(),
                    count: invalid,
                });
            }
        }

        let penalty: u32 = issues.iter().map(QualityIssue::penalty).sum();
        let quality_score = 100u32.saturating_sub(penalty);

        Ok(DataQualityReport {
            shape: (rows, cols),
            missing_values,
            duplicate_rows,
            data_types,
            memory_usage_mb: df.estimated_size() as f64 / 1024.0 / 1024.0,
            quality_score,
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "Car_Cancellation";

    #[test]
    fn test_perfect_quality() {
        let df = df!(
            "vehicle_model_id" => &[1i64, 2, 3, 4],
            TARGET => &[0i64, 1, 0, 0]
        )
        .unwrap();
        let report = DataQualityScorer::score(&df, TARGET).unwrap();
        assert_eq!(report.quality_score, 100);
        assert!(report.issues.is_empty());
        assert_eq!(report.shape, (4, 2));
    }

    #[test]
    fn test_missing_and_duplicates() {
        let df = df!(
            "a" => &[Some(1i64), Some(1), None, Some(4)],
            "b" => &[Some("x"), Some("x"), Some("y"), Some("z")]
        )
        .unwrap();
        let report = DataQualityScorer::score(&df, TARGET).unwrap();
        assert_eq!(report.duplicate_rows, 1);
        assert_eq!(report.total_missing(), 1);
        assert_eq!(report.quality_score, 70);
        assert_eq!(report.issues[0].to_string(), "High missing data: 12.5%");
        assert_eq!(report.issues[1].to_string(), "Duplicate rows found: 25.0%");
    }

    #[test]
    fn test_target_penalties() {
        let df = df!(TARGET => &[Some(0i64), None, Some(2), Some(1)]).unwrap();
        let report = DataQualityScorer::score(&df, TARGET).unwrap();
        // missing 25% (-20), missing label (-30), invalid labels incl. null (-20)
        assert_eq!(report.quality_score, 30);
        assert!(report.issues.iter().any(|i| matches!(
            i,
            QualityIssue::InvalidTargetValues { count: 2, .. }
        )));
    }

    #[test]
    fn test_all_penalties_apply() {
        let df = df!(
            "a" => &[None::<i64>, None, None],
            TARGET => &[None::<i64>, None, None]
        )
        .unwrap();
        let report = DataQualityScorer::score(&df, TARGET).unwrap();
        // -20 -10 -30 -20 = 20; all-null rows also count as duplicates
        assert_eq!(report.duplicate_rows, 2);
        assert_eq!(report.quality_score, 20);
    }

    #[test]
    fn test_empty_table() {
        let report = DataQualityScorer::score(&DataFrame::empty(), TARGET).unwrap();
        assert_eq!(report.shape, (0, 0));
        assert_eq!(report.quality_score, 100);
        assert_eq!(report.duplicate_rows, 0);
    }
}

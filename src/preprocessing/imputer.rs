//! Missing value imputation
//!
//! Numeric columns are filled with their median, string columns with their
//! most frequent value. Only columns that actually contain nulls are touched.

use crate::error::{CabRiskError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::is_numeric_dtype;
use super::outlier::{quantile_sorted, sorted_values};

/// Placeholder for string columns with no observed values
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Linear-interpolated median (numeric only)
    Median,
    /// Most frequent value; ties go to the lexicographically first
    MostFrequent,
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputeStrategy::Median => f.write_str("median"),
            ImputeStrategy::MostFrequent => f.write_str("mode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImputeValue {
    Numeric(f64),
    String(String),
}

impl fmt::Display for ImputeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputeValue::Numeric(v) => write!(f, "{}", v),
            ImputeValue::String(s) => f.write_str(s),
        }
    }
}

/// One filled column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputation {
    pub column: String,
    pub strategy: ImputeStrategy,
    pub value: ImputeValue,
    pub filled: usize,
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Imputer {
    fill_values: BTreeMap<String, (ImputeStrategy, ImputeValue)>,
    /// Numeric columns with no observed values, left as-is
    skipped: Vec<String>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Compute fill values for every column that has nulls
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.fill_values.clear();
        self.skipped.clear();

        for column in df.get_columns() {
            if column.null_count() == 0 {
                continue;
            }
            let name = column.name().to_string();

            if is_numeric_dtype(column.dtype()) {
                let sorted = sorted_values(column)?;
                match quantile_sorted(&sorted, 0.5) {
                    Some(median) => {
                        self.fill_values
                            .insert(name, (ImputeStrategy::Median, ImputeValue::Numeric(median)));
                    }
                    None => self.skipped.push(name),
                }
            } else if is_string_like(column.dtype()) {
                let mode = Self::compute_mode_string(column)?;
                self.fill_values
                    .insert(name, (ImputeStrategy::MostFrequent, ImputeValue::String(mode)));
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill nulls with the fitted values
    pub fn transform(&self, df: &DataFrame) -> Result<(DataFrame, Vec<Imputation>)> {
        if !self.is_fitted {
            return Err(CabRiskError::InvalidInput(
                "imputer used before fit".to_string(),
            ));
        }

        let mut result = df.clone();
        let mut records = Vec::new();

        for (name, (strategy, value)) in &self.fill_values {
            let Ok(column) = df.column(name) else {
                continue;
            };
            let filled = column.null_count();
            if filled == 0 {
                continue;
            }

            let new_column = Self::fill_column(column, value)?;
            result.with_column(new_column)?;

            records.push(Imputation {
                column: name.clone(),
                strategy: *strategy,
                value: value.clone(),
                filled,
            });
        }

        Ok((result, records))
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<(DataFrame, Vec<Imputation>)> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Most frequent non-null value; `"unknown"` if there is none
    fn compute_mode_string(column: &Column) -> Result<String> {
        let casted = column.cast(&DataType::String)?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for val in casted.str()?.into_iter().flatten() {
            *counts.entry(val).or_insert(0) += 1;
        }

        // BTreeMap iterates in key order, so a strict `>` keeps the first tie
        let mut best: Option<(&str, usize)> = None;
        for (val, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((val, count));
            }
        }

        Ok(best
            .map(|(v, _)| v.to_string())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()))
    }

    fn fill_column(column: &Column, value: &ImputeValue) -> Result<Column> {
        let name = column.name().clone();
        match value {
            ImputeValue::Numeric(fill) => {
                let casted = column.as_materialized_series().cast(&DataType::Float64)?;
                let values: Vec<f64> = casted
                    .f64()?
                    .into_iter()
                    .map(|v| v.unwrap_or(*fill))
                    .collect();
                Ok(Column::new(name, values))
            }
            ImputeValue::String(fill) => {
                let casted = column.cast(&DataType::String)?;
                let values: Vec<String> = casted
                    .str()?
                    .into_iter()
                    .map(|v| v.unwrap_or(fill.as_str()).to_string())
                    .collect();
                Ok(Column::new(name, values))
            }
        }
    }
}

fn is_string_like(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(..))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_imputation() {
        let df = df!("fare" => &[Some(1.0), None, Some(3.0), Some(10.0)]).unwrap();
        let (out, records) = Imputer::new().fit_transform(&df).unwrap();

        let fare = out.column("fare").unwrap().f64().unwrap();
        assert_eq!(fare.get(1), Some(3.0));
        assert_eq!(out.column("fare").unwrap().null_count(), 0);
        assert_eq!(records[0].strategy, ImputeStrategy::Median);
        assert_eq!(records[0].value, ImputeValue::Numeric(3.0));
        assert_eq!(records[0].filled, 1);
    }

    #[test]
    fn test_even_count_median_interpolates() {
        let df = df!("a" => &[Some(1i64), Some(2), None, Some(4), Some(5)]).unwrap();
        let (out, _) = Imputer::new().fit_transform(&df).unwrap();
        let a = out.column("a").unwrap().f64().unwrap();
        assert_eq!(a.get(2), Some(3.0));
    }

    #[test]
    fn test_mode_tie_breaks_lexicographically() {
        let df = df!("channel" => &[Some("online"), Some("mobile"), None, Some("online"), Some("mobile")]).unwrap();
        let (out, records) = Imputer::new().fit_transform(&df).unwrap();
        let channel = out.column("channel").unwrap().str().unwrap();
        assert_eq!(channel.get(2), Some("mobile"));
        assert_eq!(records[0].value, ImputeValue::String("mobile".into()));
    }

    #[test]
    fn test_all_null_columns() {
        let df = df!(
            "note" => &[None::<&str>, None],
            "score" => &[None::<f64>, None]
        )
        .unwrap();

        let mut imputer = Imputer::new();
        let (out, records) = imputer.fit_transform(&df).unwrap();

        let note = out.column("note").unwrap().str().unwrap();
        assert_eq!(note.get(0), Some(UNKNOWN_CATEGORY));
        assert_eq!(records.len(), 1);
        assert_eq!(imputer.skipped(), &["score".to_string()]);
        assert_eq!(out.column("score").unwrap().null_count(), 2);
    }

    #[test]
    fn test_complete_columns_untouched() {
        let df = df!("a" => &[1i64, 2, 3]).unwrap();
        let (out, records) = Imputer::new().fit_transform(&df).unwrap();
        assert!(records.is_empty());
        assert_eq!(out.column("a").unwrap().dtype(), &DataType::Int64);
    }
}

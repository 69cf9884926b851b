//! IQR outlier clipping
//!
//! Bounds are `[Q1 - k*IQR, Q3 + k*IQR]` with quartiles taken by linear
//! interpolation between order statistics. Values outside are clipped to the
//! nearest bound, so the row count never changes.

use crate::error::{CabRiskError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::is_numeric_dtype;

/// Quantile of an ascending slice, interpolating linearly at `(n - 1) * q`
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Non-null, non-NaN values of a numeric column, sorted ascending
pub(crate) fn sorted_values(column: &Column) -> Result<Vec<f64>> {
    let casted = column.as_materialized_series().cast(&DataType::Float64)?;
    let mut values: Vec<f64> = casted
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    Ok(values)
}

/// Fitted bounds for a column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub fn from_sorted(sorted: &[f64], factor: f64) -> Option<Self> {
        let q1 = quantile_sorted(sorted, 0.25)?;
        let q3 = quantile_sorted(sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - factor * iqr,
            upper: q3 + factor * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// What clipping did to one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    pub column: String,
    pub lower: f64,
    pub upper: f64,
    pub clipped: usize,
}

/// Clips numeric columns to their IQR bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierClipper {
    factor: f64,
    exclude: Vec<String>,
    bounds: BTreeMap<String, OutlierBounds>,
    is_fitted: bool,
}

impl Default for OutlierClipper {
    fn default() -> Self {
        Self::iqr(1.5)
    }
}

impl OutlierClipper {
    pub fn iqr(factor: f64) -> Self {
        Self {
            factor,
            exclude: Vec::new(),
            bounds: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Columns never clipped, e.g. the label
    pub fn with_exclude(mut self, columns: Vec<String>) -> Self {
        self.exclude = columns;
        self
    }

    pub fn bounds(&self) -> &BTreeMap<String, OutlierBounds> {
        &self.bounds
    }

    /// Compute bounds for every numeric, non-excluded column
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.bounds.clear();

        for column in df.get_columns() {
            let name = column.name().as_str();
            if !is_numeric_dtype(column.dtype()) || self.exclude.iter().any(|c| c == name) {
                continue;
            }
            let sorted = sorted_values(column)?;
            if let Some(bounds) = OutlierBounds::from_sorted(&sorted, self.factor) {
                self.bounds.insert(name.to_string(), bounds);
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Clip fitted columns. Only columns that actually had outliers are
    /// rewritten (as `Float64`); nulls stay null.
    pub fn transform(&self, df: &DataFrame) -> Result<(DataFrame, Vec<ClipRecord>)> {
        if !self.is_fitted {
            return Err(CabRiskError::InvalidInput(
                "outlier clipper used before fit".to_string(),
            ));
        }

        let mut result = df.clone();
        let mut records = Vec::new();

        for (name, bounds) in &self.bounds {
            let Ok(column) = df.column(name) else {
                continue;
            };
            let casted = column.as_materialized_series().cast(&DataType::Float64)?;
            let values = casted.f64()?;

            let clipped = values
                .into_iter()
                .flatten()
                .filter(|v| !v.is_nan() && !bounds.contains(*v))
                .count();
            if clipped == 0 {
                continue;
            }

            let new_values: Vec<Option<f64>> = values
                .into_iter()
                .map(|v| v.map(|x| if x.is_nan() { x } else { x.clamp(bounds.lower, bounds.upper) }))
                .collect();
            result.with_column(Column::new(name.as_str().into(), new_values))?;

            records.push(ClipRecord {
                column: name.clone(),
                lower: bounds.lower,
                upper: bounds.upper,
                clipped,
            });
        }

        Ok((result, records))
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<(DataFrame, Vec<ClipRecord>)> {
        self.fit(df)?;
        self.transform(df)
    }
}

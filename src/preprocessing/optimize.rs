//! Storage optimisation
//!
//! Integer columns are narrowed to the smallest type that holds their
//! observed range, and low-cardinality string columns become categorical.
//! Logical values never change.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A column whose storage type changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtypeChange {
    pub column: String,
    pub from: String,
    pub to: String,
}

/// Outcome of one optimisation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub changes: Vec<DtypeChange>,
}

impl OptimizationSummary {
    /// Megabytes saved; zero or negative when nothing shrank
    pub fn saved_mb(&self) -> f64 {
        (self.bytes_before as f64 - self.bytes_after as f64) / 1024.0 / 1024.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DtypeOptimizer {
    /// String columns with fewer distinct values become categorical
    categorical_max_unique: usize,
}

impl Default for DtypeOptimizer {
    fn default() -> Self {
        Self::new(50)
    }
}

fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

fn byte_width(dtype: &DataType) -> usize {
    match dtype {
        DataType::Int8 | DataType::UInt8 => 1,
        DataType::Int16 | DataType::UInt16 => 2,
        DataType::Int32 | DataType::UInt32 => 4,
        _ => 8,
    }
}

/// Narrowest type holding `[min, max]`; upper bounds are exclusive
fn narrowest_integer(min: i64, max: i64) -> Option<DataType> {
    if min >= 0 && max < 255 {
        Some(DataType::UInt8)
    } else if min >= -128 && max < 127 {
        Some(DataType::Int8)
    } else if min >= -32_768 && max < 32_767 {
        Some(DataType::Int16)
    } else if min >= i32::MIN as i64 && max < i32::MAX as i64 {
        Some(DataType::Int32)
    } else {
        None
    }
}

impl DtypeOptimizer {
    pub fn new(categorical_max_unique: usize) -> Self {
        Self {
            categorical_max_unique,
        }
    }

    pub fn optimize(&self, df: &DataFrame) -> Result<(DataFrame, OptimizationSummary)> {
        let bytes_before = df.estimated_size();
        let mut result = df.clone();
        let mut changes = Vec::new();

        for column in df.get_columns() {
            let dtype = column.dtype();
            let target = if is_integer_dtype(dtype) {
                self.integer_target(column)?
            } else if dtype == &DataType::String {
                self.categorical_target(column)?
            } else {
                None
            };

            if let Some(target) = target {
                let converted = column.cast(&target)?;
                changes.push(DtypeChange {
                    column: column.name().to_string(),
                    from: dtype.to_string(),
                    to: target.to_string(),
                });
                result.with_column(converted)?;
            }
        }

        let bytes_after = result.estimated_size();
        Ok((
            result,
            OptimizationSummary {
                bytes_before,
                bytes_after,
                changes,
            },
        ))
    }

    fn integer_target(&self, column: &Column) -> Result<Option<DataType>> {
        let casted = column.as_materialized_series().cast(&DataType::Int64)?;
        let values = casted.i64()?;
        let (Some(min), Some(max)) = (values.min(), values.max()) else {
            return Ok(None);
        };

        Ok(narrowest_integer(min, max)
            .filter(|target| byte_width(target) < byte_width(column.dtype())))
    }

    fn categorical_target(&self, column: &Column) -> Result<Option<DataType>> {
        let distinct: HashSet<&str> = column.str()?.into_iter().flatten().collect();
        if distinct.len() < self.categorical_max_unique {
            Ok(Some(DataType::Categorical(None, CategoricalOrdering::Physical)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowest_integer() {
        assert_eq!(narrowest_integer(0, 254), Some(DataType::UInt8));
        assert_eq!(narrowest_integer(0, 255), Some(DataType::Int16));
        assert_eq!(narrowest_integer(-5, 100), Some(DataType::Int8));
        assert_eq!(narrowest_integer(-5, 1391), Some(DataType::Int16));
        assert_eq!(narrowest_integer(0, 100_000), Some(DataType::Int32));
        assert_eq!(narrowest_integer(0, i64::MAX), None);
    }

    #[test]
    fn test_downcast_preserves_values() {
        let df = df!(
            "vehicle_model_id" => &[1i64, 12, 91],
            "from_area_id" => &[6i64, 700, 1391],
            "fare" => &[1.5, 2.5, 3.5]
        )
        .unwrap();

        let (out, summary) = DtypeOptimizer::default().optimize(&df).unwrap();
        assert_eq!(out.column("vehicle_model_id").unwrap().dtype(), &DataType::UInt8);
        assert_eq!(out.column("from_area_id").unwrap().dtype(), &DataType::Int16);
        assert_eq!(out.column("fare").unwrap().dtype(), &DataType::Float64);
        assert_eq!(summary.changes.len(), 2);

        let area: Vec<i64> = out
            .column("from_area_id")
            .unwrap()
            .cast(&DataType::Int64)
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(area, vec![6, 700, 1391]);
    }

    #[test]
    fn test_low_cardinality_strings_become_categorical() {
        let df = df!("booking_channel" => &["online", "mobile", "online"]).unwrap();
        let (out, _) = DtypeOptimizer::default().optimize(&df).unwrap();
        assert!(matches!(
            out.column("booking_channel").unwrap().dtype(),
            DataType::Categorical(..)
        ));

        let (out, _) = DtypeOptimizer::new(2).optimize(&df).unwrap();
        assert_eq!(out.column("booking_channel").unwrap().dtype(), &DataType::String);
    }
}

//! Booking data cleaning and quality scoring
//!
//! Provides:
//! - Median / mode imputation
//! - IQR outlier clipping
//! - Storage type optimisation
//! - A 0-100 data quality score
//! - [`DataQualityProcessor`], which chains the above with feature engineering

mod config;
mod imputer;
mod optimize;
mod outlier;
mod processor;
mod quality;
mod report;

pub use config::CleaningConfig;
pub use imputer::{Imputation, ImputeStrategy, ImputeValue, Imputer, UNKNOWN_CATEGORY};
pub use optimize::{DtypeChange, DtypeOptimizer, OptimizationSummary};
pub use outlier::{quantile_sorted, ClipRecord, OutlierBounds, OutlierClipper};
pub use processor::{report_path_for, DataQualityProcessor};
pub use quality::{count_duplicate_rows, DataQualityReport, DataQualityScorer, QualityIssue};
pub use report::CleaningReport;

use polars::prelude::DataType;

/// Whether a column of this type is imputed with a median and clipped
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
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
            | DataType::Float32
            | DataType::Float64
    )
}

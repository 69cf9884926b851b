//! CSV loading and saving

use crate::error::{CabRiskError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Rows inspected when inferring column types
const INFER_SCHEMA_ROWS: usize = 1000;

/// Load a CSV file with a header row
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let start = Instant::now();
    let file = File::open(path)
        .map_err(|e| CabRiskError::DataError(format!("{}: {}", path.display(), e)))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| CabRiskError::DataError(format!("{}: {}", path.display(), e)))?;

    debug!(
        "Loaded {} rows x {} columns from {} in {:?}",
        df.height(),
        df.width(),
        path.display(),
        start.elapsed()
    );
    Ok(df)
}

/// Write `df` as CSV with a header row, creating parent directories
pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| CabRiskError::DataError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let mut df = df!(
            "vehicle_model_id" => &[12i64, 24, 89],
            "booking_channel" => &["online", "mobile", "phone"]
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bookings.csv");
        save_csv(&mut df, &path).unwrap();

        let loaded = load_csv(&path).unwrap();
        assert_eq!(loaded.shape(), (3, 2));
        assert!(loaded.equals(&df));
    }

    #[test]
    fn test_missing_file() {
        let err = load_csv("/nonexistent/bookings.csv").unwrap_err();
        assert!(matches!(err, CabRiskError::DataError(_)));
    }
}

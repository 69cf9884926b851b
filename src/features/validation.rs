//! Booking validation and training-range checks
//!
//! Two levels of checking:
//! - [`validate_booking`] rejects records that break hard invariants.
//! - [`TrainingRanges`] flags values the classifier never saw during
//!   training. These are warnings; scoring continues.

use crate::error::{CabRiskError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use super::builder::numeric_column;
use super::record::BookingRecord;

/// Check a booking for missing required fields and impossible values.
///
/// All problems are collected into one error.
pub fn validate_booking(record: &BookingRecord) -> Result<()> {
    let mut problems = Vec::new();

    if record.vehicle_model_id.is_none() {
        problems.push("missing required field: vehicle_model_id".to_string());
    }
    if record.travel_type.is_none() {
        problems.push("missing required field: travel_type_id".to_string());
    }
    if record.from_area_id.is_none() {
        problems.push("missing required field: from_area_id".to_string());
    }
    if record.to_area_id.is_none() {
        problems.push("missing required field: to_area_id".to_string());
    }

    if let Some(id) = record.vehicle_model_id {
        if id < 0 {
            problems.push(format!("vehicle_model_id must be non-negative, got {}", id));
        }
    }

    let lat_fields = [("from_lat", record.from_lat), ("to_lat", record.to_lat)];
    for (name, value) in lat_fields {
        if let Some(v) = value {
            if !(-90.0..=90.0).contains(&v) {
                problems.push(format!("{} must be within [-90, 90], got {}", name, v));
            }
        }
    }

    let long_fields = [("from_long", record.from_long), ("to_long", record.to_long)];
    for (name, value) in long_fields {
        if let Some(v) = value {
            if !(-180.0..=180.0).contains(&v) {
                problems.push(format!("{} must be within [-180, 180], got {}", name, v));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CabRiskError::ValidationError(problems.join("; ")))
    }
}

/// A value outside the range seen in training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRangeWarning {
    pub field: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    /// Number of rows affected, for table checks
    pub rows: usize,
}

impl fmt::Display for ValueRangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows > 1 {
            write!(
                f,
                "{} outside training range [{}, {}] in {} rows (e.g. {})",
                self.field, self.min, self.max, self.rows, self.value
            )
        } else {
            write!(
                f,
                "{} = {} is outside training range [{}, {}]",
                self.field, self.value, self.min, self.max
            )
        }
    }
}

/// Observed `[min, max]` for the fields the classifier is sensitive to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRanges {
    pub vehicle_model_id: (f64, f64),
    pub from_area_id: (f64, f64),
    pub to_area_id: (f64, f64),
    pub latitude: (f64, f64),
    pub longitude: (f64, f64),
    pub from_city_id: (f64, f64),
}

impl Default for TrainingRanges {
    fn default() -> Self {
        Self {
            vehicle_model_id: (1.0, 91.0),
            from_area_id: (6.0, 1391.0),
            to_area_id: (25.0, 1390.0),
            latitude: (12.78, 13.24),
            longitude: (77.47, 77.79),
            from_city_id: (1.0, 15.0),
        }
    }
}

impl TrainingRanges {
    fn fields(&self) -> [(&'static str, (f64, f64)); 8] {
        [
            ("vehicle_model_id", self.vehicle_model_id),
            ("from_area_id", self.from_area_id),
            ("to_area_id", self.to_area_id),
            ("from_lat", self.latitude),
            ("from_long", self.longitude),
            ("to_lat", self.latitude),
            ("to_long", self.longitude),
            ("from_city_id", self.from_city_id),
        ]
    }

    /// Warnings for a single booking. Missing fields are not checked.
    pub fn check(&self, record: &BookingRecord) -> Vec<ValueRangeWarning> {
        let values = [
            record.vehicle_model_id.map(|v| v as f64),
            record.from_area_id.map(|v| v as f64),
            record.to_area_id.map(|v| v as f64),
            record.from_lat,
            record.from_long,
            record.to_lat,
            record.to_long,
            record.from_city_id.map(|v| v as f64),
        ];

        let warnings: Vec<ValueRangeWarning> = self
            .fields()
            .into_iter()
            .zip(values)
            .filter_map(|((field, (min, max)), value)| {
                let value = value?;
                (value < min || value > max).then(|| ValueRangeWarning {
                    field: field.to_string(),
                    value,
                    min,
                    max,
                    rows: 1,
                })
            })
            .collect();

        for w in &warnings {
            warn!("{}", w);
        }
        warnings
    }

    /// Warnings for a table; one per field, counting the affected rows.
    ///
    /// Zero is treated as a missing value and skipped.
    pub fn check_table(&self, df: &DataFrame) -> Result<Vec<ValueRangeWarning>> {
        let mut warnings = Vec::new();

        for (field, (min, max)) in self.fields() {
            let Some(values) = numeric_column(df, field)? else {
                continue;
            };

            let outside: Vec<f64> = values
                .into_iter()
                .filter(|&v| v != 0.0 && (v < min || v > max))
                .collect();

            if let Some(&first) = outside.first() {
                let w = ValueRangeWarning {
                    field: field.to_string(),
                    value: first,
                    min,
                    max,
                    rows: outside.len(),
                };
                warn!("{}", w);
                warnings.push(w);
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::record::{RiskProfile, TravelType};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn complete_record() -> BookingRecord {
        BookingRecord::new()
            .with_vehicle_model_id(12)
            .with_travel_type(TravelType::Business)
            .with_areas(100, 150)
    }

    #[test]
    fn test_valid_booking() {
        assert!(validate_booking(&complete_record()).is_ok());
    }

    #[test]
    fn test_reports_all_problems() {
        let record = BookingRecord::new()
            .with_vehicle_model_id(-1)
            .with_origin(95.0, 77.5)
            .with_destination(12.9, 200.0);

        let err = validate_booking(&record).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("travel_type_id"));
        assert!(msg.contains("from_area_id"));
        assert!(msg.contains("to_area_id"));
        assert!(msg.contains("non-negative"));
        assert!(msg.contains("from_lat"));
        assert!(msg.contains("to_long"));
    }

    #[test]
    fn test_presets_within_training_ranges() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let ranges = TrainingRanges::default();
        for profile in [RiskProfile::LowRisk, RiskProfile::MediumRisk, RiskProfile::HighRisk] {
            let record = BookingRecord::sample_on(profile, date, &mut rng);
            assert!(ranges.check(&record).is_empty(), "{:?}", profile);
        }
    }

    #[test]
    fn test_out_of_range_warnings() {
        let record = complete_record()
            .with_vehicle_model_id(120)
            .with_origin(28.6, 77.2);
        let warnings = TrainingRanges::default().check(&record);
        let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(fields, vec!["vehicle_model_id", "from_lat", "from_long"]);
    }

    #[test]
    fn test_check_table_counts_rows() {
        let df = df!(
            "vehicle_model_id" => &[12i64, 95, 140, 0],
            "from_city_id" => &[1i64, 2, 3, 4]
        )
        .unwrap();
        let warnings = TrainingRanges::default().check_table(&df).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "vehicle_model_id");
        assert_eq!(warnings[0].rows, 2);
        assert_eq!(warnings[0].value, 95.0);
    }
}

//! Offline booking data cleaning
//!
//! A cleaning run applies, in order:
//! 1. median / mode imputation
//! 2. IQR clipping of numeric columns (the label excluded)
//! 3. feature engineering shared with the prediction path
//! 4. storage optimisation
//!
//! Every step is recorded in a [`CleaningReport`].

use crate::error::{CabRiskError, Result};
use crate::features::{
    channel_one_hot, numeric_column, parse_timestamp, string_column, temporal_features,
    DistanceEnricher,
};
use crate::utils::data_loader::{load_csv, save_csv};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::config::CleaningConfig;
use super::imputer::Imputer;
use super::optimize::DtypeOptimizer;
use super::outlier::OutlierClipper;
use super::quality::{DataQualityReport, DataQualityScorer};
use super::report::CleaningReport;

/// Path of the report written next to an exported CSV
pub fn report_path_for(csv_path: &Path) -> PathBuf {
    let stem = csv_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cleaned".to_string());
    csv_path.with_file_name(format!("{}_cleaning_report.json", stem))
}

/// Interpret a flag column as 0/1, accepting numbers, booleans and
/// true/false style strings. Unknown values become 0.
fn flag_column(df: &DataFrame, name: &str) -> Result<Option<Vec<i32>>> {
    match numeric_column(df, name) {
        Ok(values) => Ok(values.map(|v| v.into_iter().map(|x| (x != 0.0) as i32).collect())),
        Err(CabRiskError::InputShape(_)) => {
            let values = string_column(df, name)?.map(|v| {
                v.into_iter()
                    .map(|s| {
                        let truthy = s.map(|s| s.trim().to_ascii_lowercase()).is_some_and(|s| {
                            matches!(s.as_str(), "true" | "yes" | "y" | "1")
                        });
                        truthy as i32
                    })
                    .collect()
            });
            Ok(values)
        }
        Err(e) => Err(e),
    }
}

/// Cleans raw booking tables and scores their quality
#[derive(Debug, Clone, Default)]
pub struct DataQualityProcessor {
    config: CleaningConfig,
}

impl DataQualityProcessor {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run the full cleaning sequence over `raw`
    pub fn clean(&self, raw: &DataFrame) -> Result<(DataFrame, CleaningReport)> {
        let start = Instant::now();
        let mut report = CleaningReport::new(raw.shape());

        let missing_before: usize = raw.get_columns().iter().map(|c| c.null_count()).sum();
        info!("Cleaning {} rows x {} columns ({} missing values)", raw.height(), raw.width(), missing_before);

        // 1. Missing values
        let mut imputer = Imputer::new();
        let (df, imputations) = imputer.fit_transform(raw)?;
        for imputation in imputations {
            report.record_imputation(imputation);
        }
        for column in imputer.skipped() {
            warn!("Column {} is entirely null and was left unfilled", column);
            report.add_step(format!("Left {} unfilled: column is entirely null", column));
        }

        // 2. Outliers
        let mut exclude = self.config.clip_exclude.clone();
        exclude.push(self.config.target_column.clone());
        let mut clipper = OutlierClipper::iqr(self.config.iqr_factor).with_exclude(exclude);
        let (df, clipped) = clipper.fit_transform(&df)?;
        for record in clipped {
            report.record_clip(record);
        }

        // 3. Feature engineering
        let df = self.engineer_features(&df, &mut report)?;

        // 4. Storage
        let df = if self.config.optimize_dtypes {
            let optimizer = DtypeOptimizer::new(self.config.categorical_max_unique);
            let (optimized, summary) = optimizer.optimize(&df)?;
            debug!("Changed storage type of {} columns", summary.changes.len());
            let saved = summary.saved_mb();
            if saved > 0.0 {
                report.add_step(format!("Optimized data types - saved {:.1} MB", saved));
            }
            optimized
        } else {
            df
        };

        report.final_shape = df.shape();
        info!(
            "Cleaning finished: {:?} -> {:?} in {:.1} ms",
            report.original_shape,
            report.final_shape,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok((df, report))
    }

    /// Derive model-facing features from raw booking columns
    pub fn engineer_features(&self, df: &DataFrame, report: &mut CleaningReport) -> Result<DataFrame> {
        let mut result = df.clone();
        let n = df.height();

        if let Some(created) = string_column(df, "booking_created")? {
            let mut hour = Vec::with_capacity(n);
            let mut dow = Vec::with_capacity(n);
            let mut month = Vec::with_capacity(n);
            let mut weekend = Vec::with_capacity(n);
            let mut late = Vec::with_capacity(n);

            for raw in &created {
                match raw.as_deref().and_then(parse_timestamp) {
                    Some(ts) => {
                        let [h, d, m] = temporal_features(Some(ts)).map(|v| v as i32);
                        hour.push(Some(h));
                        dow.push(Some(d));
                        month.push(Some(m));
                        weekend.push((d >= 5) as i32);
                        late.push((h <= 6 || h >= 22) as i32);
                    }
                    None => {
                        hour.push(None);
                        dow.push(None);
                        month.push(None);
                        weekend.push(0);
                        late.push(0);
                    }
                }
            }

            result.with_column(Column::new("booking_hour".into(), hour))?;
            result.with_column(Column::new("booking_day_of_week".into(), dow))?;
            result.with_column(Column::new("booking_month".into(), month))?;
            result.with_column(Column::new("is_weekend".into(), weekend))?;
            result.with_column(Column::new("is_late_booking".into(), late))?;
            report.add_features(
                "Created time-based features: hour, day_of_week, month, is_weekend, is_late_booking",
                &[
                    "booking_hour",
                    "booking_day_of_week",
                    "booking_month",
                    "is_weekend",
                    "is_late_booking",
                ],
            );
        }

        let travel_type = numeric_column(df, "travel_type_id")?;
        if let Some(travel) = &travel_type {
            let business: Vec<i32> = travel.iter().map(|&t| (t == 1.0) as i32).collect();
            let leisure: Vec<i32> = travel.iter().map(|&t| (t == 2.0) as i32).collect();
            result.with_column(Column::new("is_business_travel".into(), business))?;
            result.with_column(Column::new("is_leisure_travel".into(), leisure))?;
            report.add_features(
                "Created travel type binary features",
                &["is_business_travel", "is_leisure_travel"],
            );
        }

        if let Some(channels) = string_column(df, "booking_channel")? {
            let mut mobile = Vec::with_capacity(n);
            let mut online = Vec::with_capacity(n);
            let mut other = Vec::with_capacity(n);
            for raw in &channels {
                let [m, o, x] = channel_one_hot(raw.as_deref()).map(|v| v as i32);
                mobile.push(m);
                online.push(o);
                other.push(x);
            }
            result.with_column(Column::new("channel_mobile".into(), mobile))?;
            result.with_column(Column::new("channel_online".into(), online))?;
            result.with_column(Column::new("channel_other".into(), other))?;
            report.add_features(
                "Created booking channel dummy variables",
                &["channel_mobile", "channel_online", "channel_other"],
            );
        }

        if let Some(round_trip) = flag_column(df, "is_round_trip")? {
            result.with_column(Column::new("is_round_trip".into(), round_trip))?;
            report.add_features("Normalized is_round_trip to 0/1", &["is_round_trip"]);
        } else if let (true, Some(travel)) =
            (self.config.infer_round_trip_from_travel_type, &travel_type)
        {
            let round_trip: Vec<i32> = travel.iter().map(|&t| (t == 2.0) as i32).collect();
            result.with_column(Column::new("is_round_trip".into(), round_trip))?;
            report.add_features(
                "Created is_round_trip feature based on travel type",
                &["is_round_trip"],
            );
        }

        if DistanceEnricher::has_coordinates(df) {
            let enricher = DistanceEnricher::new(self.config.long_distance_km);
            result = enricher.enrich(&result)?;
            report.add_features(
                "Created distance-based features",
                &["trip_distance", "is_long_distance"],
            );
        }

        Ok(result)
    }

    /// Score the quality of `df` against the configured label column
    pub fn validate_data_quality(&self, df: &DataFrame) -> Result<DataQualityReport> {
        let report = DataQualityScorer::score(df, &self.config.target_column)?;
        for issue in &report.issues {
            warn!("Data quality issue: {}", issue);
        }
        Ok(report)
    }

    /// Write the cleaned table to `path` and the report beside it.
    ///
    /// Returns the report path.
    pub fn export(&self, cleaned: &DataFrame, report: &CleaningReport, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let mut df = cleaned.clone();
        save_csv(&mut df, path)?;

        let report_path = report_path_for(path);
        report.save(&report_path)?;

        info!("Cleaned data saved to {}", path.display());
        info!("Cleaning report saved to {}", report_path.display());
        Ok(report_path)
    }

    /// Load a CSV and clean it
    pub fn load_and_clean(&self, path: impl AsRef<Path>) -> Result<(DataFrame, CleaningReport)> {
        let raw = load_csv(path)?;
        self.clean(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_bookings() -> DataFrame {
        df!(
            "booking_created" => &[
                Some("2024-03-16 23:45:00"),
                Some("2024-03-18 09:15:00"),
                None,
                Some("2024-03-20 04:00:00"),
            ],
            "booking_channel" => &[Some("online"), None, Some("phone"), Some("mobile")],
            "travel_type_id" => &[Some(2i64), Some(1), Some(2), None],
            "vehicle_model_id" => &[Some(12i64), Some(24), Some(12), Some(89)],
            "from_lat" => &[12.97, 12.98, 12.99, 13.0],
            "from_long" => &[77.59, 77.6, 77.61, 77.62],
            "to_lat" => &[12.979, 12.3, 12.99, 13.0],
            "to_long" => &[77.59, 76.6, 77.61, 77.62],
            "Car_Cancellation" => &[0i64, 1, 0, 0]
        )
        .unwrap()
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            report_path_for(Path::new("/data/clean.csv")),
            PathBuf::from("/data/clean_cleaning_report.json")
        );
    }

    #[test]
    fn test_engineer_features() {
        let processor = DataQualityProcessor::default();
        let mut report = CleaningReport::new((4, 9));
        let out = processor.engineer_features(&raw_bookings(), &mut report).unwrap();

        let hour = out.column("booking_hour").unwrap().i32().unwrap();
        assert_eq!(hour.get(0), Some(23));
        assert_eq!(hour.get(2), None);

        // 2024-03-16 is a Saturday
        let weekend = out.column("is_weekend").unwrap().i32().unwrap();
        assert_eq!(weekend.get(0), Some(1));
        assert_eq!(weekend.get(1), Some(0));

        let late = out.column("is_late_booking").unwrap().i32().unwrap();
        assert_eq!(late.get(0), Some(1));
        assert_eq!(late.get(1), Some(0));
        assert_eq!(late.get(2), Some(0));
        assert_eq!(late.get(3), Some(1));

        let other = out.column("channel_other").unwrap().i32().unwrap();
        assert_eq!(other.get(1), Some(1));
        assert_eq!(other.get(2), Some(1));

        let round_trip = out.column("is_round_trip").unwrap().i32().unwrap();
        assert_eq!(round_trip.get(0), Some(1));
        assert_eq!(round_trip.get(1), Some(0));

        let long = out.column("is_long_distance").unwrap().i32().unwrap();
        assert_eq!(long.get(0), Some(0));
        assert_eq!(long.get(1), Some(1));

        assert!(report.engineered_features.contains(&"trip_distance".to_string()));
    }

    #[test]
    fn test_existing_round_trip_column_is_normalized() {
        let df = df!(
            "travel_type_id" => &[2i64, 2],
            "is_round_trip" => &["False", "true"]
        )
        .unwrap();
        let mut report = CleaningReport::new((2, 2));
        let out = DataQualityProcessor::default()
            .engineer_features(&df, &mut report)
            .unwrap();
        let round_trip: Vec<i32> = out
            .column("is_round_trip")
            .unwrap()
            .i32()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(round_trip, vec![0, 1]);
    }

    #[test]
    fn test_round_trip_inference_can_be_disabled() {
        let df = df!("travel_type_id" => &[2i64, 1]).unwrap();
        let processor =
            DataQualityProcessor::new(CleaningConfig::new().with_round_trip_inference(false));
        let mut report = CleaningReport::new((2, 1));
        let out = processor.engineer_features(&df, &mut report).unwrap();
        assert!(out.column("is_round_trip").is_err());
    }

    #[test]
    fn test_clean_fills_and_records() {
        let (cleaned, report) = DataQualityProcessor::default()
            .clean(&raw_bookings())
            .unwrap();

        assert_eq!(cleaned.height(), 4);
        assert_eq!(report.original_shape, (4, 9));
        assert_eq!(report.final_shape, cleaned.shape());
        assert_eq!(cleaned.column("travel_type_id").unwrap().null_count(), 0);
        assert_eq!(cleaned.column("booking_channel").unwrap().null_count(), 0);
        assert!(report
            .imputations
            .iter()
            .any(|i| i.column == "booking_channel"));
        assert!(!report.feature_engineering.is_empty());
    }
}

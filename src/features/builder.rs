//! Feature vector construction
//!
//! Converts raw bookings into the ordered numeric features the classifier
//! was trained on. Single records and tables go through the same
//! derivations:
//! - temporal slots (hour, Monday-based weekday, month) from the creation time
//! - a three-way channel one-hot where anything unrecognised counts as "other"
//! - direct copies of numeric fields, defaulting to 0

use crate::error::{CabRiskError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use polars::prelude::*;
use tracing::debug;

use super::record::BookingRecord;
use super::schema::{Feature, FeatureSchema, FEATURE_COUNT};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a booking creation timestamp.
///
/// Returns `None` for empty or unrecognised text. Offsets in RFC 3339 input
/// are dropped and the wall-clock time is kept.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.and_time(NaiveTime::default()))
}

/// `[hour, day_of_week, month]`, all zero when the time is unknown
pub fn temporal_features(created: Option<NaiveDateTime>) -> [f64; 3] {
    match created {
        Some(ts) => [
            ts.hour() as f64,
            ts.weekday().num_days_from_monday() as f64,
            ts.month() as f64,
        ],
        None => [0.0; 3],
    }
}

/// `[mobile, online, other]`; exactly one slot is set
pub fn channel_one_hot(channel: Option<&str>) -> [f64; 3] {
    let normalized = channel.map(|c| c.trim().to_ascii_lowercase());
    match normalized.as_deref() {
        Some("mobile") => [1.0, 0.0, 0.0],
        Some("online") => [0.0, 1.0, 0.0],
        _ => [0.0, 0.0, 1.0],
    }
}

/// Pre-derived `[mobile, online, other]` flags forced back to a one-hot.
///
/// An absent `other` is the complement of the two named channels. Rows that
/// still are not a one-hot fall back to `other`.
fn reconcile_channels(mobile: f64, online: f64, other: Option<f64>) -> [f64; 3] {
    let is_flag = |v: f64| v == 0.0 || v == 1.0;
    let other = other.unwrap_or(1.0 - mobile - online);
    let one_hot = [mobile, online, other];
    if one_hot.iter().all(|&v| is_flag(v)) && one_hot.iter().sum::<f64>() == 1.0 {
        one_hot
    } else {
        [0.0, 0.0, 1.0]
    }
}

fn flag(value: Option<bool>) -> f64 {
    if value.unwrap_or(false) {
        1.0
    } else {
        0.0
    }
}

/// Read a column as `f64` with nulls and NaN replaced by 0.
///
/// `Ok(None)` when the column is absent; an input-shape error when it exists
/// but is not numeric.
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Option<Vec<f64>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };

    let casted = column
        .as_materialized_series()
        .strict_cast(&DataType::Float64)
        .map_err(|_| {
            CabRiskError::InputShape(format!(
                "column '{}' of type {} cannot be interpreted as numeric",
                name,
                column.dtype()
            ))
        })?;

    let values = casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()).unwrap_or(0.0))
        .collect();

    Ok(Some(values))
}

/// Read a column as optional strings, whatever its stored type
pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };

    let casted = column.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();

    Ok(Some(values))
}

/// Fixed-order numeric features for one booking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: [0.0; FEATURE_COUNT],
        }
    }
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = value;
    }

    /// Values in trained order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Values in the order the given schema expects
    pub fn ordered(&self, schema: &FeatureSchema) -> Vec<f64> {
        schema.features().iter().map(|&f| self.get(f)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |&f| (f, self.get(f)))
    }
}

/// Builds classifier inputs from bookings
#[derive(Debug, Clone, Default)]
pub struct FeatureVectorBuilder {
    schema: FeatureSchema,
}

impl FeatureVectorBuilder {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Build the full feature vector for a single booking
    pub fn build(&self, record: &BookingRecord) -> FeatureVector {
        let mut v = FeatureVector::default();

        v.set(Feature::OnlineBooking, flag(record.online_booking));
        v.set(Feature::MobileSiteBooking, flag(record.mobile_site_booking));
        v.set(
            Feature::VehicleModelId,
            record.vehicle_model_id.unwrap_or(0) as f64,
        );
        v.set(
            Feature::TravelTypeId,
            record.travel_type.map(|t| t.code() as f64).unwrap_or(0.0),
        );
        v.set(Feature::FromAreaId, record.from_area_id.unwrap_or(0) as f64);
        v.set(Feature::ToAreaId, record.to_area_id.unwrap_or(0) as f64);

        let [hour, dow, month] = temporal_features(record.created_at());
        v.set(Feature::BookingHour, hour);
        v.set(Feature::BookingDayOfWeek, dow);
        v.set(Feature::BookingMonth, month);

        v.set(Feature::IsRoundTrip, flag(record.is_round_trip));

        let one_hot = channel_one_hot(record.booking_channel.as_deref());
        for (feature, value) in Feature::CHANNELS.iter().zip(one_hot) {
            v.set(*feature, value);
        }

        let coord = |c: Option<f64>| c.filter(|x| !x.is_nan()).unwrap_or(0.0);
        v.set(Feature::FromLat, coord(record.from_lat));
        v.set(Feature::FromLong, coord(record.from_long));
        v.set(Feature::ToLat, coord(record.to_lat));
        v.set(Feature::ToLong, coord(record.to_long));
        v.set(Feature::FromCityId, record.from_city_id.unwrap_or(0) as f64);

        v
    }

    /// Build a feature table row-aligned with `df`, columns in schema order.
    ///
    /// Raw `booking_created` and `booking_channel` columns take precedence
    /// over pre-derived temporal and channel columns.
    pub fn build_batch(&self, df: &DataFrame) -> Result<DataFrame> {
        let n = df.height();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); FEATURE_COUNT];

        for feature in Feature::ALL {
            if feature.is_temporal() || feature.is_channel() {
                continue;
            }
            columns[feature.index()] =
                numeric_column(df, feature.name())?.unwrap_or_else(|| vec![0.0; n]);
        }

        let temporal = [
            Feature::BookingHour,
            Feature::BookingDayOfWeek,
            Feature::BookingMonth,
        ];
        if let Some(created) = string_column(df, "booking_created")? {
            for f in temporal {
                columns[f.index()] = Vec::with_capacity(n);
            }
            for raw in &created {
                let parts = temporal_features(raw.as_deref().and_then(parse_timestamp));
                for (f, value) in temporal.iter().zip(parts) {
                    columns[f.index()].push(value);
                }
            }
        } else {
            for f in temporal {
                columns[f.index()] = numeric_column(df, f.name())?.unwrap_or_else(|| vec![0.0; n]);
            }
        }

        if let Some(channels) = string_column(df, "booking_channel")? {
            for f in Feature::CHANNELS {
                columns[f.index()] = Vec::with_capacity(n);
            }
            for raw in &channels {
                let one_hot = channel_one_hot(raw.as_deref());
                for (f, value) in Feature::CHANNELS.iter().zip(one_hot) {
                    columns[f.index()].push(value);
                }
            }
        } else if Feature::CHANNELS.iter().any(|f| df.column(f.name()).is_ok()) {
            let mobile = numeric_column(df, Feature::ChannelMobile.name())?;
            let online = numeric_column(df, Feature::ChannelOnline.name())?;
            let other = numeric_column(df, Feature::ChannelOther.name())?;
            for f in Feature::CHANNELS {
                columns[f.index()] = Vec::with_capacity(n);
            }
            for i in 0..n {
                let at = |values: &Option<Vec<f64>>| values.as_ref().map_or(0.0, |v| v[i]);
                let one_hot = reconcile_channels(
                    at(&mobile),
                    at(&online),
                    other.as_ref().map(|v| v[i]),
                );
                for (f, value) in Feature::CHANNELS.iter().zip(one_hot) {
                    columns[f.index()].push(value);
                }
            }
        } else {
            columns[Feature::ChannelMobile.index()] = vec![0.0; n];
            columns[Feature::ChannelOnline.index()] = vec![0.0; n];
            columns[Feature::ChannelOther.index()] = vec![1.0; n];
        }

        let table: Vec<Column> = self
            .schema
            .features()
            .iter()
            .map(|f| Column::new(f.name().into(), std::mem::take(&mut columns[f.index()])))
            .collect();

        let table = DataFrame::new(table)?;
        debug!(
            rows = table.height(),
            features = table.width(),
            "Built feature table"
        );
        Ok(table)
    }
}

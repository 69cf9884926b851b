//! Synthetic booking tables for demos and tests

use crate::error::{CabRiskError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

const CHANNELS: [&str; 4] = ["online", "mobile", "phone", "other"];
const TRAVEL_TYPES: [i64; 3] = [1, 2, 3];
const TRAVEL_WEIGHTS: [f64; 3] = [0.6, 0.3, 0.1];
const CANCELLATION_RATE: f64 = 0.2;

fn year_bounds() -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let end = NaiveDate::from_ymd_opt(2024, 12, 31)?.and_hms_opt(0, 0, 0)?;
    Some((start, end))
}

/// `n` evenly spaced timestamps from 2024-01-01 to 2024-12-31 inclusive
fn spaced_timestamps(n: usize) -> Result<Vec<String>> {
    let (start, end) = year_bounds()
        .ok_or_else(|| CabRiskError::DataError("invalid sample date range".to_string()))?;
    let span = (end - start).num_seconds();
    let steps = n.saturating_sub(1).max(1) as i64;

    Ok((0..n as i64)
        .map(|i| {
            let offset = chrono::Duration::seconds(span * i / steps);
            (start + offset).format("%Y-%m-%d %H:%M:%S").to_string()
        })
        .collect())
}

/// Generate `n` synthetic bookings with a `Car_Cancellation` label.
///
/// The same seed always gives the same table.
pub fn generate_sample_data(n: usize, seed: u64) -> Result<DataFrame> {
    let mut rng = StdRng::seed_from_u64(seed);
    let travel_dist = WeightedIndex::new(TRAVEL_WEIGHTS)
        .map_err(|e| CabRiskError::DataError(e.to_string()))?;

    let mut online = Vec::with_capacity(n);
    let mut mobile = Vec::with_capacity(n);
    let mut vehicle = Vec::with_capacity(n);
    let mut travel = Vec::with_capacity(n);
    let mut from_area = Vec::with_capacity(n);
    let mut to_area = Vec::with_capacity(n);
    let mut from_lat = Vec::with_capacity(n);
    let mut from_long = Vec::with_capacity(n);
    let mut to_lat = Vec::with_capacity(n);
    let mut to_long = Vec::with_capacity(n);
    let mut city = Vec::with_capacity(n);
    let mut channel = Vec::with_capacity(n);
    let mut label = Vec::with_capacity(n);

    for _ in 0..n {
        online.push(rng.gen_bool(0.7) as i64);
        mobile.push(rng.gen_bool(0.6) as i64);
        vehicle.push(rng.gen_range(1..=50i64));
        travel.push(TRAVEL_TYPES[travel_dist.sample(&mut rng)]);
        from_area.push(rng.gen_range(1..=100i64));
        to_area.push(rng.gen_range(1..=100i64));
        from_lat.push(rng.gen_range(12.0..13.5));
        from_long.push(rng.gen_range(77.0..78.5));
        to_lat.push(rng.gen_range(12.0..13.5));
        to_long.push(rng.gen_range(77.0..78.5));
        city.push(rng.gen_range(1..=10i64));
        channel.push(CHANNELS[rng.gen_range(0..CHANNELS.len())]);
        label.push(rng.gen_bool(CANCELLATION_RATE) as i64);
    }

    let df = DataFrame::new(vec![
        Column::new("booking_created".into(), spaced_timestamps(n)?),
        Column::new("online_booking".into(), online),
        Column::new("mobile_site_booking".into(), mobile),
        Column::new("vehicle_model_id".into(), vehicle),
        Column::new("travel_type_id".into(), travel),
        Column::new("from_area_id".into(), from_area),
        Column::new("to_area_id".into(), to_area),
        Column::new("from_lat".into(), from_lat),
        Column::new("from_long".into(), from_long),
        Column::new("to_lat".into(), to_lat),
        Column::new("to_long".into(), to_long),
        Column::new("from_city_id".into(), city),
        Column::new("booking_channel".into(), channel),
        Column::new("Car_Cancellation".into(), label),
    ])?;
    Ok(df)
}

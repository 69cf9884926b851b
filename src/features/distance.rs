//! Great-circle trip distance

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Coordinate columns in (from_lat, from_long, to_lat, to_long) order
pub const COORDINATE_COLUMNS: [&str; 4] = ["from_lat", "from_long", "to_lat", "to_long"];

/// Haversine distance in kilometres between two points given in degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let (delta_phi, delta_lambda) = ((lat2 - lat1).to_radians(), (lon2 - lon1).to_radians());
    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Adds `trip_distance` and `is_long_distance` to booking tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceEnricher {
    /// Trips strictly longer than this are flagged
    pub long_distance_km: f64,
}

impl Default for DistanceEnricher {
    fn default() -> Self {
        Self {
            long_distance_km: 50.0,
        }
    }
}

impl DistanceEnricher {
    pub fn new(long_distance_km: f64) -> Self {
        Self { long_distance_km }
    }

    /// Whether `df` carries all four coordinate columns
    pub fn has_coordinates(df: &DataFrame) -> bool {
        COORDINATE_COLUMNS.iter().all(|c| df.column(c).is_ok())
    }

    pub fn is_long_distance(&self, distance_km: f64) -> bool {
        distance_km > self.long_distance_km
    }

    /// Distance per row; `None` where any coordinate is missing
    pub fn distances(&self, df: &DataFrame) -> Result<Vec<Option<f64>>> {
        let mut coords = Vec::with_capacity(4);
        for name in COORDINATE_COLUMNS {
            let series = df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            coords.push(series.f64()?.clone());
        }

        let (from_lat, from_long, to_lat, to_long) = (&coords[0], &coords[1], &coords[2], &coords[3]);
        let distances = from_lat
            .into_iter()
            .zip(from_long)
            .zip(to_lat)
            .zip(to_long)
            .map(|(((lat1, lon1), lat2), lon2)| {
                let d = haversine_km(lat1?, lon1?, lat2?, lon2?);
                (!d.is_nan()).then_some(d)
            })
            .collect();

        Ok(distances)
    }

    /// Return a copy of `df` with the distance columns appended.
    ///
    /// Tables without all four coordinate columns come back unchanged.
    pub fn enrich(&self, df: &DataFrame) -> Result<DataFrame> {
        if !Self::has_coordinates(df) {
            return Ok(df.clone());
        }

        let distances = self.distances(df)?;
        let long: Vec<i32> = distances
            .iter()
            .map(|d| d.map_or(0, |d| self.is_long_distance(d) as i32))
            .collect();

        let mut result = df.clone();
        result.with_column(Column::new("trip_distance".into(), distances))?;
        result.with_column(Column::new("is_long_distance".into(), long))?;
        Ok(result)
    }
}

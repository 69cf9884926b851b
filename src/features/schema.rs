//! Trained feature schema
//!
//! The classifier was trained on 18 features in a fixed order. That order is
//! defined exactly once, here, as [`Feature::ALL`]. A metadata sidecar may
//! supply its own ordering, which is parsed into a [`FeatureSchema`] and
//! checked against the known names.

use crate::error::{CabRiskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of features the classifier consumes
pub const FEATURE_COUNT: usize = 18;

/// A single named model input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    OnlineBooking,
    MobileSiteBooking,
    VehicleModelId,
    TravelTypeId,
    FromAreaId,
    ToAreaId,
    BookingHour,
    BookingDayOfWeek,
    BookingMonth,
    IsRoundTrip,
    ChannelMobile,
    ChannelOnline,
    ChannelOther,
    FromLat,
    FromLong,
    ToLat,
    ToLong,
    FromCityId,
}

impl Feature {
    /// All features in trained order
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::OnlineBooking,
        Feature::MobileSiteBooking,
        Feature::VehicleModelId,
        Feature::TravelTypeId,
        Feature::FromAreaId,
        Feature::ToAreaId,
        Feature::BookingHour,
        Feature::BookingDayOfWeek,
        Feature::BookingMonth,
        Feature::IsRoundTrip,
        Feature::ChannelMobile,
        Feature::ChannelOnline,
        Feature::ChannelOther,
        Feature::FromLat,
        Feature::FromLong,
        Feature::ToLat,
        Feature::ToLong,
        Feature::FromCityId,
    ];

    /// The three channel one-hot slots
    pub const CHANNELS: [Feature; 3] = [
        Feature::ChannelMobile,
        Feature::ChannelOnline,
        Feature::ChannelOther,
    ];

    /// Column name used in tables and artifacts
    pub fn name(self) -> &'static str {
        match self {
            Feature::OnlineBooking => "online_booking",
            Feature::MobileSiteBooking => "mobile_site_booking",
            Feature::VehicleModelId => "vehicle_model_id",
            Feature::TravelTypeId => "travel_type_id",
            Feature::FromAreaId => "from_area_id",
            Feature::ToAreaId => "to_area_id",
            Feature::BookingHour => "booking_hour",
            Feature::BookingDayOfWeek => "booking_day_of_week",
            Feature::BookingMonth => "booking_month",
            Feature::IsRoundTrip => "is_round_trip",
            Feature::ChannelMobile => "channel_mobile",
            Feature::ChannelOnline => "channel_online",
            Feature::ChannelOther => "channel_other",
            Feature::FromLat => "from_lat",
            Feature::FromLong => "from_long",
            Feature::ToLat => "to_lat",
            Feature::ToLong => "to_long",
            Feature::FromCityId => "from_city_id",
        }
    }

    /// Position of this feature in [`Feature::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Temporal slots derived from the creation timestamp
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            Feature::BookingHour | Feature::BookingDayOfWeek | Feature::BookingMonth
        )
    }

    /// Channel one-hot slots derived from the booking channel
    pub fn is_channel(self) -> bool {
        Self::CHANNELS.contains(&self)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = CabRiskError;

    fn from_str(s: &str) -> Result<Self> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| CabRiskError::FeatureNotFound(s.to_string()))
    }
}

/// Ordered list of features the loaded classifier expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<Feature>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            features: Feature::ALL.to_vec(),
        }
    }
}

impl FeatureSchema {
    /// Build a schema from trained feature names, e.g. from a metadata sidecar.
    ///
    /// Every name must be known and appear once.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut features = Vec::with_capacity(names.len());
        for name in names {
            let feature: Feature = name.as_ref().parse().map_err(|_| {
                CabRiskError::ConfigError(format!(
                    "unknown feature '{}' in trained feature list",
                    name.as_ref()
                ))
            })?;
            if features.contains(&feature) {
                return Err(CabRiskError::ConfigError(format!(
                    "feature '{}' listed twice in trained feature list",
                    feature
                )));
            }
            features.push(feature);
        }

        if features.is_empty() {
            return Err(CabRiskError::ConfigError(
                "trained feature list is empty".to_string(),
            ));
        }

        Ok(Self { features })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_index_ordered() {
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), i);
        }
    }

    #[test]
    fn test_name_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(feature.name().parse::<Feature>().unwrap(), feature);
        }
        assert!("trip_distance".parse::<Feature>().is_err());
    }

    #[test]
    fn test_schema_from_names() {
        let schema = FeatureSchema::from_names(&["booking_hour", "channel_online"]).unwrap();
        assert_eq!(schema.features(), &[Feature::BookingHour, Feature::ChannelOnline]);
    }

    #[test]
    fn test_schema_rejects_unknown_and_duplicates() {
        assert!(matches!(
            FeatureSchema::from_names(&["is_weekend"]),
            Err(CabRiskError::ConfigError(_))
        ));
        assert!(FeatureSchema::from_names(&["from_lat", "from_lat"]).is_err());
        assert!(FeatureSchema::from_names::<&str>(&[]).is_err());
    }

    #[test]
    fn test_serialize_snake_case() {
        let json = serde_json::to_string(&Feature::BookingDayOfWeek).unwrap();
        assert_eq!(json, "\"booking_day_of_week\"");
    }
}

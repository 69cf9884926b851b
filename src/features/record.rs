//! Raw booking record
//!
//! Every field is optional. Missing values are resolved to defaults by the
//! [`FeatureVectorBuilder`](super::FeatureVectorBuilder), never here.

use crate::error::CabRiskError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

use super::builder::parse_timestamp;

/// Purpose of the trip as coded in the booking system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TravelType {
    Business = 1,
    Leisure = 2,
    Other = 3,
}

impl TravelType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TravelType {
    type Error = CabRiskError;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(TravelType::Business),
            2 => Ok(TravelType::Leisure),
            3 => Ok(TravelType::Other),
            other => Err(CabRiskError::InvalidInput(format!(
                "travel_type_id must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<TravelType> for u8 {
    fn from(t: TravelType) -> u8 {
        t.code()
    }
}

impl fmt::Display for TravelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TravelType::Business => "Business",
            TravelType::Leisure => "Leisure",
            TravelType::Other => "Other",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// One booking as submitted by a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingRecord {
    /// Creation timestamp as raw text
    pub booking_created: Option<String>,
    #[serde(deserialize_with = "flag_from_bool_or_int")]
    pub online_booking: Option<bool>,
    #[serde(deserialize_with = "flag_from_bool_or_int")]
    pub mobile_site_booking: Option<bool>,
    /// Free-text channel, e.g. "online" or "mobile"
    pub booking_channel: Option<String>,
    pub vehicle_model_id: Option<i64>,
    #[serde(rename = "travel_type_id")]
    pub travel_type: Option<TravelType>,
    pub from_area_id: Option<i64>,
    pub to_area_id: Option<i64>,
    pub from_lat: Option<f64>,
    pub from_long: Option<f64>,
    pub to_lat: Option<f64>,
    pub to_long: Option<f64>,
    pub from_city_id: Option<i64>,
    #[serde(deserialize_with = "flag_from_bool_or_int")]
    pub is_round_trip: Option<bool>,
}

/// Booking exports encode flags either as booleans or as 0/1.
fn flag_from_bool_or_int<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Float(f64),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(b)) => Ok(Some(b)),
        Some(Flag::Int(0)) => Ok(Some(false)),
        Some(Flag::Int(1)) => Ok(Some(true)),
        Some(Flag::Float(v)) if v == 0.0 => Ok(Some(false)),
        Some(Flag::Float(v)) if v == 1.0 => Ok(Some(true)),
        Some(Flag::Int(v)) => Err(de::Error::custom(format!(
            "expected true/false or 0/1, got {}",
            v
        ))),
        Some(Flag::Float(v)) => Err(de::Error::custom(format!(
            "expected true/false or 0/1, got {}",
            v
        ))),
    }
}

/// Preset booking patterns for demos and smoke tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskProfile {
    LowRisk,
    MediumRisk,
    HighRisk,
    /// Random values inside the training ranges
    Random,
}

impl std::str::FromStr for RiskProfile {
    type Err = CabRiskError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "low" | "low_risk" => Ok(RiskProfile::LowRisk),
            "medium" | "medium_risk" => Ok(RiskProfile::MediumRisk),
            "high" | "high_risk" => Ok(RiskProfile::HighRisk),
            "random" => Ok(RiskProfile::Random),
            other => Err(CabRiskError::InvalidInput(format!(
                "unknown risk profile '{}'",
                other
            ))),
        }
    }
}

impl BookingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_booking_created(mut self, ts: impl Into<String>) -> Self {
        self.booking_created = Some(ts.into());
        self
    }

    pub fn with_created_at(mut self, ts: NaiveDateTime) -> Self {
        self.booking_created = Some(ts.format("%Y-%m-%d %H:%M:%S").to_string());
        self
    }

    pub fn with_online_booking(mut self, online: bool) -> Self {
        self.online_booking = Some(online);
        self
    }

    pub fn with_mobile_site_booking(mut self, mobile: bool) -> Self {
        self.mobile_site_booking = Some(mobile);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.booking_channel = Some(channel.into());
        self
    }

    pub fn with_vehicle_model_id(mut self, id: i64) -> Self {
        self.vehicle_model_id = Some(id);
        self
    }

    pub fn with_travel_type(mut self, travel_type: TravelType) -> Self {
        self.travel_type = Some(travel_type);
        self
    }

    pub fn with_areas(mut self, from_area_id: i64, to_area_id: i64) -> Self {
        self.from_area_id = Some(from_area_id);
        self.to_area_id = Some(to_area_id);
        self
    }

    pub fn with_origin(mut self, lat: f64, long: f64) -> Self {
        self.from_lat = Some(lat);
        self.from_long = Some(long);
        self
    }

    pub fn with_destination(mut self, lat: f64, long: f64) -> Self {
        self.to_lat = Some(lat);
        self.to_long = Some(long);
        self
    }

    pub fn with_from_city_id(mut self, id: i64) -> Self {
        self.from_city_id = Some(id);
        self
    }

    pub fn with_round_trip(mut self, round_trip: bool) -> Self {
        self.is_round_trip = Some(round_trip);
        self
    }

    /// Parsed creation time, if present and in a recognised format
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.booking_created.as_deref().and_then(parse_timestamp)
    }

    /// Pickup and drop coordinates when all four are known
    pub fn coordinates(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.from_lat?, self.from_long?, self.to_lat?, self.to_long?))
    }

    /// Preset record for `profile`, dated today
    pub fn sample(profile: RiskProfile) -> Self {
        let today = Utc::now().date_naive();
        Self::sample_on(profile, today, &mut rand::thread_rng())
    }

    /// Preset record for `profile` on a fixed date
    pub fn sample_on<R: Rng>(profile: RiskProfile, date: NaiveDate, rng: &mut R) -> Self {
        let at = |hour: u32, minute: u32| {
            date.and_hms_opt(hour, minute, 0)
                .unwrap_or_else(|| date.and_time(NaiveTime::default()))
        };

        match profile {
            RiskProfile::LowRisk => Self::new()
                .with_created_at(at(14, 30))
                .with_online_booking(true)
                .with_mobile_site_booking(true)
                .with_channel("online")
                .with_round_trip(true)
                .with_vehicle_model_id(90)
                .with_travel_type(TravelType::Business)
                .with_areas(100, 150)
                .with_origin(12.97, 77.59)
                .with_destination(13.05, 77.63)
                .with_from_city_id(5),
            RiskProfile::MediumRisk => Self::new()
                .with_created_at(at(21, 0))
                .with_online_booking(true)
                .with_mobile_site_booking(false)
                .with_channel("online")
                .with_round_trip(false)
                .with_vehicle_model_id(2)
                .with_travel_type(TravelType::Leisure)
                .with_areas(804, 177)
                .with_origin(12.890, 77.601)
                .with_destination(12.934, 77.611)
                .with_from_city_id(1),
            RiskProfile::HighRisk => Self::new()
                .with_created_at(at(23, 45))
                .with_online_booking(true)
                .with_mobile_site_booking(false)
                .with_channel("online")
                .with_round_trip(false)
                .with_vehicle_model_id(89)
                .with_travel_type(TravelType::Leisure)
                .with_areas(1347, 1192)
                .with_origin(12.987, 77.736)
                .with_destination(12.977, 77.573)
                .with_from_city_id(1),
            RiskProfile::Random => {
                let channels = ["online", "mobile", "phone", "other"];
                let travel = [TravelType::Business, TravelType::Leisure, TravelType::Other];
                let round4 = |v: f64| (v * 10_000.0).round() / 10_000.0;

                Self::new()
                    .with_created_at(at(rng.gen_range(6..=23), rng.gen_range(0..=59)))
                    .with_online_booking(rng.gen_bool(0.5))
                    .with_mobile_site_booking(rng.gen_bool(0.5))
                    .with_channel(channels[rng.gen_range(0..channels.len())])
                    .with_round_trip(rng.gen_bool(0.5))
                    .with_vehicle_model_id(rng.gen_range(1..=91))
                    .with_travel_type(travel[rng.gen_range(0..travel.len())])
                    .with_areas(rng.gen_range(50..=1000), rng.gen_range(100..=1200))
                    .with_origin(
                        round4(rng.gen_range(12.80..=13.20)),
                        round4(rng.gen_range(77.50..=77.75)),
                    )
                    .with_destination(
                        round4(rng.gen_range(12.80..=13.20)),
                        round4(rng.gen_range(77.50..=77.75)),
                    )
                    .with_from_city_id(rng.gen_range(1..=15))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_travel_type_codes() {
        assert_eq!(TravelType::try_from(2).unwrap(), TravelType::Leisure);
        assert!(TravelType::try_from(0).is_err());
        assert!(TravelType::try_from(4).is_err());
    }

    #[test]
    fn test_deserialize_partial_record() {
        let record: BookingRecord = serde_json::from_str(
            r#"{"vehicle_model_id": 12, "travel_type_id": 1, "booking_channel": "mobile"}"#,
        )
        .unwrap();
        assert_eq!(record.vehicle_model_id, Some(12));
        assert_eq!(record.travel_type, Some(TravelType::Business));
        assert!(record.from_lat.is_none());
    }

    #[test]
    fn test_deserialize_rejects_bad_travel_type() {
        let result: std::result::Result<BookingRecord, _> =
            serde_json::from_str(r#"{"travel_type_id": 7}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_integer_flags() {
        let record: BookingRecord = serde_json::from_str(
            r#"{"online_booking": 1, "mobile_site_booking": 0, "travel_type_id": 2, "is_round_trip": 1}"#,
        )
        .unwrap();
        assert_eq!(record.online_booking, Some(true));
        assert_eq!(record.mobile_site_booking, Some(false));
        assert_eq!(record.is_round_trip, Some(true));
        assert_eq!(record.travel_type, Some(TravelType::Leisure));

        let record: BookingRecord =
            serde_json::from_str(r#"{"online_booking": false, "is_round_trip": 1.0, "mobile_site_booking": null}"#)
                .unwrap();
        assert_eq!(record.online_booking, Some(false));
        assert_eq!(record.is_round_trip, Some(true));
        assert_eq!(record.mobile_site_booking, None);

        let bad = serde_json::from_str::<BookingRecord>(r#"{"online_booking": 2}"#);
        assert!(bad.unwrap_err().to_string().contains("0/1"));
    }

    #[test]
    fn test_high_risk_preset() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let record = BookingRecord::sample_on(RiskProfile::HighRisk, date, &mut rng);

        let created = record.created_at().unwrap();
        assert_eq!((created.hour(), created.minute()), (23, 45));
        assert_eq!(record.vehicle_model_id, Some(89));
        assert_eq!(record.travel_type, Some(TravelType::Leisure));
        assert_eq!(record.from_area_id, Some(1347));
    }

    #[test]
    fn test_random_preset_within_ranges() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let record = BookingRecord::sample_on(RiskProfile::Random, date, &mut rng);
            let vehicle = record.vehicle_model_id.unwrap();
            assert!((1..=91).contains(&vehicle));
            let (from_lat, from_long, _, _) = record.coordinates().unwrap();
            assert!((12.80..=13.20).contains(&from_lat));
            assert!((77.50..=77.75).contains(&from_long));
        }
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("high".parse::<RiskProfile>().unwrap(), RiskProfile::HighRisk);
        assert_eq!("low-risk".parse::<RiskProfile>().unwrap(), RiskProfile::LowRisk);
        assert!("extreme".parse::<RiskProfile>().is_err());
    }
}

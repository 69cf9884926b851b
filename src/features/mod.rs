//! Booking features
//!
//! Everything between a raw booking and the numbers the classifier reads:
//! - [`FeatureSchema`]: the trained feature order
//! - [`BookingRecord`]: one raw booking with optional fields
//! - [`FeatureVectorBuilder`]: single and batch feature construction
//! - [`DistanceEnricher`]: haversine trip distance
//! - [`validate_booking`] and [`TrainingRanges`]: input checks

mod builder;
mod distance;
mod record;
mod schema;
mod validation;

pub use builder::{channel_one_hot, parse_timestamp, temporal_features, FeatureVector, FeatureVectorBuilder};
pub(crate) use builder::{numeric_column, string_column};
pub use distance::{haversine_km, DistanceEnricher, COORDINATE_COLUMNS, EARTH_RADIUS_KM};
pub use record::{BookingRecord, RiskProfile, TravelType};
pub use schema::{Feature, FeatureSchema, FEATURE_COUNT};
pub use validation::{validate_booking, TrainingRanges, ValueRangeWarning};

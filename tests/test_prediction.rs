//! Integration test: single-booking scoring end-to-end

use cab_risk::features::{
    haversine_km, validate_booking, BookingRecord, Feature, FeatureVectorBuilder, RiskProfile,
    TravelType,
};
use cab_risk::inference::{
    Confidence, LogisticModel, ModelMetadata, ModelStats, PredictionService, PredictorConfig,
    RiskCategorizer, RiskCategory, RiskClassifier,
};
use cab_risk::CabRiskError;
use ndarray::{Array1, Array2};
use std::sync::Arc;

struct StubClassifier(f64);

impl RiskClassifier for StubClassifier {
    fn predict_proba(&self, x: &Array2<f64>) -> cab_risk::Result<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), self.0))
    }
}

struct FailingClassifier;

impl RiskClassifier for FailingClassifier {
    fn predict_proba(&self, _x: &Array2<f64>) -> cab_risk::Result<Array1<f64>> {
        Err(CabRiskError::InvalidInput("backend crashed".to_string()))
    }
}

fn stub_service(p: f64) -> PredictionService {
    PredictionService::new(Arc::new(StubClassifier(p)), Default::default()).unwrap()
}

fn late_night_leisure_booking() -> BookingRecord {
    BookingRecord::new()
        .with_booking_created("2024-03-15 23:45:00")
        .with_online_booking(true)
        .with_channel("online")
        .with_vehicle_model_id(89)
        .with_travel_type(TravelType::Leisure)
        .with_areas(1347, 1192)
        .with_origin(12.987, 77.736)
        .with_destination(12.977, 77.573)
        .with_from_city_id(1)
}

#[test]
fn test_tier_boundaries() {
    let categorizer = RiskCategorizer::new();
    let cases = [
        (0.0, RiskCategory::VeryLow),
        (0.0499, RiskCategory::VeryLow),
        (0.05, RiskCategory::Low),
        (0.1499, RiskCategory::Low),
        (0.15, RiskCategory::Medium),
        (0.30, RiskCategory::High),
        (0.4999, RiskCategory::High),
        (0.50, RiskCategory::Critical),
        (1.0, RiskCategory::Critical),
    ];
    for (p, expected) in cases {
        assert_eq!(categorizer.category(p).unwrap(), expected, "p = {}", p);
    }

    assert!(categorizer.category(-0.01).is_err());
    assert!(categorizer.category(1.01).is_err());
    assert!(categorizer.category(f64::NAN).is_err());
}

#[test]
fn test_confidence_bands() {
    let categorizer = RiskCategorizer::new();
    assert_eq!(categorizer.confidence(0.05).unwrap(), Confidence::High);
    assert_eq!(categorizer.confidence(0.10).unwrap(), Confidence::Medium);
    assert_eq!(categorizer.confidence(0.90).unwrap(), Confidence::Medium);
    assert_eq!(categorizer.confidence(0.95).unwrap(), Confidence::High);
}

#[test]
fn test_decision_threshold() {
    let record = BookingRecord::sample(RiskProfile::MediumRisk);
    assert!(!stub_service(0.109).predict_one(&record).unwrap().high_risk);
    assert!(stub_service(0.1091).predict_one(&record).unwrap().high_risk);
}

#[test]
fn test_default_record_features() {
    let vector = FeatureVectorBuilder::default().build(&BookingRecord::default());

    let channel_sum: f64 = Feature::CHANNELS.iter().map(|f| vector.get(*f)).sum();
    assert_eq!(channel_sum, 1.0);
    assert_eq!(vector.get(Feature::ChannelOther), 1.0);

    for (feature, value) in vector.iter() {
        if !feature.is_channel() {
            assert_eq!(value, 0.0, "{} should default to 0", feature);
        }
    }
}

#[test]
fn test_late_night_leisure_scenario() {
    let record = late_night_leisure_booking();

    let vector = FeatureVectorBuilder::default().build(&record);
    assert_eq!(vector.get(Feature::BookingHour), 23.0);
    assert_eq!(vector.get(Feature::BookingDayOfWeek), 4.0);
    assert_eq!(vector.get(Feature::BookingMonth), 3.0);
    assert_eq!(vector.get(Feature::TravelTypeId), 2.0);
    assert_eq!(vector.get(Feature::ChannelOnline), 1.0);

    let result = stub_service(0.42).predict_one(&record).unwrap();
    assert_eq!(result.risk_category, RiskCategory::High);
    assert!(result.high_risk);
    assert_eq!(result.confidence, Confidence::Medium);
    assert_eq!(result.recommendation, RiskCategory::High.recommendation());
}

#[test]
fn test_haversine_fixtures() {
    assert_eq!(haversine_km(12.97, 77.59, 12.97, 77.59), 0.0);
    let one_km = haversine_km(12.970, 77.590, 12.979, 77.590);
    assert!((one_km - 1.0007543).abs() < 1e-6, "got {}", one_km);
}

#[test]
fn test_extrapolation_warnings_do_not_block() {
    let record = late_night_leisure_booking().with_vehicle_model_id(120);
    let result = stub_service(0.2).predict_one(&record).unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].field, "vehicle_model_id");
    assert_eq!(result.risk_category, RiskCategory::Medium);
}

#[test]
fn test_classifier_failure_is_inference_error() {
    let service = PredictionService::new(Arc::new(FailingClassifier), Default::default()).unwrap();
    assert!(matches!(
        service.predict_one(&BookingRecord::default()),
        Err(CabRiskError::InferenceError(_))
    ));
}

#[test]
fn test_validation_collects_all_problems() {
    let record = BookingRecord::new()
        .with_vehicle_model_id(-1)
        .with_origin(95.0, 77.0);
    let err = validate_booking(&record).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("travel_type_id"));
    assert!(message.contains("from_area_id"));
    assert!(message.contains("vehicle_model_id"));
    assert!(message.contains("from_lat"));

    assert!(validate_booking(&late_night_leisure_booking()).is_ok());
}

#[test]
fn test_travel_type_code_is_checked_on_deserialize() {
    let ok: BookingRecord = serde_json::from_str(r#"{"travel_type_id": 1}"#).unwrap();
    assert_eq!(ok.travel_type, Some(TravelType::Business));

    let bad = serde_json::from_str::<BookingRecord>(r#"{"travel_type_id": 4}"#);
    assert!(bad.is_err());
}

#[test]
fn test_load_from_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("best_model.json");
    let metadata_path = dir.path().join("model_info.json");

    let names: Vec<String> = Feature::ALL.iter().map(|f| f.name().to_string()).collect();
    let mut coefficients = vec![0.0; names.len()];
    coefficients[Feature::BookingHour.index()] = 0.1;
    LogisticModel::new(coefficients, -2.0)
        .with_feature_names(names)
        .save(&model_path)
        .unwrap();

    let config = PredictorConfig::new()
        .with_model_path(&model_path)
        .with_metadata_path(&metadata_path);

    // No sidecar: ready, stats unavailable
    let service = PredictionService::load(&config).unwrap();
    let info = service.model_info().unwrap();
    assert_eq!(info.model_type, "logistic_regression");
    assert_eq!(info.feature_count, 18);
    assert_eq!(info.stats, ModelStats::Unavailable);

    let result = service.predict_one(&late_night_leisure_booking()).unwrap();
    let expected = 1.0 / (1.0 + (-(23.0 * 0.1 - 2.0f64)).exp());
    assert!((result.probability - expected).abs() < 1e-12);

    // With sidecar: real stats
    std::fs::write(
        &metadata_path,
        r#"{"model_type": "XGBoost", "model_version": "1.2", "test_auc": 0.74}"#,
    )
    .unwrap();
    let service = PredictionService::load(&config).unwrap();
    let info = service.model_info().unwrap();
    assert_eq!(info.model_type, "XGBoost");
    assert_eq!(info.version, "1.2");
    match &info.stats {
        ModelStats::Available(stats) => assert_eq!(stats.test_auc, Some(0.74)),
        ModelStats::Unavailable => panic!("expected stats"),
    }

    // Corrupt sidecar: configuration error
    std::fs::write(&metadata_path, "{ not json").unwrap();
    assert!(matches!(
        PredictionService::load(&config),
        Err(CabRiskError::ConfigError(_))
    ));
    assert!(ModelMetadata::load(&metadata_path).is_err());
}

#[test]
fn test_missing_model_leaves_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let config = PredictorConfig::new().with_model_path(dir.path().join("missing.json"));

    assert!(matches!(
        PredictionService::load(&config),
        Err(CabRiskError::ConfigError(_))
    ));

    let service = PredictionService::load_or_unavailable(&config);
    assert!(!service.is_ready());
    assert!(matches!(
        service.predict_one(&BookingRecord::default()),
        Err(CabRiskError::ModelUnavailable(_))
    ));
}

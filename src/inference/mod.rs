//! Cancellation risk inference
//!
//! Provides:
//! - The [`RiskClassifier`] seam and a JSON logistic model artifact
//! - Probability to risk tier mapping with recommendations
//! - Single and batch scoring (sequential or parallel via rayon)
//! - Cancellable and streaming batch runs
//! - Model metadata and training statistics for display

mod classifier;
mod config;
mod risk;
mod service;

pub use classifier::{
    LogisticModel, ModelInfo, ModelMetadata, ModelStats, RiskClassifier, TrainingStats,
};
pub use config::{PredictorConfig, DECISION_THRESHOLD};
pub use risk::{Confidence, RiskCategorizer, RiskCategory};
pub use service::{
    BatchSummary, PredictionResult, PredictionService, CATEGORY_COLUMN, PREDICTION_COLUMN,
    PROBABILITY_COLUMN,
};

//! Cab Risk - booking cancellation risk engine
//!
//! This crate provides:
//! - Feature preparation for single bookings and booking tables
//! - Scoring with a pluggable pre-trained classifier
//! - Risk tiers, recommendations and batch summaries
//! - Offline cleaning and quality scoring of booking data
//! - A command-line front end
//!
//! # Modules
//!
//! - [`features`] - Feature schema, booking records, feature building, validation
//! - [`inference`] - Classifier seam, risk categorisation, prediction service
//! - [`preprocessing`] - Imputation, outlier clipping, dtype optimisation, quality
//! - [`utils`] - CSV IO and synthetic data
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core modules
pub mod features;
pub mod inference;
pub mod preprocessing;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{CabRiskError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{CabRiskError, Result};

    // Features
    pub use crate::features::{
        BookingRecord, DistanceEnricher, Feature, FeatureSchema, FeatureVector,
        FeatureVectorBuilder, RiskProfile, TrainingRanges, TravelType, ValueRangeWarning,
    };

    // Inference
    pub use crate::inference::{
        BatchSummary, LogisticModel, ModelInfo, PredictionResult, PredictionService,
        PredictorConfig, RiskCategorizer, RiskCategory, RiskClassifier, DECISION_THRESHOLD,
    };

    // Preprocessing
    pub use crate::preprocessing::{
        CleaningConfig, CleaningReport, DataQualityProcessor, DataQualityReport,
    };

    // Utilities
    pub use crate::utils::{generate_sample_data, load_csv, save_csv};
}

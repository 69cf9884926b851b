//! Classifier artifacts
//!
//! The pipeline treats the classifier as an opaque probability producer
//! behind [`RiskClassifier`]. A JSON logistic model is the default loadable
//! artifact; anything else can be plugged in through the trait.

use crate::error::{CabRiskError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// A trained model that scores feature rows
pub trait RiskClassifier: Send + Sync {
    /// Cancellation probability per row of `x`
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Feature names in the order the model consumes them, if it records them
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Number of input columns, if fixed
    fn n_features(&self) -> Option<usize> {
        None
    }

    fn model_type(&self) -> &str {
        "custom"
    }
}

/// Logistic regression stored as plain JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            feature_names: Vec::new(),
            coefficients,
            intercept,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    /// Read and validate a model artifact. Any failure is a configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CabRiskError::ConfigError(format!(
                "model artifact not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CabRiskError::ConfigError(format!("cannot read model {}: {}", path.display(), e))
        })?;
        let model: Self = serde_json::from_str(&content).map_err(|e| {
            CabRiskError::ConfigError(format!("corrupt model {}: {}", path.display(), e))
        })?;
        model.validate()?;

        info!(
            "Loaded logistic model from {} ({} features)",
            path.display(),
            model.coefficients.len()
        );
        Ok(model)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            return Err(CabRiskError::ConfigError(
                "model has no coefficients".to_string(),
            ));
        }
        if !self.feature_names.is_empty() && self.feature_names.len() != self.coefficients.len() {
            return Err(CabRiskError::ConfigError(format!(
                "model lists {} feature names but {} coefficients",
                self.feature_names.len(),
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(CabRiskError::ConfigError(
                "model parameters must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }
}

impl RiskClassifier for LogisticModel {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(CabRiskError::ShapeError {
                expected: format!("{} feature columns", self.coefficients.len()),
                actual: format!("{} feature columns", x.ncols()),
            });
        }

        let weights = Array1::from(self.coefficients.clone());
        let linear = x.dot(&weights) + self.intercept;
        Ok(linear.mapv(Self::sigmoid))
    }

    fn feature_names(&self) -> Option<&[String]> {
        (!self.feature_names.is_empty()).then_some(self.feature_names.as_slice())
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn model_type(&self) -> &str {
        "logistic_regression"
    }
}

/// Training metadata written alongside the model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    pub model_type: Option<String>,
    pub model_version: Option<String>,
    pub training_date: Option<String>,
    pub test_auc: Option<f64>,
    pub cv_auc: Option<f64>,
    pub accuracy: Option<f64>,
    pub configuration: Option<serde_json::Value>,
    /// Trained input order; overrides the built-in order when present
    pub features: Option<Vec<String>>,
}

impl ModelMetadata {
    /// `Ok(None)` when the sidecar does not exist; a configuration error when
    /// it exists but cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Metadata file {} not found, using built-in feature order",
                path.display()
            );
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CabRiskError::ConfigError(format!("cannot read metadata {}: {}", path.display(), e))
        })?;
        let metadata = serde_json::from_str(&content).map_err(|e| {
            CabRiskError::ConfigError(format!("corrupt metadata {}: {}", path.display(), e))
        })?;
        Ok(Some(metadata))
    }
}

/// Statistics recorded when the model was trained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub training_date: Option<String>,
    pub test_auc: Option<f64>,
    pub cv_auc: Option<f64>,
    pub accuracy: Option<f64>,
    pub configuration: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelStats {
    Available(TrainingStats),
    Unavailable,
}

/// Description of the loaded model for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub version: String,
    pub feature_count: usize,
    pub features: Vec<String>,
    pub stats: ModelStats,
}

impl ModelInfo {
    pub fn new(
        classifier: &dyn RiskClassifier,
        features: Vec<String>,
        metadata: Option<&ModelMetadata>,
    ) -> Self {
        let model_type = metadata
            .and_then(|m| m.model_type.clone())
            .unwrap_or_else(|| classifier.model_type().to_string());
        let version = metadata
            .and_then(|m| m.model_version.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let stats = match metadata {
            Some(m) => ModelStats::Available(TrainingStats {
                training_date: m.training_date.clone(),
                test_auc: m.test_auc,
                cv_auc: m.cv_auc,
                accuracy: m.accuracy,
                configuration: m.configuration.clone(),
            }),
            None => ModelStats::Unavailable,
        };

        Self {
            model_type,
            version,
            feature_count: features.len(),
            features,
            stats,
        }
    }
}

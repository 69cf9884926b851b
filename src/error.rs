//! Error types for the cab-risk pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CabRiskError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum CabRiskError {
    /// Classifier or metadata artifact is missing or corrupt. Fatal.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A prediction was requested but the classifier never loaded.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Input shape error: {0}")]
    InputShape(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Batch cancelled after {completed_rows} rows")]
    Cancelled { completed_rows: usize },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for CabRiskError {
    fn from(err: polars::error::PolarsError) -> Self {
        CabRiskError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CabRiskError {
    fn from(err: serde_json::Error) -> Self {
        CabRiskError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CabRiskError {
    fn from(err: ndarray::ShapeError) -> Self {
        CabRiskError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CabRiskError::ModelUnavailable("best_model.json not found".to_string());
        assert_eq!(err.to_string(), "Model unavailable: best_model.json not found");
    }

    #[test]
    fn test_cancelled_display() {
        let err = CabRiskError::Cancelled { completed_rows: 5000 };
        assert_eq!(err.to_string(), "Batch cancelled after 5000 rows");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CabRiskError = io_err.into();
        assert!(matches!(err, CabRiskError::IoError(_)));
    }
}

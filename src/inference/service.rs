//! Prediction service
//!
//! Orchestrates feature building, classifier invocation and risk
//! categorisation for single bookings and for tables:
//! - single records produce a [`PredictionResult`]
//! - tables get three result columns appended, row-aligned with the input
//! - large tables are split into partitions that may run on a rayon pool
//!   and can be cancelled between partitions

use crate::error::{CabRiskError, Result};
use crate::features::{
    BookingRecord, FeatureSchema, FeatureVectorBuilder, ValueRangeWarning,
};
use super::classifier::{LogisticModel, ModelInfo, ModelMetadata, RiskClassifier};
use super::config::{PredictorConfig, DECISION_THRESHOLD};
use super::risk::{Confidence, RiskCategorizer, RiskCategory};
use ndarray::Array2;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Output column holding the cancellation probability
pub const PROBABILITY_COLUMN: &str = "cancellation_probability";
/// Output column holding the 0/1 decision
pub const PREDICTION_COLUMN: &str = "high_risk_prediction";
/// Output column holding the risk tier label
pub const CATEGORY_COLUMN: &str = "risk_category";

/// Outcome of scoring one booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub probability: f64,
    /// `probability > 0.109`
    pub high_risk: bool,
    pub risk_category: RiskCategory,
    pub confidence: Confidence,
    pub recommendation: String,
    /// Inputs outside the training ranges
    pub warnings: Vec<ValueRangeWarning>,
}

/// Aggregate view of a scored table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    /// Rows flagged by the decision threshold
    pub predicted_cancellations: usize,
    /// Rows with probability >= 0.30
    pub high_risk: usize,
    /// Rows with probability >= 0.50
    pub critical: usize,
    pub mean_probability: f64,
    /// Row count per tier, lowest tier first
    pub category_counts: Vec<(RiskCategory, usize)>,
}

enum ModelState {
    Ready {
        classifier: Arc<dyn RiskClassifier>,
        info: ModelInfo,
    },
    Unavailable(String),
}

/// Scores bookings with a loaded classifier
pub struct PredictionService {
    state: ModelState,
    builder: FeatureVectorBuilder,
    categorizer: RiskCategorizer,
    config: PredictorConfig,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("ready", &self.is_ready())
            .field("schema", self.builder.schema())
            .field("config", &self.config)
            .finish()
    }
}

/// Pick the input order: metadata first, then names recorded in the model,
/// then the built-in order. The classifier must agree with the result.
fn resolve_schema(
    classifier: &dyn RiskClassifier,
    metadata: Option<&ModelMetadata>,
) -> Result<FeatureSchema> {
    let schema = if let Some(names) = metadata.and_then(|m| m.features.as_ref()) {
        FeatureSchema::from_names(names)?
    } else if let Some(names) = classifier.feature_names() {
        FeatureSchema::from_names(names)?
    } else {
        FeatureSchema::default()
    };

    check_classifier_fits(classifier, &schema)?;
    Ok(schema)
}

/// The classifier's recorded names and input width must agree with `schema`.
fn check_classifier_fits(classifier: &dyn RiskClassifier, schema: &FeatureSchema) -> Result<()> {
    if let Some(model_names) = classifier.feature_names() {
        if model_names.iter().map(String::as_str).ne(schema.names()) {
            return Err(CabRiskError::ConfigError(
                "model feature names do not match the trained feature list".to_string(),
            ));
        }
    }

    if let Some(n) = classifier.n_features() {
        if n != schema.len() {
            return Err(CabRiskError::ConfigError(format!(
                "model expects {} features but the feature list has {}",
                n,
                schema.len()
            )));
        }
    }

    Ok(())
}

impl PredictionService {
    /// Wrap an in-memory classifier. Training statistics are unavailable.
    pub fn new(classifier: Arc<dyn RiskClassifier>, schema: FeatureSchema) -> Result<Self> {
        check_classifier_fits(classifier.as_ref(), &schema)?;

        let names = schema.names().into_iter().map(String::from).collect();
        let info = ModelInfo::new(classifier.as_ref(), names, None);
        Ok(Self {
            state: ModelState::Ready { classifier, info },
            builder: FeatureVectorBuilder::new(schema),
            categorizer: RiskCategorizer::new(),
            config: PredictorConfig::default(),
        })
    }

    /// Wrap a classifier and its metadata sidecar
    pub fn from_parts(
        classifier: Arc<dyn RiskClassifier>,
        metadata: Option<ModelMetadata>,
        config: PredictorConfig,
    ) -> Result<Self> {
        let schema = resolve_schema(classifier.as_ref(), metadata.as_ref())?;
        let names = schema.names().into_iter().map(String::from).collect();
        let info = ModelInfo::new(classifier.as_ref(), names, metadata.as_ref());
        Ok(Self {
            state: ModelState::Ready { classifier, info },
            builder: FeatureVectorBuilder::new(schema),
            categorizer: RiskCategorizer::new(),
            config,
        })
    }

    /// Load the model artifact and metadata named by `config`.
    ///
    /// Fails with a configuration error if either is unusable.
    pub fn load(config: &PredictorConfig) -> Result<Self> {
        config.validate()?;
        let model = LogisticModel::load(&config.model_path)?;
        let metadata = ModelMetadata::load(&config.metadata_path)?;
        let service = Self::from_parts(Arc::new(model), metadata, config.clone())?;
        info!(
            "Prediction service ready: {} features",
            service.builder.schema().len()
        );
        Ok(service)
    }

    /// Like [`load`](Self::load), but a failure leaves the service in an
    /// unavailable state where every prediction returns `ModelUnavailable`.
    pub fn load_or_unavailable(config: &PredictorConfig) -> Self {
        match Self::load(config) {
            Ok(service) => service,
            Err(e) => {
                error!("Model failed to load: {}", e);
                Self::unavailable(e.to_string()).with_config(config.clone())
            }
        }
    }

    /// A service with no model; every prediction fails
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable(reason.into()),
            builder: FeatureVectorBuilder::default(),
            categorizer: RiskCategorizer::new(),
            config: PredictorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PredictorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.builder.schema()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready { .. })
    }

    fn classifier(&self) -> Result<&Arc<dyn RiskClassifier>> {
        match &self.state {
            ModelState::Ready { classifier, .. } => Ok(classifier),
            ModelState::Unavailable(reason) => {
                Err(CabRiskError::ModelUnavailable(reason.clone()))
            }
        }
    }

    pub fn model_info(&self) -> Result<&ModelInfo> {
        match &self.state {
            ModelState::Ready { info, .. } => Ok(info),
            ModelState::Unavailable(reason) => {
                Err(CabRiskError::ModelUnavailable(reason.clone()))
            }
        }
    }

    /// Score a single booking
    pub fn predict_one(&self, record: &BookingRecord) -> Result<PredictionResult> {
        let classifier = self.classifier()?;

        let vector = self.builder.build(record);
        let row = vector.ordered(self.builder.schema());
        let x = Array2::from_shape_vec((1, row.len()), row)?;

        let probabilities = self.invoke(classifier.as_ref(), &x)?;
        let probability = probabilities[0];

        let (risk_category, recommendation) = self.categorizer.categorize(probability)?;
        let confidence = self.categorizer.confidence(probability)?;
        let warnings = self.config.training_ranges.check(record);

        debug!(probability, category = %risk_category, "Scored booking");

        Ok(PredictionResult {
            probability,
            high_risk: probability > DECISION_THRESHOLD,
            risk_category,
            confidence,
            recommendation: recommendation.to_string(),
            warnings,
        })
    }

    /// Score every row of `df`, appending the three result columns
    pub fn predict_batch(&self, df: &DataFrame) -> Result<DataFrame> {
        self.predict_batch_cancellable(df, &AtomicBool::new(false))
    }

    /// Like [`predict_batch`](Self::predict_batch); setting `cancel` stops
    /// the run before the next partition starts.
    pub fn predict_batch_cancellable(&self, df: &DataFrame, cancel: &AtomicBool) -> Result<DataFrame> {
        self.predict_batch_with_warnings(df, cancel)
            .map(|(table, _)| table)
    }

    /// Score `df` and report values outside the training ranges.
    ///
    /// Warnings never block scoring; one is returned per out-of-range field.
    pub fn predict_batch_with_warnings(
        &self,
        df: &DataFrame,
        cancel: &AtomicBool,
    ) -> Result<(DataFrame, Vec<ValueRangeWarning>)> {
        let start = Instant::now();
        let classifier = self.classifier()?;
        Self::check_batch(df)?;
        let warnings = self.config.training_ranges.check_table(df)?;

        let partitions = self.partitions(df);
        let completed = AtomicUsize::new(0);

        let score_partition = |part: &DataFrame| -> Result<Vec<f64>> {
            if cancel.load(Ordering::SeqCst) {
                return Err(CabRiskError::Cancelled {
                    completed_rows: completed.load(Ordering::SeqCst),
                });
            }
            let probabilities = self.score(classifier.as_ref(), part)?;
            completed.fetch_add(part.height(), Ordering::SeqCst);
            Ok(probabilities)
        };

        let scored: Vec<Vec<f64>> = if self.should_use_parallel(df.height()) {
            let run = || {
                partitions
                    .par_iter()
                    .map(&score_partition)
                    .collect::<Result<Vec<_>>>()
            };
            match self.config.n_workers {
                Some(n_workers) => rayon::ThreadPoolBuilder::new()
                    .num_threads(n_workers)
                    .build()
                    .map_err(|e| CabRiskError::InferenceError(format!("Thread pool error: {}", e)))?
                    .install(run)?,
                None => run()?,
            }
        } else {
            partitions
                .iter()
                .map(&score_partition)
                .collect::<Result<Vec<_>>>()?
        };

        let probabilities: Vec<f64> = scored.into_iter().flatten().collect();
        let result = self.attach_results(df, probabilities)?;

        info!(
            "Scored {} rows in {} partitions ({:.1} ms, {} range warnings)",
            result.height(),
            partitions.len(),
            start.elapsed().as_secs_f64() * 1000.0,
            warnings.len()
        );
        Ok((result, warnings))
    }

    /// Lazily score `df` one partition at a time. Dropping the iterator
    /// stops further work.
    pub fn predict_batch_chunks<'a>(
        &'a self,
        df: &'a DataFrame,
    ) -> Result<impl Iterator<Item = Result<DataFrame>> + 'a> {
        let classifier = self.classifier()?;
        Self::check_batch(df)?;

        let batch_size = self.config.batch_size.max(1);
        let n_chunks = df.height().div_ceil(batch_size);

        Ok((0..n_chunks).map(move |i| {
            let start = i * batch_size;
            let end = (start + batch_size).min(df.height());
            let chunk = df.slice(start as i64, end - start);
            let probabilities = self.score(classifier.as_ref(), &chunk)?;
            self.attach_results(&chunk, probabilities)
        }))
    }

    /// Aggregate a table produced by [`predict_batch`](Self::predict_batch)
    pub fn summarize(&self, results: &DataFrame) -> Result<BatchSummary> {
        let column = results
            .column(PROBABILITY_COLUMN)
            .map_err(|_| CabRiskError::FeatureNotFound(PROBABILITY_COLUMN.to_string()))?;
        let probabilities: Vec<f64> = column
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .flatten()
            .collect();

        let mut counts = [0usize; 5];
        for &p in &probabilities {
            let category = self.categorizer.category(p)?;
            counts[category as usize] += 1;
        }

        let total = probabilities.len();
        let mean_probability = if total > 0 {
            probabilities.iter().sum::<f64>() / total as f64
        } else {
            0.0
        };

        Ok(BatchSummary {
            total,
            predicted_cancellations: probabilities.iter().filter(|&&p| p > DECISION_THRESHOLD).count(),
            high_risk: probabilities.iter().filter(|&&p| p >= 0.30).count(),
            critical: probabilities.iter().filter(|&&p| p >= 0.50).count(),
            mean_probability,
            category_counts: RiskCategory::ALL.iter().copied().zip(counts).collect(),
        })
    }

    // =========================================================================
    // Private helpers
    // =========================================================================

    fn check_batch(df: &DataFrame) -> Result<()> {
        if df.width() == 0 || df.height() == 0 {
            return Err(CabRiskError::InputShape(format!(
                "batch must have at least one row and one column, got {} rows x {} columns",
                df.height(),
                df.width()
            )));
        }
        Ok(())
    }

    fn should_use_parallel(&self, n_rows: usize) -> bool {
        let n_workers = self
            .config
            .n_workers
            .unwrap_or_else(rayon::current_num_threads);
        n_workers > 1 && n_rows > self.config.batch_size * 2
    }

    fn partitions(&self, df: &DataFrame) -> Vec<DataFrame> {
        let batch_size = self.config.batch_size.max(1);
        let n_rows = df.height();
        (0..n_rows.div_ceil(batch_size))
            .map(|i| {
                let start = i * batch_size;
                let end = (start + batch_size).min(n_rows);
                df.slice(start as i64, end - start)
            })
            .collect()
    }

    /// Run the classifier and check its output
    fn invoke(&self, classifier: &dyn RiskClassifier, x: &Array2<f64>) -> Result<Vec<f64>> {
        let probabilities = classifier
            .predict_proba(x)
            .map_err(|e| CabRiskError::InferenceError(e.to_string()))?;

        if probabilities.len() != x.nrows() {
            return Err(CabRiskError::InferenceError(format!(
                "classifier returned {} probabilities for {} rows",
                probabilities.len(),
                x.nrows()
            )));
        }
        if let Some(bad) = probabilities
            .iter()
            .find(|p| p.is_nan() || !(0.0..=1.0).contains(*p))
        {
            return Err(CabRiskError::InferenceError(format!(
                "classifier returned probability {} outside [0, 1]",
                bad
            )));
        }

        Ok(probabilities.to_vec())
    }

    /// Build features for a partition and score them
    fn score(&self, classifier: &dyn RiskClassifier, part: &DataFrame) -> Result<Vec<f64>> {
        let features = self.builder.build_batch(part)?;
        let x = columns_to_array2(&features)?;
        self.invoke(classifier, &x)
    }

    fn attach_results(&self, df: &DataFrame, probabilities: Vec<f64>) -> Result<DataFrame> {
        let predictions: Vec<i32> = probabilities
            .iter()
            .map(|&p| (p > DECISION_THRESHOLD) as i32)
            .collect();
        let categories = probabilities
            .iter()
            .map(|&p| self.categorizer.category(p).map(|c| c.label()))
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        result.with_column(Column::new(PROBABILITY_COLUMN.into(), probabilities))?;
        result.with_column(Column::new(PREDICTION_COLUMN.into(), predictions))?;
        result.with_column(Column::new(CATEGORY_COLUMN.into(), categories))?;
        Ok(result)
    }
}

/// Convert an all-`f64` feature table into a row-major matrix
fn columns_to_array2(df: &DataFrame) -> Result<Array2<f64>> {
    let columns = df
        .get_columns()
        .iter()
        .map(|c| -> Result<Vec<f64>> {
            Ok(c.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn((df.height(), df.width()), |(i, j)| {
        columns[j][i]
    }))
}

//! Outcome model: dataset, training and the persisted artifact.
//!
//! A trained model is persisted as two companion JSON files: the fitted
//! forest, and a metadata record carrying the ordered feature schema,
//! held-out accuracy and hyperparameters. They are only ever loaded
//! together, and loading rejects a schema that differs from
//! `FEATURE_COLUMNS`.

pub mod dataset;
pub mod forest;
pub mod metrics;
pub mod split;
pub mod trainer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::features::{feature_schema, FeatureVector};
use crate::storage;
use crate::types::{MatchOutcome, PipelineError};
use forest::RandomForest;
use metrics::EvaluationReport;

pub const MODEL_TYPE: &str = "RandomForestClassifier";

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
    pub class_weight: String,
    pub test_fraction: f64,
    pub seed: u64,
}

/// Companion record written next to the fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub feature_columns: Vec<String>,
    pub model_type: String,
    pub accuracy: f64,
    pub hyperparameters: Hyperparameters,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    pub test_rows: usize,
    /// `(feature, importance)`, most important first.
    pub feature_importances: Vec<(String, f64)>,
    pub evaluation: EvaluationReport,
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub away_win: f64,
    pub draw: f64,
    pub home_win: f64,
}

impl ClassProbabilities {
    pub fn get(&self, outcome: MatchOutcome) -> f64 {
        match outcome {
            MatchOutcome::AwayWin => self.away_win,
            MatchOutcome::Draw => self.draw,
            MatchOutcome::HomeWin => self.home_win,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub outcome: MatchOutcome,
    pub probabilities: ClassProbabilities,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (home {:.1}% | draw {:.1}% | away {:.1}%)",
            self.outcome,
            self.probabilities.home_win * 100.0,
            self.probabilities.draw * 100.0,
            self.probabilities.away_win * 100.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// A fitted forest together with the schema it was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub forest: RandomForest,
    pub metadata: ModelMetadata,
}

impl ModelArtifact {
    /// Check the artifact is usable with this build's feature shape.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let expected = feature_schema();
        if self.metadata.feature_columns != expected {
            return Err(PipelineError::SchemaMismatch {
                expected,
                found: self.metadata.feature_columns.clone(),
            });
        }
        if self.forest.n_features() != expected.len() {
            return Err(PipelineError::SchemaMismatch {
                expected,
                found: vec![format!("<{} unnamed features>", self.forest.n_features())],
            });
        }
        self.forest.validate()
    }

    /// Project `row` through the stored schema and score it.
    pub fn predict(&self, row: &FeatureVector) -> Result<Prediction, PipelineError> {
        let values = row.project(&self.metadata.feature_columns)?;
        let proba = self.forest.predict_proba(&values)?;

        let mut probabilities = ClassProbabilities {
            away_win: 0.0,
            draw: 0.0,
            home_win: 0.0,
        };
        for (outcome, p) in self.forest.classes().iter().zip(&proba) {
            match outcome {
                MatchOutcome::AwayWin => probabilities.away_win = *p,
                MatchOutcome::Draw => probabilities.draw = *p,
                MatchOutcome::HomeWin => probabilities.home_win = *p,
            }
        }
        let outcome = self.forest.most_likely(&proba);
        Ok(Prediction { outcome, probabilities })
    }

    /// Write both files as one unit: both are staged before either is
    /// replaced, so a failed save never pairs a new forest with old metadata.
    pub fn save(&self, model_path: &Path, metadata_path: &Path) -> Result<(), PipelineError> {
        let forest = serde_json::to_string_pretty(&self.forest)?;
        let metadata = serde_json::to_string_pretty(&self.metadata)?;
        storage::write_atomic_all(&[
            (model_path, forest.as_bytes()),
            (metadata_path, metadata.as_bytes()),
        ])?;
        info!(
            model = %model_path.display(),
            metadata = %metadata_path.display(),
            accuracy = self.metadata.accuracy,
            "Model artifact saved"
        );
        Ok(())
    }

    /// Load and validate both files. Missing files are `ModelUnavailable`.
    pub fn load(model_path: &Path, metadata_path: &Path) -> Result<Self, PipelineError> {
        if !model_path.exists() || !metadata_path.exists() {
            return Err(PipelineError::ModelUnavailable);
        }
        let forest: RandomForest = storage::load_json(model_path)?;
        let metadata: ModelMetadata = storage::load_json(metadata_path)?;
        let artifact = Self { forest, metadata };
        artifact.validate()?;
        info!(
            model = %model_path.display(),
            model_type = %artifact.metadata.model_type,
            accuracy = artifact.metadata.accuracy,
            trained_at = %artifact.metadata.trained_at,
            "Model artifact loaded"
        );
        Ok(artifact)
    }
}

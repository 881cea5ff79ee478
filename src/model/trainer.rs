//! Model training: stratified split, forest fit, held-out evaluation.

use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use super::dataset::Dataset;
use super::forest::{ForestParams, RandomForest};
use super::metrics::evaluate;
use super::split::stratified_split;
use super::{Hyperparameters, ModelArtifact, ModelMetadata, MODEL_TYPE};
use crate::config::TrainingConfig;
use crate::features::feature_schema;
use crate::types::{MatchOutcome, PipelineError};

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    fn params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.config.n_estimators,
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            seed: self.config.seed,
        }
    }

    /// Fit a forest on the training partition of `dataset` and score it on
    /// the held-out partition. Same dataset and seed give the same artifact
    /// (apart from `trained_at`).
    pub fn train(&self, dataset: &Dataset) -> Result<ModelArtifact, PipelineError> {
        if dataset.is_empty() {
            return Err(PipelineError::InsufficientData("feature dataset is empty".into()));
        }
        dataset.log_summary();

        let schema = feature_schema();
        let (x, y) = dataset.labelled(&schema)?;
        let split = stratified_split(&y, self.config.test_fraction, self.config.seed)?;

        let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<MatchOutcome>) {
            idx.iter().map(|&i| (x[i].clone(), y[i])).unzip()
        };
        let (x_train, y_train) = pick(&split.train);
        let (x_test, y_test) = pick(&split.test);

        info!(
            train_rows = x_train.len(),
            test_rows = x_test.len(),
            n_estimators = self.config.n_estimators,
            max_depth = self.config.max_depth,
            "Training random forest"
        );
        let forest = RandomForest::fit(&x_train, &y_train, self.params())?;

        let predicted = x_test
            .iter()
            .map(|row| forest.predict(row))
            .collect::<Result<Vec<_>, _>>()?;
        let evaluation = evaluate(&y_test, &predicted);

        let mut feature_importances: Vec<(String, f64)> = schema
            .iter()
            .cloned()
            .zip(forest.feature_importances().iter().copied())
            .collect();
        feature_importances.sort_by(|a, b| b.1.total_cmp(&a.1));

        info!(accuracy = evaluation.accuracy, "Model evaluated on held-out rows");
        info!("Classification report:\n{evaluation}");
        for (name, importance) in &feature_importances {
            info!(feature = %name, importance = *importance, "Feature importance");
        }

        let metadata = ModelMetadata {
            feature_columns: schema.clone(),
            model_type: MODEL_TYPE.to_string(),
            accuracy: evaluation.accuracy,
            hyperparameters: Hyperparameters {
                n_estimators: self.config.n_estimators,
                max_depth: self.config.max_depth,
                min_samples_split: self.config.min_samples_split,
                max_features: ((schema.len() as f64).sqrt().floor() as usize).max(1),
                class_weight: "balanced".to_string(),
                test_fraction: self.config.test_fraction,
                seed: self.config.seed,
            },
            trained_at: Utc::now(),
            training_rows: x_train.len(),
            test_rows: x_test.len(),
            feature_importances,
            evaluation,
        };

        Ok(ModelArtifact { forest, metadata })
    }

    /// Train and persist. Nothing is written unless training succeeds, so a
    /// failed run leaves any previous artifact in place.
    pub fn train_and_save(
        &self,
        dataset: &Dataset,
        model_path: &Path,
        metadata_path: &Path,
    ) -> Result<ModelArtifact, PipelineError> {
        let artifact = match self.train(dataset) {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "Training failed; existing model left untouched");
                return Err(e);
            }
        };
        artifact.save(model_path, metadata_path)?;
        Ok(artifact)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

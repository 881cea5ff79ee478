//! Fixture feature engineering.
//!
//! A fixture is described by six numeric features: recent win counts,
//! league positions and head-to-head wins for each side. The same
//! `FeatureVector` shape is produced at training time by the assembler
//! and at serving time by the inference engine; the model only ever sees
//! it through `FeatureVector::project`, which orders values by a stored
//! schema.

pub mod assembler;
pub mod form;
pub mod h2h;
pub mod resolver;
pub mod standings;

use serde::{Deserialize, Serialize};

use crate::types::{MatchOutcome, PipelineError};

/// Feature names in the order the model is trained on.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "form_home",
    "form_away",
    "standing_home",
    "standing_away",
    "h2h_home_wins",
    "h2h_away_wins",
];

/// The feature schema as owned strings, as stored in model metadata.
pub fn feature_schema() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// One row per fixture. `result` is set for training rows only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub home_id: String,
    pub away_id: String,
    pub form_home: u32,
    pub form_away: u32,
    pub standing_home: u32,
    pub standing_away: u32,
    pub h2h_home_wins: u32,
    pub h2h_away_wins: u32,
    pub result: Option<MatchOutcome>,
}

impl FeatureVector {
    /// Value of a named feature column.
    pub fn feature(&self, name: &str) -> Option<f64> {
        let value = match name {
            "form_home" => self.form_home,
            "form_away" => self.form_away,
            "standing_home" => self.standing_home,
            "standing_away" => self.standing_away,
            "h2h_home_wins" => self.h2h_home_wins,
            "h2h_away_wins" => self.h2h_away_wins,
            _ => return None,
        };
        Some(f64::from(value))
    }

    /// Values ordered by `schema`. An unknown column name is a schema
    /// mismatch; columns are never reordered or dropped silently.
    pub fn project(&self, schema: &[String]) -> Result<Vec<f64>, PipelineError> {
        schema
            .iter()
            .map(|name| {
                self.feature(name).ok_or_else(|| PipelineError::SchemaMismatch {
                    expected: feature_schema(),
                    found: schema.to_vec(),
                })
            })
            .collect()
    }
}

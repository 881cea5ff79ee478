//! Front-end facing calls.
//!
//! A chat bot or any other front-end talks to the pipeline through
//! `PredictionService`. Every call returns either a value or a message fit
//! to show a user; errors never escape as panics or typed errors.

use std::sync::Arc;
use tracing::{info, warn};

use super::inference::InferenceEngine;
use crate::data::{FetchOutcome, MatchDataProvider};
use crate::model::ClassProbabilities;
use crate::types::{MatchEvent, MatchOutcome, PipelineError};

pub struct PredictionService {
    engine: InferenceEngine,
    provider: Arc<dyn MatchDataProvider>,
}

impl PredictionService {
    pub fn new(engine: InferenceEngine, provider: Arc<dyn MatchDataProvider>) -> Self {
        Self { engine, provider }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// `(outcome label, probabilities)` for `home_name` vs `away_name`, or
    /// a message explaining why no prediction was made.
    pub async fn predict_match(
        &self,
        home_name: &str,
        away_name: &str,
    ) -> Result<(String, ClassProbabilities), String> {
        match self.engine.predict(home_name, away_name).await {
            Ok(prediction) => Ok((prediction.outcome.to_string(), prediction.probabilities)),
            Err(PipelineError::ModelUnavailable) => {
                warn!("Prediction requested but no model is loaded");
                Err("Model not trained yet. Run `matchcast train` first.".to_string())
            }
            Err(e) => {
                warn!(home = home_name, away = away_name, error = %e, "Prediction failed");
                Err(format!("Error making prediction: {e}"))
            }
        }
    }

    /// The most recent match involving the two teams, rendered with
    /// `format_result`. Team names are sent to the provider as typed.
    pub async fn latest_result(&self, team1: &str, team2: &str) -> Result<String, String> {
        let (team1, team2) = (team1.trim(), team2.trim());
        match self.provider.get_head_to_head(team1, team2).await {
            FetchOutcome::Data(record) => match record.latest_match() {
                Some(m) => {
                    info!(team1, team2, match_id = %m.match_id, "Latest result found");
                    Ok(format_result(m))
                }
                None => Err(format!("No matches found for {team1} and {team2}.")),
            },
            FetchOutcome::Empty => Err(format!("No matches found for {team1} and {team2}.")),
            FetchOutcome::Failed(cause) => {
                warn!(team1, team2, cause = %cause, "Head-to-head lookup failed");
                Err("Could not fetch match data.".to_string())
            }
        }
    }
}

/// Multi-line summary of a single match.
pub fn format_result(m: &MatchEvent) -> String {
    let or = |value: &str, fallback: &str| {
        if value.trim().is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };
    let home = or(&m.home_team_name, "Unknown team");
    let away = or(&m.away_team_name, "Unknown team");

    let result = match m.outcome() {
        Some(MatchOutcome::HomeWin) => format!("{home} won"),
        Some(MatchOutcome::AwayWin) => format!("{away} won"),
        Some(MatchOutcome::Draw) => "Draw".to_string(),
        None => "Score not available".to_string(),
    };

    format!(
        "**{home} vs {away}**\nDate: {}\nLeague: {}\nScore: {} - {}\nResult: {result}",
        or(&m.date, "Unknown date"),
        or(&m.league, "Unknown league"),
        m.home_score,
        m.away_score,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

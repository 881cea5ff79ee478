//! Inference engine.
//!
//! Rebuilds the training feature shape for a fixture that has not been
//! played and scores it with the loaded model artifact. Form is win-only
//! over each team's recent window; standings come from the shared cache.
//! Head-to-head features depend on `ServingConfig::head_to_head`: zero in
//! `Placeholder` mode, or tallied from the provider's head-to-head record
//! with the same calculator training uses in `Lookup` mode.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{HeadToHeadMode, ServingConfig};
use crate::data::{FetchOutcome, MatchDataProvider};
use crate::features::form::win_count;
use crate::features::h2h::{head_to_head, HeadToHead};
use crate::features::resolver::TeamResolver;
use crate::features::standings::StandingsCache;
use crate::features::FeatureVector;
use crate::model::{ModelArtifact, Prediction};
use crate::types::{MatchEvent, PipelineError};

pub struct InferenceEngine {
    provider: Arc<dyn MatchDataProvider>,
    standings: Arc<StandingsCache>,
    resolver: Arc<dyn TeamResolver>,
    artifact: Option<ModelArtifact>,
    league_id: String,
    serving: ServingConfig,
}

impl InferenceEngine {
    pub fn new(
        provider: Arc<dyn MatchDataProvider>,
        standings: Arc<StandingsCache>,
        resolver: Arc<dyn TeamResolver>,
        league_id: impl Into<String>,
        serving: ServingConfig,
    ) -> Self {
        info!(
            head_to_head = ?serving.head_to_head,
            form_window = serving.form_window,
            "Inference engine ready"
        );
        if serving.head_to_head == HeadToHeadMode::Placeholder {
            info!("Head-to-head features are zero at serving time (placeholder mode)");
        }
        Self {
            provider,
            standings,
            resolver,
            artifact: None,
            league_id: league_id.into(),
            serving,
        }
    }

    /// Load the artifact bundle from disk, replacing any loaded one. On
    /// failure the engine keeps whatever it had before.
    pub fn load_artifact(&mut self, model_path: &Path, metadata_path: &Path) -> Result<(), PipelineError> {
        let artifact = ModelArtifact::load(model_path, metadata_path)?;
        self.set_artifact(artifact)
    }

    pub fn set_artifact(&mut self, artifact: ModelArtifact) -> Result<(), PipelineError> {
        artifact.validate()?;
        self.artifact = Some(artifact);
        Ok(())
    }

    pub fn has_artifact(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn standings(&self) -> &StandingsCache {
        &self.standings
    }

    /// Unlabelled feature row for `home` vs `away` (names or ids).
    pub async fn build_features(&self, home: &str, away: &str) -> FeatureVector {
        let home_id = self.resolver.resolve(home);
        let away_id = self.resolver.resolve(away);

        self.standings
            .ensure_populated(self.provider.as_ref(), &self.league_id)
            .await;

        let home_window = self.recent_window(&home_id).await;
        let away_window = self.recent_window(&away_id).await;

        let h2h = match self.serving.head_to_head {
            HeadToHeadMode::Placeholder => HeadToHead::default(),
            HeadToHeadMode::Lookup => self.lookup_head_to_head(&home_id, &away_id).await,
        };

        let row = FeatureVector {
            form_home: win_count(&home_window, &home_id),
            form_away: win_count(&away_window, &away_id),
            standing_home: self.standings.get(&home_id),
            standing_away: self.standings.get(&away_id),
            h2h_home_wins: h2h.first_wins,
            h2h_away_wins: h2h.second_wins,
            result: None,
            home_id,
            away_id,
        };
        debug!(?row, "Serving features built");
        row
    }

    /// Predict the outcome of `home` vs `away`.
    ///
    /// `ModelUnavailable` when nothing is loaded and `SchemaMismatch` are
    /// returned as-is; anything else past artifact loading is reported as
    /// `Prediction`.
    pub async fn predict(&self, home: &str, away: &str) -> Result<Prediction, PipelineError> {
        let Some(artifact) = &self.artifact else {
            return Err(PipelineError::ModelUnavailable);
        };

        let row = self.build_features(home, away).await;
        match artifact.predict(&row) {
            Ok(prediction) => {
                info!(
                    home = %row.home_id,
                    away = %row.away_id,
                    outcome = %prediction.outcome,
                    home_win = prediction.probabilities.home_win,
                    draw = prediction.probabilities.draw,
                    away_win = prediction.probabilities.away_win,
                    "Prediction made"
                );
                Ok(prediction)
            }
            Err(e @ (PipelineError::SchemaMismatch { .. } | PipelineError::Prediction(_))) => Err(e),
            Err(other) => Err(PipelineError::Prediction(other.to_string())),
        }
    }

    async fn recent_window(&self, team_id: &str) -> Vec<MatchEvent> {
        match self
            .provider
            .get_team_events(team_id, self.serving.form_window)
            .await
        {
            FetchOutcome::Data(events) => events,
            FetchOutcome::Empty => Vec::new(),
            FetchOutcome::Failed(cause) => {
                warn!(team_id, cause = %cause, "Recent-match query failed; form counted as zero");
                Vec::new()
            }
        }
    }

    async fn lookup_head_to_head(&self, home_id: &str, away_id: &str) -> HeadToHead {
        match self.provider.get_head_to_head(home_id, away_id).await {
            FetchOutcome::Data(record) => head_to_head(&record.meetings, home_id, away_id),
            FetchOutcome::Empty => HeadToHead::default(),
            FetchOutcome::Failed(cause) => {
                warn!(home_id, away_id, cause = %cause, "Head-to-head query failed; using zero");
                HeadToHead::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

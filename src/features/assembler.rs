//! Fixture deduplication and training-row assembly.
//!
//! Walks the raw event snapshot in order, drops duplicates and fixtures
//! that cannot be labelled, and builds one `FeatureVector` per remaining
//! match id. Each emitted fixture costs two provider queries (one recent
//! window per team), each followed by the configured rate-limit pause, so
//! assembly is strictly sequential.
//!
//! Rows are keyed by the provider's own team ids, exactly as they appear in
//! the snapshot. Those ids are the canonical space: recent windows,
//! standings and head-to-head all match on them. Name resolution only
//! happens at serving time, where free-text names come in.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::form::calculate_form;
use super::h2h::head_to_head;
use super::standings::StandingsCache;
use super::FeatureVector;
use crate::config::AppConfig;
use crate::data::{FetchOutcome, MatchDataProvider};
use crate::types::{MatchEvent, MatchOutcome, PipelineError};

// ---------------------------------------------------------------------------
// Configuration / report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    pub league_id: String,
    pub form_window: u32,
    pub request_delay: Duration,
}

impl AssemblyConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            league_id: cfg.season.league_id.clone(),
            form_window: cfg.pipeline.form_window,
            request_delay: cfg.pipeline.request_delay(),
        }
    }
}

/// Counters describing one assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub events_seen: usize,
    pub rows_emitted: usize,
    pub duplicates: usize,
    pub integrity_skips: usize,
    /// Recent-match queries that failed outright (form counted as zero).
    pub failed_windows: usize,
    /// Recent-match queries that succeeded with no matches.
    pub empty_windows: usize,
    /// Teams loaded into the standings cache, or zero if it fell back.
    pub standings_teams: usize,
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

pub struct FeatureAssembler<'a> {
    provider: &'a dyn MatchDataProvider,
    standings: &'a StandingsCache,
    config: AssemblyConfig,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(
        provider: &'a dyn MatchDataProvider,
        standings: &'a StandingsCache,
        config: AssemblyConfig,
    ) -> Self {
        Self {
            provider,
            standings,
            config,
        }
    }

    /// Build one labelled row per unique, valid fixture in `events`.
    /// Rows come out in order of first valid occurrence.
    pub async fn assemble(&self, events: &[MatchEvent]) -> (Vec<FeatureVector>, AssemblyReport) {
        let mut report = AssemblyReport {
            events_seen: events.len(),
            ..Default::default()
        };

        self.standings
            .ensure_populated(self.provider, &self.config.league_id)
            .await;
        report.standings_teams = self.standings.len();

        let mut processed: HashSet<&str> = HashSet::new();
        let mut rows = Vec::new();

        for ev in events {
            if processed.contains(ev.match_id.as_str()) {
                report.duplicates += 1;
                continue;
            }
            let outcome = match validate_fixture(ev) {
                Ok(outcome) => outcome,
                Err(e) => {
                    debug!(match_id = %ev.match_id, error = %e, "Skipping fixture");
                    report.integrity_skips += 1;
                    continue;
                }
            };
            processed.insert(ev.match_id.as_str());

            let row = self.build_row(ev, outcome, events, &mut report).await;
            debug!(
                match_id = %ev.match_id,
                home = %row.home_id,
                away = %row.away_id,
                result = outcome.label(),
                "Assembled fixture"
            );
            rows.push(row);
        }

        report.rows_emitted = rows.len();
        info!(
            events = report.events_seen,
            rows = report.rows_emitted,
            duplicates = report.duplicates,
            skipped = report.integrity_skips,
            failed_windows = report.failed_windows,
            empty_windows = report.empty_windows,
            standings_teams = report.standings_teams,
            "Feature assembly complete"
        );
        (rows, report)
    }

    async fn build_row(
        &self,
        ev: &MatchEvent,
        outcome: MatchOutcome,
        all_events: &[MatchEvent],
        report: &mut AssemblyReport,
    ) -> FeatureVector {
        let home_id = ev.home_team_id.clone();
        let away_id = ev.away_team_id.clone();

        let home_window = self.recent_window(&home_id, report).await;
        let away_window = self.recent_window(&away_id, report).await;

        let home_form = calculate_form(&home_window, &home_id);
        let away_form = calculate_form(&away_window, &away_id);
        let h2h = head_to_head(all_events, &home_id, &away_id);

        FeatureVector {
            form_home: home_form.wins,
            form_away: away_form.wins,
            standing_home: self.standings.get(&home_id),
            standing_away: self.standings.get(&away_id),
            h2h_home_wins: h2h.first_wins,
            h2h_away_wins: h2h.second_wins,
            result: Some(outcome),
            home_id,
            away_id,
        }
    }

    /// One team's recent matches. A failed query degrades to an empty window.
    async fn recent_window(&self, team_id: &str, report: &mut AssemblyReport) -> Vec<MatchEvent> {
        let outcome = self
            .provider
            .get_team_events(team_id, self.config.form_window)
            .await;
        tokio::time::sleep(self.config.request_delay).await;

        match outcome {
            FetchOutcome::Data(events) => events,
            FetchOutcome::Empty => {
                report.empty_windows += 1;
                Vec::new()
            }
            FetchOutcome::Failed(cause) => {
                warn!(team_id, cause = %cause, "Recent-match query failed; form counted as zero");
                report.failed_windows += 1;
                Vec::new()
            }
        }
    }
}

/// Check a raw event can become a labelled training row.
pub fn validate_fixture(ev: &MatchEvent) -> Result<MatchOutcome, PipelineError> {
    if ev.match_id.trim().is_empty() {
        return Err(PipelineError::DataIntegrity("missing match id".into()));
    }
    if !ev.has_teams() {
        return Err(PipelineError::DataIntegrity(format!(
            "match {} is missing a team id",
            ev.match_id
        )));
    }
    ev.outcome().ok_or_else(|| {
        PipelineError::DataIntegrity(format!(
            "match {} has unknown score {}-{}",
            ev.match_id, ev.home_score, ev.away_score
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! League standings cache.
//!
//! Maps team id to league position. Populated from a single standings
//! query the first time a pipeline stage needs it and reused until
//! `invalidate()` is called. The cache is not partitioned by league: once
//! populated, later calls are no-ops whatever league they ask for.
//!
//! Population is serialised behind an async mutex, so two stages sharing
//! one cache never issue duplicate fetches. Reads take a short-lived
//! `RwLock` guard and never await while holding it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::data::{FetchOutcome, MatchDataProvider};
use crate::types::{TeamStanding, UNKNOWN_POSITION};

#[derive(Debug, Default)]
pub struct StandingsCache {
    positions: RwLock<HashMap<String, u32>>,
    fill: Mutex<()>,
}

impl StandingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-filled with known standings, for deterministic callers.
    pub fn with_standings(standings: impl IntoIterator<Item = TeamStanding>) -> Self {
        let cache = Self::new();
        cache.replace(standings);
        cache
    }

    /// League position for `team_id`, or `UNKNOWN_POSITION` if absent.
    pub fn get(&self, team_id: &str) -> u32 {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(team_id)
            .copied()
            .unwrap_or(UNKNOWN_POSITION)
    }

    pub fn len(&self) -> usize {
        self.positions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all cached positions; the next `ensure_populated` re-fetches.
    pub fn invalidate(&self) {
        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("Standings cache invalidated");
    }

    /// Overwrite the whole table. Entries are never merged.
    fn replace(&self, standings: impl IntoIterator<Item = TeamStanding>) {
        let table: HashMap<String, u32> = standings
            .into_iter()
            .filter(|s| !s.team_id.is_empty())
            .map(|s| (s.team_id, s.league_position))
            .collect();
        *self.positions.write().unwrap_or_else(PoisonError::into_inner) = table;
    }

    /// Fetch standings if the cache is empty. Returns the outcome of the
    /// query, or `None` if no query was needed.
    ///
    /// A failed or empty fetch leaves the cache empty, so every team falls
    /// back to `UNKNOWN_POSITION` and a later call will try again.
    pub async fn ensure_populated(
        &self,
        provider: &dyn MatchDataProvider,
        league_id: &str,
    ) -> Option<FetchOutcome<usize>> {
        let _guard = self.fill.lock().await;
        if !self.is_empty() {
            return None;
        }

        let outcome = provider.get_standings(league_id).await;
        let summary = match outcome {
            FetchOutcome::Data(standings) => {
                self.replace(standings);
                info!(league_id, teams = self.len(), "Loaded standings");
                FetchOutcome::Data(self.len())
            }
            FetchOutcome::Empty => {
                warn!(league_id, "Standings query returned no teams; using sentinel positions");
                FetchOutcome::Empty
            }
            FetchOutcome::Failed(cause) => {
                warn!(league_id, cause = %cause, "Standings query failed; using sentinel positions");
                FetchOutcome::Failed(cause)
            }
        };
        Some(summary)
    }
}

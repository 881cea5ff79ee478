//! Match data providers.
//!
//! Defines the `MatchDataProvider` trait the pipeline depends on, and the
//! typed `FetchOutcome` every provider call returns. Transport failures
//! are never raised as errors: callers degrade and continue, but can
//! still tell "no matches" apart from "the fetch broke".

pub mod apifootball;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{MatchEvent, TeamStanding};

// ---------------------------------------------------------------------------
// Fetch outcome
// ---------------------------------------------------------------------------

/// Result of a single provider query.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// The provider answered with a payload.
    Data(T),
    /// The provider answered, but there was nothing to return.
    Empty,
    /// The query failed (unreachable, non-2xx, malformed payload).
    Failed(String),
}

impl<T> FetchOutcome<T> {
    pub fn is_failure(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    /// Collapse to an optional payload, dropping the failure cause.
    pub fn data(self) -> Option<T> {
        match self {
            FetchOutcome::Data(t) => Some(t),
            FetchOutcome::Empty | FetchOutcome::Failed(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Data(t) => FetchOutcome::Data(f(t)),
            FetchOutcome::Empty => FetchOutcome::Empty,
            FetchOutcome::Failed(cause) => FetchOutcome::Failed(cause),
        }
    }
}

impl<T> FetchOutcome<Vec<T>> {
    /// Wrap a list, treating an empty list as `Empty`.
    pub fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Data(items)
        }
    }

    /// The records, or an empty vec on `Empty`/`Failed`.
    pub fn into_vec(self) -> Vec<T> {
        self.data().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Head-to-head payload
// ---------------------------------------------------------------------------

/// The provider's head-to-head record for two teams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadToHeadRecord {
    /// Previous meetings between the two teams, most recent first.
    #[serde(rename = "firstTeam_VS_secondTeam", default)]
    pub meetings: Vec<MatchEvent>,
    /// Latest results of the first team against anyone.
    #[serde(rename = "firstTeam_lastResults", default)]
    pub first_recent: Vec<MatchEvent>,
    /// Latest results of the second team against anyone.
    #[serde(rename = "secondTeam_lastResults", default)]
    pub second_recent: Vec<MatchEvent>,
}

impl HeadToHeadRecord {
    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty() && self.first_recent.is_empty() && self.second_recent.is_empty()
    }

    /// The most relevant single match: the latest meeting, else the first
    /// team's latest result, else the second team's.
    pub fn latest_match(&self) -> Option<&MatchEvent> {
        self.meetings
            .first()
            .or_else(|| self.first_recent.first())
            .or_else(|| self.second_recent.first())
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Abstraction over the external match data source.
///
/// Every call is a single remote query. Implementors never panic or
/// return errors for transport problems; they report them as
/// `FetchOutcome::Failed`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchDataProvider: Send + Sync {
    /// Current league table.
    async fn get_standings(&self, league_id: &str) -> FetchOutcome<Vec<TeamStanding>>;

    /// A team's most recent `limit` matches, in provider order.
    async fn get_team_events(&self, team_id: &str, limit: u32) -> FetchOutcome<Vec<MatchEvent>>;

    /// All league matches dated within `from..=to`.
    async fn get_events_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        league_id: &str,
    ) -> FetchOutcome<Vec<MatchEvent>>;

    /// Head-to-head record between two teams.
    async fn get_head_to_head(&self, first: &str, second: &str) -> FetchOutcome<HeadToHeadRecord>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

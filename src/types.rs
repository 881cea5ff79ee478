//! Shared types for the MATCHCAST pipeline.
//!
//! Raw match events, standings and outcome labels used across the
//! data, features, model and engine modules. Event fields keep the
//! API-Football wire names so that a saved snapshot is byte-compatible
//! with what the provider returns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// League position assumed for any team missing from the standings table.
pub const UNKNOWN_POSITION: u32 = 20;

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// A single side's goal count. The provider sends scores as strings and
/// uses `"?"` or `""` for matches not yet played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawScore", into = "String")]
pub enum Score {
    Known(u32),
    #[default]
    Unknown,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(u32),
    Text(String),
    Other(serde_json::Value),
}

impl Score {
    /// Parse a provider score string. Anything that is not purely decimal
    /// digits is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Score::Unknown;
        }
        raw.parse().map(Score::Known).unwrap_or(Score::Unknown)
    }

    pub fn value(&self) -> Option<u32> {
        match self {
            Score::Known(n) => Some(*n),
            Score::Unknown => None,
        }
    }
}

impl From<RawScore> for Score {
    fn from(raw: RawScore) -> Self {
        match raw {
            RawScore::Number(n) => Score::Known(n),
            RawScore::Text(s) => Score::parse(&s),
            RawScore::Other(_) => Score::Unknown,
        }
    }
}

impl From<Score> for String {
    fn from(score: Score) -> Self {
        score.to_string()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Known(n) => write!(f, "{n}"),
            Score::Unknown => write!(f, "?"),
        }
    }
}

// ---------------------------------------------------------------------------
// Side / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

/// Match result from the home team's point of view.
///
/// Serialised as the integer label used in the feature dataset:
/// `-1` away win, `0` draw, `1` home win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum MatchOutcome {
    AwayWin,
    Draw,
    HomeWin,
}

impl MatchOutcome {
    /// All outcomes in label order.
    pub const ALL: [MatchOutcome; 3] = [MatchOutcome::AwayWin, MatchOutcome::Draw, MatchOutcome::HomeWin];

    pub fn from_scores(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => MatchOutcome::HomeWin,
            std::cmp::Ordering::Less => MatchOutcome::AwayWin,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    pub fn label(&self) -> i8 {
        match self {
            MatchOutcome::AwayWin => -1,
            MatchOutcome::Draw => 0,
            MatchOutcome::HomeWin => 1,
        }
    }

    pub fn from_label(label: i8) -> Option<Self> {
        match label {
            -1 => Some(MatchOutcome::AwayWin),
            0 => Some(MatchOutcome::Draw),
            1 => Some(MatchOutcome::HomeWin),
            _ => None,
        }
    }

    /// Position in `ALL`, used to index probability and count arrays.
    pub fn index(&self) -> usize {
        match self {
            MatchOutcome::AwayWin => 0,
            MatchOutcome::Draw => 1,
            MatchOutcome::HomeWin => 2,
        }
    }
}

impl From<MatchOutcome> for i8 {
    fn from(outcome: MatchOutcome) -> Self {
        outcome.label()
    }
}

impl TryFrom<i8> for MatchOutcome {
    type Error = String;

    fn try_from(label: i8) -> Result<Self, Self::Error> {
        MatchOutcome::from_label(label).ok_or_else(|| format!("invalid outcome label: {label}"))
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::AwayWin => write!(f, "Away Win"),
            MatchOutcome::Draw => write!(f, "Draw"),
            MatchOutcome::HomeWin => write!(f, "Home Win"),
        }
    }
}

// ---------------------------------------------------------------------------
// Match event
// ---------------------------------------------------------------------------

/// One real match as reported by the provider. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "match_id", default)]
    pub match_id: String,
    #[serde(rename = "match_hometeam_id", default)]
    pub home_team_id: String,
    #[serde(rename = "match_awayteam_id", default)]
    pub away_team_id: String,
    #[serde(rename = "match_hometeam_name", default)]
    pub home_team_name: String,
    #[serde(rename = "match_awayteam_name", default)]
    pub away_team_name: String,
    #[serde(rename = "match_hometeam_score", default)]
    pub home_score: Score,
    #[serde(rename = "match_awayteam_score", default)]
    pub away_score: Score,
    #[serde(rename = "match_date", default)]
    pub date: String,
    #[serde(rename = "league_name", default)]
    pub league: String,
}

impl MatchEvent {
    /// Both team identifiers present.
    pub fn has_teams(&self) -> bool {
        !self.home_team_id.is_empty() && !self.away_team_id.is_empty()
    }

    /// Both scores known.
    pub fn scores(&self) -> Option<(u32, u32)> {
        Some((self.home_score.value()?, self.away_score.value()?))
    }

    /// Result of the match, if both scores are known.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.scores().map(|(h, a)| MatchOutcome::from_scores(h, a))
    }

    /// Which side `team_id` played on, if any.
    pub fn side_of(&self, team_id: &str) -> Option<Side> {
        if team_id.is_empty() {
            None
        } else if self.home_team_id == team_id {
            Some(Side::Home)
        } else if self.away_team_id == team_id {
            Some(Side::Away)
        } else {
            None
        }
    }

    /// Whether this match was played between exactly `a` and `b`, in either orientation.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.home_team_id == a && self.away_team_id == b)
            || (self.home_team_id == b && self.away_team_id == a)
    }
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} - {} {} ({})",
            self.match_id,
            self.home_team_name,
            self.home_score,
            self.away_score,
            self.away_team_name,
            self.date,
        )
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// A team's rank in its league table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team_id: String,
    #[serde(default)]
    pub team_name: String,
    pub league_position: u32,
}

impl TeamStanding {
    /// Build from the provider's string position, falling back to
    /// `UNKNOWN_POSITION` when it is not a number.
    pub fn from_raw(team_id: impl Into<String>, team_name: impl Into<String>, position: &str) -> Self {
        let league_position = Score::parse(position).value().unwrap_or(UNKNOWN_POSITION);
        Self {
            team_id: team_id.into(),
            team_name: team_name.into(),
            league_position,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error ({source_name}): {message}")]
    Transport { source_name: String, message: String },

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("No trained model is loaded; run `matchcast train` first")]
    ModelUnavailable,

    #[error("Feature schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch { expected: Vec<String>, found: Vec<String> },

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Malformed CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

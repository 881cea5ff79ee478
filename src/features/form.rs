//! Recent-form calculation.
//!
//! Counts a team's wins, draws and losses over a window of its recent
//! matches. The window is whatever the provider returned; it is not
//! re-sorted or truncated here. Matches without both scores, or that the
//! team did not play in, are skipped.

use serde::{Deserialize, Serialize};

use crate::types::{MatchEvent, MatchOutcome, Side};

/// Win/draw/loss tally for one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl FormRecord {
    /// Matches that counted towards the tally.
    pub fn played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }
}

/// Full win/draw/loss form for `team_id` over `matches`.
pub fn calculate_form(matches: &[MatchEvent], team_id: &str) -> FormRecord {
    let mut form = FormRecord::default();

    for m in matches {
        let (Some(side), Some(outcome)) = (m.side_of(team_id), m.outcome()) else {
            continue;
        };
        match (side, outcome) {
            (_, MatchOutcome::Draw) => form.draws += 1,
            (Side::Home, MatchOutcome::HomeWin) | (Side::Away, MatchOutcome::AwayWin) => form.wins += 1,
            _ => form.losses += 1,
        }
    }

    form
}

/// Win-only form, the value carried in the feature vector.
pub fn win_count(matches: &[MatchEvent], team_id: &str) -> u32 {
    calculate_form(matches, team_id).wins
}

//! Head-to-head tally between two specific teams.

use serde::{Deserialize, Serialize};

use crate::types::{MatchEvent, MatchOutcome, Side};

/// Historical record between `first` and `second`, in the order the
/// calculator was asked about them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub first_wins: u32,
    pub second_wins: u32,
    pub draws: u32,
}

impl HeadToHead {
    /// Meetings with a known result.
    pub fn meetings(&self) -> u32 {
        self.first_wins + self.second_wins + self.draws
    }

    /// The same record seen from the other team.
    pub fn swapped(&self) -> Self {
        Self {
            first_wins: self.second_wins,
            second_wins: self.first_wins,
            draws: self.draws,
        }
    }
}

/// Scan `events` for meetings between `first` and `second` in either
/// orientation and tally wins per team. Meetings without both scores are
/// skipped.
pub fn head_to_head(events: &[MatchEvent], first: &str, second: &str) -> HeadToHead {
    let mut record = HeadToHead::default();
    if first.is_empty() || second.is_empty() || first == second {
        return record;
    }

    for ev in events.iter().filter(|ev| ev.is_between(first, second)) {
        let Some(outcome) = ev.outcome() else {
            continue;
        };
        let first_side = ev.side_of(first);
        match outcome {
            MatchOutcome::Draw => record.draws += 1,
            MatchOutcome::HomeWin if first_side == Some(Side::Home) => record.first_wins += 1,
            MatchOutcome::AwayWin if first_side == Some(Side::Away) => record.first_wins += 1,
            _ => record.second_wins += 1,
        }
    }

    record
}

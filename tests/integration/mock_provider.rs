//! Mock match data provider for integration testing.
//!
//! Serves a fixed set of events, standings and head-to-head records from
//! memory, counts every call, and can be told to fail all calls or only
//! specific monthly windows.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use matchcast::data::{FetchOutcome, HeadToHeadRecord, MatchDataProvider};
use matchcast::types::{MatchEvent, Score, TeamStanding};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub standings: usize,
    pub team_events: usize,
    pub events_between: usize,
    pub head_to_head: usize,
}

pub struct MockProvider {
    events: Vec<MatchEvent>,
    standings: Vec<TeamStanding>,
    head_to_head: Option<HeadToHeadRecord>,
    calls: Arc<Mutex<CallCounts>>,
    /// If set, every call fails with this cause.
    force_error: Arc<Mutex<Option<String>>>,
    /// Window start dates whose `get_events_between` call fails.
    failing_windows: Arc<Mutex<HashSet<NaiveDate>>>,
}

impl MockProvider {
    pub fn new(events: Vec<MatchEvent>, standings: Vec<TeamStanding>) -> Self {
        Self {
            events,
            standings,
            head_to_head: None,
            calls: Arc::new(Mutex::new(CallCounts::default())),
            force_error: Arc::new(Mutex::new(None)),
            failing_windows: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_head_to_head(mut self, record: HeadToHeadRecord) -> Self {
        self.head_to_head = Some(record);
        self
    }

    /// Force all subsequent calls to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn fail_window(&self, from: NaiveDate) {
        self.failing_windows.lock().unwrap().insert(from);
    }

    pub fn calls(&self) -> CallCounts {
        *self.calls.lock().unwrap()
    }

    fn forced(&self) -> Option<String> {
        self.force_error.lock().unwrap().clone()
    }
}

#[async_trait]
impl MatchDataProvider for MockProvider {
    async fn get_standings(&self, _league_id: &str) -> FetchOutcome<Vec<TeamStanding>> {
        self.calls.lock().unwrap().standings += 1;
        if let Some(err) = self.forced() {
            return FetchOutcome::Failed(err);
        }
        FetchOutcome::from_vec(self.standings.clone())
    }

    async fn get_team_events(&self, team_id: &str, limit: u32) -> FetchOutcome<Vec<MatchEvent>> {
        self.calls.lock().unwrap().team_events += 1;
        if let Some(err) = self.forced() {
            return FetchOutcome::Failed(err);
        }
        let mut played: Vec<MatchEvent> = self
            .events
            .iter()
            .filter(|e| e.side_of(team_id).is_some())
            .cloned()
            .collect();
        played.sort_by(|a, b| b.date.cmp(&a.date));
        played.truncate(limit as usize);
        FetchOutcome::from_vec(played)
    }

    async fn get_events_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        _league_id: &str,
    ) -> FetchOutcome<Vec<MatchEvent>> {
        self.calls.lock().unwrap().events_between += 1;
        if let Some(err) = self.forced() {
            return FetchOutcome::Failed(err);
        }
        if self.failing_windows.lock().unwrap().contains(&from) {
            return FetchOutcome::Failed(format!("HTTP 500 for window starting {from}"));
        }
        let in_window = self
            .events
            .iter()
            .filter(|e| {
                NaiveDate::parse_from_str(&e.date, "%Y-%m-%d")
                    .map(|d| d >= from && d <= to)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        FetchOutcome::from_vec(in_window)
    }

    async fn get_head_to_head(&self, _first: &str, _second: &str) -> FetchOutcome<HeadToHeadRecord> {
        self.calls.lock().unwrap().head_to_head += 1;
        if let Some(err) = self.forced() {
            return FetchOutcome::Failed(err);
        }
        match &self.head_to_head {
            Some(record) if !record.is_empty() => FetchOutcome::Data(record.clone()),
            _ => FetchOutcome::Empty,
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn event(id: &str, home: &str, away: &str, hs: &str, aws: &str, date: &str) -> MatchEvent {
    MatchEvent {
        match_id: id.to_string(),
        home_team_id: home.to_string(),
        away_team_id: away.to_string(),
        home_team_name: format!("Team {home}"),
        away_team_name: format!("Team {away}"),
        home_score: Score::parse(hs),
        away_score: Score::parse(aws),
        date: date.to_string(),
        league: "Premier League".to_string(),
    }
}

/// Six teams whose strength is their id. Every ordered pair meets once
/// between August and October: neighbours in strength draw 1-1, otherwise
/// the stronger side wins 2-0. Ten rows of each outcome.
pub fn season_events() -> Vec<MatchEvent> {
    let start = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();
    let mut events = Vec::new();
    let mut k = 0i64;
    for h in 1..=6i32 {
        for a in 1..=6i32 {
            if h == a {
                continue;
            }
            let (hs, aws) = if (h - a).abs() <= 1 {
                ("1", "1")
            } else if h > a {
                ("2", "0")
            } else {
                ("0", "2")
            };
            let date = start + chrono::Duration::days(k * 3);
            events.push(event(
                &format!("{}", 1000 + k),
                &h.to_string(),
                &a.to_string(),
                hs,
                aws,
                &date.format("%Y-%m-%d").to_string(),
            ));
            k += 1;
        }
    }
    events
}

/// Strongest team (id 6) top of the table.
pub fn season_standings() -> Vec<TeamStanding> {
    (1..=6)
        .map(|id| TeamStanding::from_raw(id.to_string(), format!("Team {id}"), &(7 - id).to_string()))
        .collect()
}

//! Season ingestion.
//!
//! Queries the provider one calendar month at a time across the configured
//! season and concatenates whatever comes back. A month that fails or
//! returns nothing contributes zero events; the pass carries on with the
//! next month and does not retry.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SeasonConfig;
use crate::data::{FetchOutcome, MatchDataProvider};
use crate::types::MatchEvent;

/// Per-window result of an ingestion pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub events: usize,
    pub failed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub total_events: usize,
    pub windows: Vec<WindowReport>,
}

impl IngestReport {
    pub fn failed_windows(&self) -> usize {
        self.windows.iter().filter(|w| w.failed).count()
    }

    pub fn empty_windows(&self) -> usize {
        self.windows.iter().filter(|w| !w.failed && w.events == 0).count()
    }
}

/// Split `start..=end` into calendar-month windows, both ends inclusive.
/// The first and last windows are clipped to the season bounds.
pub fn month_windows(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let next_month = if cursor.month() == 12 {
            NaiveDate::from_ymd_opt(cursor.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(cursor.year(), cursor.month() + 1, 1)
        };
        let Some(next_month) = next_month else {
            windows.push((cursor, end));
            break;
        };
        let month_end = next_month - ChronoDuration::days(1);
        windows.push((cursor, month_end.min(end)));
        cursor = next_month;
    }
    windows
}

/// Fetch every event of the season. Each monthly query is followed by
/// `delay`, including the last one.
pub async fn ingest_season(
    provider: &dyn MatchDataProvider,
    season: &SeasonConfig,
    delay: Duration,
) -> (Vec<MatchEvent>, IngestReport) {
    let windows = month_windows(season.start, season.end);
    info!(
        league_id = %season.league_id,
        start = %season.start,
        end = %season.end,
        windows = windows.len(),
        "Starting season ingestion"
    );

    let mut events = Vec::new();
    let mut report = IngestReport::default();

    for (from, to) in windows {
        let outcome = provider.get_events_between(from, to, &season.league_id).await;
        tokio::time::sleep(delay).await;

        let (batch, failed) = match outcome {
            FetchOutcome::Data(batch) => (batch, false),
            FetchOutcome::Empty => {
                debug!(%from, %to, "No events in window");
                (Vec::new(), false)
            }
            FetchOutcome::Failed(cause) => {
                warn!(%from, %to, cause = %cause, "Window query failed; skipping month");
                (Vec::new(), true)
            }
        };
        info!(%from, %to, events = batch.len(), "Fetched window");
        report.windows.push(WindowReport {
            from,
            to,
            events: batch.len(),
            failed,
        });
        events.extend(batch);
    }

    report.total_events = events.len();
    info!(
        total_events = report.total_events,
        failed_windows = report.failed_windows(),
        empty_windows = report.empty_windows(),
        "Season ingestion complete"
    );
    (events, report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

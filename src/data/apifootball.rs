//! API-Football match data provider.
//!
//! API: `https://apiv3.apifootball.com/?action=...&APIkey=...`
//! Auth: `APIkey` query parameter.
//!
//! Every endpoint answers with either a JSON array of records or an
//! error object such as `{"error": 404, "message": "No event found"}`.
//! A 404 error object means "nothing matched" and maps to `Empty`; any
//! other error object, non-2xx status or undecodable body maps to
//! `Failed`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{FetchOutcome, HeadToHeadRecord, MatchDataProvider};
use crate::config::ProviderConfig;
use crate::types::{MatchEvent, TeamStanding};

const SOURCE_NAME: &str = "apifootball";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// One row of `get_standings`. Positions arrive as strings.
#[derive(Debug, Deserialize)]
struct StandingRow {
    #[serde(default)]
    team_id: String,
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    overall_league_position: Value,
}

impl From<StandingRow> for TeamStanding {
    fn from(row: StandingRow) -> Self {
        let position = match &row.overall_league_position {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        TeamStanding::from_raw(row.team_id, row.team_name, &position)
    }
}

// ---------------------------------------------------------------------------
// Payload interpretation
// ---------------------------------------------------------------------------

/// Interpret a provider error object. `None` if `value` isn't one.
fn error_object<T>(value: &Value) -> Option<FetchOutcome<T>> {
    let obj = value.as_object()?;
    let code = obj.get("error")?;
    let message = obj
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message");
    if code.as_i64() == Some(404) || code.as_str() == Some("404") {
        Some(FetchOutcome::Empty)
    } else {
        Some(FetchOutcome::Failed(format!("provider error {code}: {message}")))
    }
}

/// Decode an array payload into records.
pub fn parse_records<T: DeserializeOwned>(value: Value) -> FetchOutcome<Vec<T>> {
    if let Some(outcome) = error_object(&value) {
        return outcome;
    }
    if !value.is_array() {
        return FetchOutcome::Empty;
    }
    match serde_json::from_value::<Vec<T>>(value) {
        Ok(items) => FetchOutcome::from_vec(items),
        Err(e) => FetchOutcome::Failed(format!("malformed payload: {e}")),
    }
}

/// Decode a `get_standings` payload.
pub fn parse_standings(value: Value) -> FetchOutcome<Vec<TeamStanding>> {
    parse_records::<StandingRow>(value).map(|rows| rows.into_iter().map(TeamStanding::from).collect())
}

/// Decode a `get_H2H` payload.
pub fn parse_head_to_head(value: Value) -> FetchOutcome<HeadToHeadRecord> {
    if let Some(outcome) = error_object(&value) {
        return outcome;
    }
    if !value.is_object() {
        return FetchOutcome::Empty;
    }
    match serde_json::from_value::<HeadToHeadRecord>(value) {
        Ok(record) if record.is_empty() => FetchOutcome::Empty,
        Ok(record) => FetchOutcome::Data(record),
        Err(e) => FetchOutcome::Failed(format!("malformed payload: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// API-Football HTTP client.
pub struct ApiFootballClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl ApiFootballClient {
    pub fn new(config: &ProviderConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent("MATCHCAST/0.1.0")
            .build()
            .context("Failed to build HTTP client for API-Football")?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    fn url(&self, action: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}?action={action}", self.base_url);
        for (key, value) in params {
            url.push_str(&format!("&{key}={}", urlencoding::encode(value)));
        }
        url.push_str(&format!("&APIkey={}", urlencoding::encode(self.api_key.expose_secret())));
        url
    }

    /// Issue one GET and decode the body as JSON. The URL carries the key,
    /// so only the action is logged.
    async fn get_json(&self, action: &str, params: &[(&str, &str)]) -> std::result::Result<Value, String> {
        debug!(source = SOURCE_NAME, action, ?params, "Provider request");

        let resp = self
            .http
            .get(self.url(action, params))
            .send()
            .await
            .map_err(|e| format!("{action} request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("{action} returned HTTP {}", resp.status()));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| format!("{action} returned undecodable body: {e}"))
    }

    async fn fetch<T>(
        &self,
        action: &str,
        params: &[(&str, &str)],
        parse: impl FnOnce(Value) -> FetchOutcome<T>,
    ) -> FetchOutcome<T> {
        let outcome = match self.get_json(action, params).await {
            Ok(value) => parse(value),
            Err(cause) => FetchOutcome::Failed(cause),
        };
        if let FetchOutcome::Failed(cause) = &outcome {
            warn!(source = SOURCE_NAME, action, cause = %cause, "Provider query failed");
        }
        outcome
    }
}

#[async_trait]
impl MatchDataProvider for ApiFootballClient {
    async fn get_standings(&self, league_id: &str) -> FetchOutcome<Vec<TeamStanding>> {
        self.fetch("get_standings", &[("league_id", league_id)], parse_standings)
            .await
    }

    async fn get_team_events(&self, team_id: &str, limit: u32) -> FetchOutcome<Vec<MatchEvent>> {
        let limit = limit.to_string();
        self.fetch(
            "get_events",
            &[("team_id", team_id), ("limit", &limit)],
            parse_records::<MatchEvent>,
        )
        .await
    }

    async fn get_events_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        league_id: &str,
    ) -> FetchOutcome<Vec<MatchEvent>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        self.fetch(
            "get_events",
            &[("from", &from), ("to", &to), ("league_id", league_id)],
            parse_records::<MatchEvent>,
        )
        .await
    }

    async fn get_head_to_head(&self, first: &str, second: &str) -> FetchOutcome<HeadToHeadRecord> {
        self.fetch(
            "get_H2H",
            &[("firstTeam", first), ("secondTeam", second)],
            parse_head_to_head,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

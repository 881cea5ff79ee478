//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The provider API key is referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub season: SeasonConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub serving: ServingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apiv3.apifootball.com/".to_string(),
            api_key_env: "API_FOOTBALL_KEY".to_string(),
            timeout_secs: 15,
        }
    }
}

/// The historical window ingested for training.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SeasonConfig {
    pub league_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for SeasonConfig {
    /// Premier League 2023/24.
    fn default() -> Self {
        Self {
            league_id: "152".to_string(),
            start: NaiveDate::from_ymd_opt(2023, 8, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap_or(NaiveDate::MIN),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// Recent matches fetched per team for form.
    pub form_window: u32,
    /// Pause after each monthly ingestion query.
    pub ingest_delay_ms: u64,
    /// Pause after each per-team recent-match query.
    pub request_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            form_window: 10,
            ingest_delay_ms: 1000,
            request_delay_ms: 500,
        }
    }
}

impl PipelineConfig {
    pub fn ingest_delay(&self) -> Duration {
        Duration::from_millis(self.ingest_delay_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
    pub test_fraction: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
            test_fraction: 0.2,
        }
    }
}

/// How head-to-head features are filled in at inference time.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeadToHeadMode {
    /// Head-to-head features are zero at serving time.
    #[default]
    Placeholder,
    /// Query the provider's head-to-head record and tally it the same way training does.
    Lookup,
}

/// How free-text team names are turned into team identifiers.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    /// Lowercased, whitespace-collapsed name.
    #[default]
    Synthetic,
    /// Name/id directory built from the event snapshot.
    Directory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServingConfig {
    pub head_to_head: HeadToHeadMode,
    pub team_resolver: ResolverKind,
    pub form_window: u32,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            head_to_head: HeadToHeadMode::Placeholder,
            team_resolver: ResolverKind::Synthetic,
            form_window: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub events: PathBuf,
    pub features: PathBuf,
    pub model: PathBuf,
    pub metadata: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            events: PathBuf::from("data/raw_events.json"),
            features: PathBuf::from("data/features.csv"),
            model: PathBuf::from("models/predictor.json"),
            metadata: PathBuf::from("models/feature_info.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        anyhow::ensure!(
            config.season.start <= config.season.end,
            "season start {} is after season end {}",
            config.season.start,
            config.season.end
        );
        anyhow::ensure!(
            config.training.test_fraction > 0.0 && config.training.test_fraction < 1.0,
            "training.test_fraction must be between 0 and 1"
        );
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The provider API key, wrapped so it never lands in logs.
    pub fn api_key(&self) -> Result<SecretString> {
        let key = Self::resolve_env(&self.provider.api_key_env)?;
        Ok(SecretString::new(key.trim().to_string()))
    }
}

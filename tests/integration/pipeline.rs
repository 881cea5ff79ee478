//! Ingestion, feature assembly and training, end to end.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;

use matchcast::config::{SeasonConfig, TrainingConfig};
use matchcast::engine::ingest::ingest_season;
use matchcast::features::assembler::{AssemblyConfig, FeatureAssembler};
use matchcast::features::standings::StandingsCache;
use matchcast::model::dataset::Dataset;
use matchcast::model::trainer::Trainer;
use matchcast::model::ModelArtifact;
use matchcast::storage;
use matchcast::types::{MatchOutcome, PipelineError, TeamStanding, UNKNOWN_POSITION};

use crate::mock_provider::{event, season_events, season_standings, MockProvider};

fn assembly_config() -> AssemblyConfig {
    AssemblyConfig {
        league_id: "152".into(),
        form_window: 10,
        request_delay: Duration::ZERO,
    }
}

fn season() -> SeasonConfig {
    SeasonConfig {
        league_id: "152".into(),
        start: NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2023, 10, 31).unwrap(),
    }
}

fn temp_dir() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("matchcast_it_{}", uuid::Uuid::new_v4()));
    p
}

fn training() -> TrainingConfig {
    TrainingConfig {
        n_estimators: 20,
        ..TrainingConfig::default()
    }
}

#[tokio::test]
async fn test_duplicate_event_yields_one_row() {
    let events = vec![
        event("1", "A", "B", "2", "1", "2023-08-12"),
        event("1", "A", "B", "2", "1", "2023-08-12"),
    ];
    let provider = MockProvider::new(events.clone(), Vec::new());
    let standings = StandingsCache::new();
    let assembler = FeatureAssembler::new(&provider, &standings, assembly_config());

    let (rows, report) = assembler.assemble(&events).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].result, Some(MatchOutcome::HomeWin));
    assert_eq!(rows[0].result.map(|r| r.label()), Some(1));
    assert_eq!(report.duplicates, 1);
    // Two recent-match queries for the one fixture.
    assert_eq!(provider.calls().team_events, 2);
}

#[tokio::test]
async fn test_row_count_equals_distinct_valid_ids() {
    let mut events = season_events();
    events.push(events[0].clone());
    events.push(events[5].clone());
    events.push(event("bad-1", "1", "", "1", "0", "2023-09-01"));
    events.push(event("bad-2", "1", "2", "?", "0", "2023-09-01"));

    let provider = MockProvider::new(events.clone(), season_standings());
    let standings = StandingsCache::new();
    let assembler = FeatureAssembler::new(&provider, &standings, assembly_config());

    let (rows, report) = assembler.assemble(&events).await;
    assert_eq!(rows.len(), 30);
    assert_eq!(report.duplicates, 2);
    assert_eq!(report.integrity_skips, 2);
    assert_eq!(report.standings_teams, 6);
    assert_eq!(provider.calls().standings, 1);

    // First fixture is team 1 at home to team 2.
    assert_eq!(rows[0].home_id, "1");
    assert_eq!(rows[0].standing_home, 6);
    assert_eq!(rows[0].standing_away, 5);
}

#[tokio::test]
async fn test_alphanumeric_provider_ids_keep_their_features() {
    let events = vec![
        event("1", "ARS", "CHE", "2", "1", "2023-08-12"),
        event("2", "ARS", "CHE", "1", "0", "2023-09-02"),
        event("3", "CHE", "ARS", "1", "1", "2023-10-01"),
    ];
    let standings = vec![
        TeamStanding::from_raw("ARS", "Arsenal", "2"),
        TeamStanding::from_raw("CHE", "Chelsea", "5"),
    ];
    let provider = MockProvider::new(events.clone(), standings);
    let cache = StandingsCache::new();
    let assembler = FeatureAssembler::new(&provider, &cache, assembly_config());

    let (rows, _) = assembler.assemble(&events).await;
    assert_eq!(rows.len(), 3);
    let first = &rows[0];
    assert_eq!((first.home_id.as_str(), first.away_id.as_str()), ("ARS", "CHE"));
    assert_eq!((first.standing_home, first.standing_away), (2, 5));
    assert_eq!((first.form_home, first.form_away), (2, 0));
    assert_eq!((first.h2h_home_wins, first.h2h_away_wins), (2, 0));
}

#[tokio::test]
async fn test_provider_down_degrades_to_sentinels() {
    let events = vec![event("7", "10", "20", "0", "0", "2023-08-20")];
    let provider = MockProvider::new(events.clone(), season_standings());
    provider.set_error("connection refused");

    let standings = StandingsCache::new();
    let assembler = FeatureAssembler::new(&provider, &standings, assembly_config());
    let (rows, report) = assembler.assemble(&events).await;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].form_home, 0);
    assert_eq!(rows[0].standing_home, UNKNOWN_POSITION);
    assert_eq!(rows[0].result, Some(MatchOutcome::Draw));
    assert_eq!(report.failed_windows, 2);
    assert_eq!(report.standings_teams, 0);

    // The failed standings fetch is retried once the provider is back.
    provider.clear_error();
    let (rows, _) = assembler.assemble(&events).await;
    assert_eq!(provider.calls().standings, 2);
    assert_eq!(rows[0].standing_home, UNKNOWN_POSITION);
    assert_eq!(standings.len(), 6);
}

#[tokio::test]
async fn test_ingest_skips_failed_month() {
    let provider = MockProvider::new(season_events(), Vec::new());
    provider.fail_window(NaiveDate::from_ymd_opt(2023, 9, 1).unwrap());

    let (events, report) = ingest_season(&provider, &season(), Duration::ZERO).await;
    assert_eq!(report.windows.len(), 3);
    assert_eq!(report.failed_windows(), 1);
    assert_eq!(provider.calls().events_between, 3);
    assert!(events.iter().all(|e| !e.date.starts_with("2023-09")));
    assert_eq!(events.len(), report.total_events);
    assert!(!events.is_empty());
}

#[tokio::test]
async fn test_full_pipeline_round_trip() {
    let dir = temp_dir();
    let events_path = dir.join("raw_events.json");
    let features_path = dir.join("features.csv");
    let model_path = dir.join("predictor.json");
    let metadata_path = dir.join("feature_info.json");

    // Ingest and persist.
    let provider = MockProvider::new(season_events(), season_standings());
    let (events, report) = ingest_season(&provider, &season(), Duration::ZERO).await;
    assert_eq!(report.total_events, 30);
    storage::save_events(&events_path, &events).unwrap();

    // Features from the stored snapshot.
    let stored = storage::load_events(&events_path).unwrap();
    assert_eq!(stored, events);
    let standings = StandingsCache::new();
    let assembler = FeatureAssembler::new(&provider, &standings, assembly_config());
    let (rows, _) = assembler.assemble(&stored).await;
    Dataset::new(rows).save_csv(&features_path).unwrap();

    // Train from the stored dataset.
    let dataset = Dataset::load_csv(&features_path).unwrap();
    assert_eq!(dataset.len(), 30);
    assert_eq!(dataset.class_counts(), [10, 10, 10]);
    let artifact = Trainer::new(training())
        .train_and_save(&dataset, &model_path, &metadata_path)
        .unwrap();
    assert_eq!(artifact.metadata.test_rows, 6);

    // A reloaded artifact scores training rows exactly as before.
    let loaded = ModelArtifact::load(&model_path, &metadata_path).unwrap();
    for row in dataset.rows() {
        assert_eq!(loaded.predict(row).unwrap(), artifact.predict(row).unwrap());
    }

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_training_rejects_tiny_dataset_without_overwriting() {
    let dir = temp_dir();
    let model_path = dir.join("predictor.json");
    let metadata_path = dir.join("feature_info.json");

    let tiny = Dataset::from_csv(
        "home_id,away_id,form_home,form_away,standing_home,standing_away,h2h_home_wins,h2h_away_wins,result\n\
         a,b,3,0,1,20,0,0,1\n\
         b,a,0,3,20,1,0,0,-1\n",
    )
    .unwrap();
    let err = Trainer::new(training())
        .train_and_save(&tiny, &model_path, &metadata_path)
        .unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData(_)));
    assert!(!model_path.exists());
    assert!(!metadata_path.exists());
}

#[test]
fn test_missing_snapshot_is_not_found() {
    let err = storage::load_events(&temp_dir().join("raw_events.json")).unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
    assert!(err.to_string().contains("ingest"));
}

//! Serving-time behaviour: artifact loading, parity modes and the
//! front-end service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use matchcast::config::{HeadToHeadMode, ServingConfig, TrainingConfig};
use matchcast::data::{HeadToHeadRecord, MatchDataProvider};
use matchcast::engine::inference::InferenceEngine;
use matchcast::engine::service::PredictionService;
use matchcast::features::assembler::{AssemblyConfig, FeatureAssembler};
use matchcast::features::resolver::{DirectoryResolver, SyntheticResolver, TeamResolver};
use matchcast::features::standings::StandingsCache;
use matchcast::model::dataset::Dataset;
use matchcast::model::trainer::Trainer;
use matchcast::model::ModelArtifact;
use matchcast::storage;
use matchcast::types::PipelineError;

use crate::mock_provider::{event, season_events, season_standings, MockProvider};

struct Paths {
    dir: PathBuf,
    model: PathBuf,
    metadata: PathBuf,
}

impl Paths {
    fn new() -> Self {
        let mut dir = std::env::temp_dir();
        dir.push(format!("matchcast_serve_{}", uuid::Uuid::new_v4()));
        Self {
            model: dir.join("predictor.json"),
            metadata: dir.join("feature_info.json"),
            dir,
        }
    }
}

impl Drop for Paths {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

async fn trained_artifact(paths: &Paths) -> ModelArtifact {
    let events = season_events();
    let provider = MockProvider::new(events.clone(), season_standings());
    let standings = StandingsCache::new();
    let config = AssemblyConfig {
        league_id: "152".into(),
        form_window: 10,
        request_delay: Duration::ZERO,
    };
    let (rows, _) = FeatureAssembler::new(&provider, &standings, config)
        .assemble(&events)
        .await;
    let training = TrainingConfig {
        n_estimators: 20,
        ..TrainingConfig::default()
    };
    Trainer::new(training)
        .train_and_save(&Dataset::new(rows), &paths.model, &paths.metadata)
        .unwrap()
}

fn engine(
    provider: Arc<dyn MatchDataProvider>,
    resolver: Arc<dyn TeamResolver>,
    head_to_head: HeadToHeadMode,
) -> InferenceEngine {
    InferenceEngine::new(
        provider,
        Arc::new(StandingsCache::new()),
        resolver,
        "152",
        ServingConfig {
            head_to_head,
            ..ServingConfig::default()
        },
    )
}

#[tokio::test]
async fn test_loaded_model_serves_predictions() {
    let paths = Paths::new();
    let artifact = trained_artifact(&paths).await;

    let provider = Arc::new(MockProvider::new(season_events(), season_standings()));
    let mut engine = engine(provider.clone(), Arc::new(SyntheticResolver), HeadToHeadMode::Placeholder);
    engine.load_artifact(&paths.model, &paths.metadata).unwrap();

    let row = engine.build_features("6", "1").await;
    assert_eq!(row.standing_home, 1);
    assert_eq!(row.standing_away, 6);
    assert_eq!((row.h2h_home_wins, row.h2h_away_wins), (0, 0));

    let prediction = engine.predict("6", "1").await.unwrap();
    assert_eq!(prediction, artifact.predict(&row).unwrap());
    let p = prediction.probabilities;
    assert!((p.home_win + p.draw + p.away_win - 1.0).abs() < 1e-9);
    assert_eq!(p.get(prediction.outcome), [p.away_win, p.draw, p.home_win].into_iter().fold(0.0, f64::max));

    // Standings fetched once across both calls.
    assert_eq!(provider.calls().standings, 1);
}

#[tokio::test]
async fn test_missing_model_reported_not_raised() {
    let paths = Paths::new();
    let provider: Arc<dyn MatchDataProvider> = Arc::new(MockProvider::new(Vec::new(), Vec::new()));
    let mut engine = engine(provider.clone(), Arc::new(SyntheticResolver), HeadToHeadMode::Placeholder);

    let err = engine.load_artifact(&paths.model, &paths.metadata).unwrap_err();
    assert!(matches!(err, PipelineError::ModelUnavailable));
    assert!(matches!(
        engine.predict("Arsenal", "Chelsea").await,
        Err(PipelineError::ModelUnavailable)
    ));

    let service = PredictionService::new(engine, provider);
    let message = service.predict_match("Arsenal", "Chelsea").await.unwrap_err();
    assert!(message.contains("matchcast train"));
}

#[tokio::test]
async fn test_reordered_schema_rejected() {
    let paths = Paths::new();
    trained_artifact(&paths).await;

    let mut metadata: serde_json::Value = storage::load_json(&paths.metadata).unwrap();
    let columns = metadata["feature_columns"].as_array_mut().unwrap();
    columns.swap(2, 3);
    storage::save_json(&paths.metadata, &metadata).unwrap();

    let provider = Arc::new(MockProvider::new(season_events(), season_standings()));
    let mut engine = engine(provider, Arc::new(SyntheticResolver), HeadToHeadMode::Placeholder);
    let err = engine.load_artifact(&paths.model, &paths.metadata).unwrap_err();
    match err {
        PipelineError::SchemaMismatch { expected, found } => {
            assert_eq!(expected[2], "standing_home");
            assert_eq!(found[2], "standing_away");
        }
        other => panic!("expected schema mismatch, got {other}"),
    }
    assert!(!engine.has_artifact());
}

#[tokio::test]
async fn test_lookup_mode_uses_head_to_head_record() {
    let record = HeadToHeadRecord {
        meetings: vec![
            event("1", "6", "1", "3", "0", "2023-04-01"),
            event("2", "1", "6", "0", "1", "2022-11-12"),
            event("3", "6", "1", "2", "2", "2022-03-05"),
        ],
        ..Default::default()
    };
    let provider = Arc::new(MockProvider::new(season_events(), season_standings()).with_head_to_head(record));

    let placeholder = engine(provider.clone(), Arc::new(SyntheticResolver), HeadToHeadMode::Placeholder);
    let row = placeholder.build_features("6", "1").await;
    assert_eq!((row.h2h_home_wins, row.h2h_away_wins), (0, 0));
    assert_eq!(provider.calls().head_to_head, 0);

    let lookup = engine(provider.clone(), Arc::new(SyntheticResolver), HeadToHeadMode::Lookup);
    let row = lookup.build_features("6", "1").await;
    assert_eq!((row.h2h_home_wins, row.h2h_away_wins), (2, 0));
    assert_eq!(provider.calls().head_to_head, 1);
}

#[tokio::test]
async fn test_directory_resolver_maps_names_to_provider_ids() {
    let events = season_events();
    let resolver = Arc::new(DirectoryResolver::from_events(&events));
    let provider = Arc::new(MockProvider::new(events, season_standings()));
    let engine = engine(provider, resolver, HeadToHeadMode::Placeholder);

    let row = engine.build_features("  team 6 ", "Team 1").await;
    assert_eq!(row.home_id, "6");
    assert_eq!(row.away_id, "1");
    assert_eq!(row.standing_home, 1);
    assert!(row.form_home > 0);

    // Unknown names fall back to the synthetic id.
    let row = engine.build_features("Nowhere FC", "Team 1").await;
    assert_eq!(row.home_id, "nowhere fc");
    assert_eq!(row.form_home, 0);
}

#[tokio::test]
async fn test_service_latest_result() {
    let record = HeadToHeadRecord {
        first_recent: vec![event("9", "6", "3", "4", "1", "2024-02-03")],
        ..Default::default()
    };
    let provider: Arc<dyn MatchDataProvider> =
        Arc::new(MockProvider::new(Vec::new(), Vec::new()).with_head_to_head(record));
    let service = PredictionService::new(
        engine(provider.clone(), Arc::new(SyntheticResolver), HeadToHeadMode::Placeholder),
        provider,
    );

    let text = service.latest_result("Team 6", "Team 3").await.unwrap();
    assert!(text.starts_with("**Team 6 vs Team 3**"));
    assert!(text.contains("Score: 4 - 1"));
    assert!(text.ends_with("Result: Team 6 won"));
}

//! MATCHCAST: football match outcome prediction.
//!
//! Entry point. Loads configuration and logging, then runs one pipeline
//! stage (or all of them) against the API-Football provider.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};

use matchcast::config::{AppConfig, ResolverKind};
use matchcast::data::apifootball::ApiFootballClient;
use matchcast::data::MatchDataProvider;
use matchcast::engine::inference::InferenceEngine;
use matchcast::engine::ingest::ingest_season;
use matchcast::engine::service::PredictionService;
use matchcast::features::assembler::{AssemblyConfig, FeatureAssembler};
use matchcast::features::resolver::{DirectoryResolver, SyntheticResolver, TeamResolver};
use matchcast::features::standings::StandingsCache;
use matchcast::model::dataset::Dataset;
use matchcast::model::trainer::Trainer;
use matchcast::storage;
use matchcast::types::{MatchEvent, PipelineError};

#[derive(Parser)]
#[command(name = "matchcast")]
#[command(about = "Football match outcome feature pipeline and predictor", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the configured season month by month and save the event snapshot
    Ingest,
    /// Build the feature dataset from the event snapshot
    Features,
    /// Train the outcome model from the feature dataset
    Train,
    /// Ingest, build features and train, stopping at the first failure
    Pipeline,
    /// Predict the outcome of a fixture
    Predict {
        /// Home team name
        #[arg(long)]
        home: String,
        /// Away team name
        #[arg(long)]
        away: String,
    },
    /// Show the latest result between two teams
    Result {
        #[arg(long)]
        team1: String,
        #[arg(long)]
        team2: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;
    init_logging();

    info!(
        league_id = %cfg.season.league_id,
        season_start = %cfg.season.start,
        season_end = %cfg.season.end,
        "MATCHCAST starting"
    );

    let outcome = match cli.command {
        Commands::Ingest => run_ingest(&cfg, &*provider(&cfg)?).await,
        Commands::Features => run_features(&cfg, &*provider(&cfg)?).await,
        Commands::Train => run_train(&cfg),
        Commands::Pipeline => run_pipeline(&cfg).await,
        Commands::Predict { home, away } => run_predict(&cfg, &home, &away).await,
        Commands::Result { team1, team2 } => run_result(&cfg, &team1, &team2).await,
    };

    if let Err(e) = &outcome {
        error!(error = %e, "Command failed");
    }
    outcome
}

fn provider(cfg: &AppConfig) -> Result<Arc<dyn MatchDataProvider>> {
    let client = ApiFootballClient::new(&cfg.provider, cfg.api_key()?)?;
    Ok(Arc::new(client))
}

fn build_resolver(kind: ResolverKind, events: &[MatchEvent]) -> Arc<dyn TeamResolver> {
    match kind {
        ResolverKind::Synthetic => Arc::new(SyntheticResolver),
        ResolverKind::Directory => Arc::new(DirectoryResolver::from_events(events)),
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

async fn run_ingest(cfg: &AppConfig, provider: &dyn MatchDataProvider) -> Result<()> {
    let (events, report) = ingest_season(provider, &cfg.season, cfg.pipeline.ingest_delay()).await;
    storage::save_events(&cfg.paths.events, &events)?;
    println!(
        "Ingested {} events over {} months ({} failed, {} empty) -> {}",
        report.total_events,
        report.windows.len(),
        report.failed_windows(),
        report.empty_windows(),
        cfg.paths.events.display()
    );
    Ok(())
}

async fn run_features(cfg: &AppConfig, provider: &dyn MatchDataProvider) -> Result<()> {
    let events = storage::load_events(&cfg.paths.events)?;
    let standings = StandingsCache::new();

    let assembler = FeatureAssembler::new(provider, &standings, AssemblyConfig::from_app(cfg));
    let (rows, report) = assembler.assemble(&events).await;

    let dataset = Dataset::new(rows);
    if dataset.is_empty() {
        warn!("No valid fixtures found; the feature file will be empty");
    }
    dataset.log_summary();
    dataset.save_csv(&cfg.paths.features)?;
    println!(
        "Built {} feature rows from {} events ({} duplicates, {} skipped) -> {}",
        report.rows_emitted,
        report.events_seen,
        report.duplicates,
        report.integrity_skips,
        cfg.paths.features.display()
    );
    Ok(())
}

fn run_train(cfg: &AppConfig) -> Result<()> {
    let dataset = Dataset::load_csv(&cfg.paths.features)?;
    let artifact = Trainer::new(cfg.training.clone()).train_and_save(
        &dataset,
        &cfg.paths.model,
        &cfg.paths.metadata,
    )?;

    println!("{}", artifact.metadata.evaluation);
    println!("\nFeature importance:");
    for (name, importance) in &artifact.metadata.feature_importances {
        println!("  {name:<15} {importance:.4}");
    }
    println!(
        "\nModel saved to {} (accuracy {:.3})",
        cfg.paths.model.display(),
        artifact.metadata.accuracy
    );
    Ok(())
}

async fn run_pipeline(cfg: &AppConfig) -> Result<()> {
    let provider = provider(cfg)?;
    info!("Step 1/3: ingesting season events");
    run_ingest(cfg, provider.as_ref()).await?;
    info!("Step 2/3: building features");
    run_features(cfg, provider.as_ref()).await?;
    info!("Step 3/3: training model");
    run_train(cfg)?;
    info!("Pipeline complete");
    Ok(())
}

fn prediction_service(cfg: &AppConfig) -> Result<PredictionService> {
    let provider = provider(cfg)?;

    let events = match cfg.serving.team_resolver {
        ResolverKind::Directory => match storage::load_events(&cfg.paths.events) {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "No event snapshot for the team directory; names fall back to synthetic ids");
                Vec::new()
            }
        },
        ResolverKind::Synthetic => Vec::new(),
    };

    let mut engine = InferenceEngine::new(
        provider.clone(),
        Arc::new(StandingsCache::new()),
        build_resolver(cfg.serving.team_resolver, &events),
        cfg.season.league_id.clone(),
        cfg.serving.clone(),
    );
    match engine.load_artifact(&cfg.paths.model, &cfg.paths.metadata) {
        Ok(()) => {}
        Err(PipelineError::ModelUnavailable) => warn!("No trained model found"),
        Err(e) => return Err(e.into()),
    }
    Ok(PredictionService::new(engine, provider))
}

async fn run_predict(cfg: &AppConfig, home: &str, away: &str) -> Result<()> {
    let service = prediction_service(cfg)?;
    match service.predict_match(home, away).await {
        Ok((label, p)) => {
            println!("{home} vs {away}: {label}");
            println!(
                "  Home Win {:>5.1}%\n  Draw     {:>5.1}%\n  Away Win {:>5.1}%",
                p.home_win * 100.0,
                p.draw * 100.0,
                p.away_win * 100.0
            );
            Ok(())
        }
        Err(message) => anyhow::bail!(message),
    }
}

async fn run_result(cfg: &AppConfig, team1: &str, team2: &str) -> Result<()> {
    let service = prediction_service(cfg)?;
    match service.latest_result(team1, team2).await {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(message) => anyhow::bail!(message),
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("matchcast=info"));

    let json_logging = std::env::var("MATCHCAST_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

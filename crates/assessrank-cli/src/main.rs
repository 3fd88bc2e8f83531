//! `assessrank` binary: serve the recommendation API, run one-off queries,
//! batch-predict a query file, evaluate recall, or export a prebuilt engine
//! state.

mod config;

use crate::config::AppConfig;
use assessrank_core::catalog::{load_catalog, load_training};
use assessrank_core::TrainingAssociation;
use assessrank_extract::build_extractor;
use assessrank_gateway::GatewayServer;
use assessrank_ranker::{
    load_queries, load_state, mean_recall_at_k, predict, save_predictions, save_state,
    HybridRanker,
};
use clap::{Parser, Subcommand};
use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "assessrank", about = "Hybrid assessment recommendation engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "assessrank.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Rank the catalog for one query and print JSON
    Recommend {
        query: String,
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,
        /// Include the per-signal score breakdown
        #[arg(long)]
        explain: bool,
    },
    /// Mean recall@K over labelled queries
    Evaluate {
        /// Labelled pairs (defaults to the configured training file)
        #[arg(long)]
        labels: Option<PathBuf>,
        #[arg(short = 'k', long, default_value_t = 10)]
        k: usize,
    },
    /// Rank every query in a file and write prediction CSVs
    Predict {
        /// CSV with a `Query` column, or a JSON array of queries
        #[arg(long)]
        queries: PathBuf,
        /// Directory for the prediction tables
        #[arg(short, long, default_value = "predicted_test_csv")]
        output: PathBuf,
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,
    },
    /// Build the indexes from scratch and write them to a state file
    Export {
        /// Output path (defaults to the configured state path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config).await?;
    config.apply_env_key(|var| std::env::var(var).ok());

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("assessrank listening on {}", listener.local_addr()?);

            // Listen immediately; /recommend answers 503 until the build lands.
            let slot = Arc::new(OnceCell::new());
            let server = axum::serve(listener, GatewayServer::build(slot.clone())).into_future();
            tokio::pin!(server);
            let init = tokio::spawn(async move {
                let ranker = open_engine(&config).await?;
                if slot.set(Arc::new(ranker)).is_err() {
                    warn!("Engine slot was already filled");
                }
                anyhow::Ok(())
            });

            tokio::select! {
                served = &mut server => served?,
                joined = init => {
                    if let Err(e) = joined.map_err(anyhow::Error::from).and_then(|r| r) {
                        error!(error = %e, "Engine initialization failed");
                        return Err(e.context("Engine initialization failed"));
                    }
                    info!("Engine ready");
                    server.await?;
                }
            }
        }
        Commands::Recommend {
            query,
            top_k,
            explain,
        } => {
            let ranker = open_engine(&config).await?;
            let output = if explain {
                serde_json::to_string_pretty(&ranker.explain(&query, top_k).await?)?
            } else {
                serde_json::to_string_pretty(&ranker.recommend(&query, top_k).await?)?
            };
            println!("{output}");
        }
        Commands::Evaluate { labels, k } => {
            let labels = match labels.or_else(|| config.data.training.clone()) {
                Some(path) => load_training(&path).await?,
                None => anyhow::bail!("no labels given and data.training is not configured"),
            };
            let ranker = open_engine(&config).await?;
            let report = mean_recall_at_k(&ranker, &labels, k).await?;
            info!(
                k,
                queries = report.queries.len(),
                mean_recall = report.mean_recall,
                "Evaluation finished"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Predict {
            queries,
            output,
            top_k,
        } => {
            let queries = load_queries(&queries).await?;
            let ranker = open_engine(&config).await?;
            let rows = predict(&ranker, &queries, top_k).await?;
            let files = save_predictions(&rows, &output).await?;
            info!(
                queries = queries.len(),
                rows = files.rows,
                detailed = %files.detailed.display(),
                submission = %files.submission.display(),
                "Predictions written"
            );
        }
        Commands::Export { output } => {
            let Some(path) = output.or_else(|| config.data.state.clone()) else {
                anyhow::bail!("no output given and data.state is not configured");
            };
            let ranker = build_fresh(&config).await?;
            save_state(&ranker.export_state(), &path).await?;
            info!(path = %path.display(), items = ranker.len(), "Engine state exported");
        }
    }

    Ok(())
}

async fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
    })?;
    AppConfig::from_toml(&text)
}

/// Restore from the configured state file when it exists, else build.
async fn open_engine(config: &AppConfig) -> anyhow::Result<HybridRanker> {
    if let Some(path) = &config.data.state {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            let state = load_state(path).await?;
            let ranker = HybridRanker::import_state(
                state,
                build_extractor(&config.extractor)?,
                config.embedding.provider()?,
                config.ranker.clone(),
            )?;
            return Ok(ranker);
        }
        info!(path = %path.display(), "No saved state yet, building indexes");
    }
    build_fresh(config).await
}

async fn build_fresh(config: &AppConfig) -> anyhow::Result<HybridRanker> {
    let catalog = load_catalog(&config.data.catalog).await?;
    let training: Vec<TrainingAssociation> = match &config.data.training {
        Some(path) => load_training(path).await?,
        None => Vec::new(),
    };

    let mut builder = HybridRanker::builder()
        .catalog(catalog)
        .training(training)
        .extractor(build_extractor(&config.extractor)?)
        .config(config.ranker.clone());
    if let Some(embedder) = config.embedding.provider()? {
        builder = builder.embedder(embedder);
    }
    Ok(builder.build().await?)
}

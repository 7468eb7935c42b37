use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use inference::SentimentInference;

mod config;
mod harvester;
mod output;
mod pipeline;
mod results;

use config::AppConfig;
use harvester::TweetHarvester;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run a single update and exit
    #[arg(long)]
    once: bool,

    /// Product to update with --once (random stored product when omitted)
    #[arg(long, requires = "once")]
    product: Option<String>,

    /// Classify posts from a CSV (`full_text` column) or a text file, one post per line
    #[arg(long, value_name = "FILE", conflicts_with_all = ["once", "train"])]
    classify: Option<PathBuf>,

    /// Train a classifier from the reference corpus and write its parameter bundle
    #[arg(long, conflicts_with = "once")]
    train: bool,

    /// Bundle path written by --train
    #[arg(long, default_value = "sentiment_model.safetensors")]
    output: PathBuf,

    /// Training epochs for --train
    #[arg(long, default_value = "5")]
    epochs: usize,

    /// Results file (overrides RESULTS_PATH)
    #[arg(long)]
    results: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env_or_default();
    if let Some(results) = args.results.clone() {
        config.results_path = results;
    }
    config.validate()?;

    info!("Starting ProdSwing sentiment orchestrator");
    info!("Results: {:?}", config.results_path);

    if args.train {
        info!("Mode: Training ({} epochs)", args.epochs);
        pipeline::train_model(&config, &args.output, args.epochs).await?;
        return Ok(());
    }

    let inference = Arc::new(SentimentInference::from_config(&config.inference).await?);
    let harvester = Arc::new(TweetHarvester::from_config(&config));
    let mut orchestrator = pipeline::PipelineOrchestrator::new(config, inference, harvester)?;

    if let Some(path) = args.classify {
        info!("Mode: Classify {:?}", path);
        orchestrator.classify_file(&path).await?;
    } else if args.once {
        info!("Mode: Single run");
        orchestrator.run_once(args.product).await?;
    } else {
        info!("Mode: Continuous");
        orchestrator.run_continuous().await?;
    }

    info!("Orchestrator completed successfully");
    Ok(())
}

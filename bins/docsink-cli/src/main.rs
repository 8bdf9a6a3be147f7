use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use docsink_core::{SinkTaskSpec, StoreSpec, ToleranceMode};
use docsink_io::{build_store, KafkaRecordSource, SinkTask};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(name = "docsink", about = "Upsert Kafka records into a document store")]
struct Args {
    /// Sink task YAML
    #[arg(short, long)]
    config: PathBuf,
    /// Print documents to stdout instead of writing them to the configured store
    #[arg(long)]
    dry_run: bool,
    /// Override the configured tolerance (none | all)
    #[arg(long)]
    tolerance: Option<ToleranceMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
    let args = Args::parse();

    let mut spec = SinkTaskSpec::from_path(&args.config)?;
    if let Some(tolerance) = args.tolerance {
        spec.tolerance = tolerance;
    }
    if args.dry_run {
        spec.store = StoreSpec::Stdout;
    }
    let config = spec.validate()?;
    let source_spec = spec
        .source
        .clone()
        .context("sink task config has no `source` section")?;

    let store = build_store(&spec.store)?;
    let mut task = SinkTask::start(config, store).await?;
    let source = KafkaRecordSource::new(source_spec)?;

    // Ctrl-C handling
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    let result = source.run(&mut task, cancel).await;
    task.stop().await?;
    result
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rule1::api::{RetryingSource, StatementSource, StockrowClient};
use rule1::concurrent_fetcher::{FetchProgress, Pipeline, TickerFetcher};
use rule1::models::{Config, Section};
use rule1::parser::XlsxParser;
use rule1::report::{build_rows, write_report_file};
use rule1::utils::{parse_tickers, unique_tickers};
use rule1::StatementCache;

/// Check health indicators for companies, based on Phil Town's Rule #1 investing
#[derive(Parser, Debug)]
#[command(name = "rule1", version)]
#[command(group(ArgGroup::new("source").required(true).args(["tickers", "input"])))]
struct Cli {
    /// Comma separated list of stock tickers
    #[arg(short, long)]
    tickers: Option<String>,

    /// Path to a file containing a comma separated list of stock tickers
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Path to the CSV report to write
    #[arg(short, long)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rule1=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let content = match (&cli.tickers, &cli.input) {
        (Some(tickers), _) => tickers.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ticker list from {}", path.display()))?,
        (None, None) => anyhow::bail!("Either --tickers or --input is required"),
    };
    let tickers = unique_tickers(&parse_tickers(&content)?);

    let config = Config::from_env();
    info!("📋 Cache directory: {}", config.cache_dir.display());

    let client = StockrowClient::new(&config)?;
    let source: Arc<dyn StatementSource> = Arc::new(RetryingSource::new(
        client,
        config.retry_attempts,
        Duration::from_secs(2),
    ));
    let cache = Arc::new(StatementCache::new(&config.cache_dir, Arc::new(XlsxParser)));

    let (progress_sender, progress_receiver) = broadcast::channel(256);
    let progress = spawn_progress_bar(progress_receiver, tickers.len() * Section::ALL.len());

    let fetcher = TickerFetcher::new(cache, source).with_progress(progress_sender);
    let pipeline = Pipeline::new(fetcher, config.max_concurrent_tickers);
    let report = pipeline.run(&tickers).await;

    // All senders are gone once the pipeline is dropped; the bar task then ends.
    drop(pipeline);
    progress.await.ok();

    for (ticker, e) in report.failed() {
        error!("{}: {} error: {}", ticker, e.kind(), e);
    }

    let rows = build_rows(&report);
    write_report_file(&cli.output, &rows)
        .with_context(|| format!("Failed to write report to {}", cli.output.display()))?;
    info!("✅ Wrote {} rows to {}", rows.len(), cli.output.display());

    Ok(())
}

fn spawn_progress_bar(
    mut receiver: broadcast::Receiver<FetchProgress>,
    total: usize,
) -> tokio::task::JoinHandle<()> {
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg:>8} [{bar:40}] {pos}/{len} sections") {
        bar.set_style(style);
    }

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(progress) => {
                    bar.set_message(progress.ticker);
                    bar.inc(1);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => bar.inc(skipped),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        bar.finish_and_clear();
    })
}

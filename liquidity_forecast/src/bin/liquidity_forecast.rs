//! Command-line forecast run: two input feeds in, one forecast CSV out.

use anyhow::Context;
use clap::Parser;
use liquidity_forecast::data::write_forecasts;
use liquidity_forecast::{ForecastConfig, LiquidityPipeline, MetadataTable, TransactionFeed};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "liquidity-forecast")]
#[command(about = "Forecast next-day buy and sell volume per bond")]
struct Args {
    /// Transaction feed (isin, side, date, volume, ...)
    #[arg(long)]
    transactions: PathBuf,

    /// Bond metadata feed
    #[arg(long)]
    metadata: PathBuf,

    /// Forecast file to write
    #[arg(long, default_value = "output_final.csv")]
    output: PathBuf,

    /// JSON configuration overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("liquidity_forecast=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ForecastConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ForecastConfig::default(),
    };

    let transactions = TransactionFeed::from_csv(&args.transactions)
        .with_context(|| format!("reading transactions {}", args.transactions.display()))?;
    let metadata = MetadataTable::from_csv(&args.metadata)
        .with_context(|| format!("reading metadata {}", args.metadata.display()))?;
    info!(
        records = transactions.len(),
        bonds = metadata.rows().len(),
        "Loaded input feeds"
    );

    let forecasts = LiquidityPipeline::new(config).run(&transactions, &metadata)?;

    write_forecasts(&args.output, &forecasts)
        .with_context(|| format!("writing forecasts {}", args.output.display()))?;
    info!("Wrote {} forecasts to {}", forecasts.len(), args.output.display());

    Ok(())
}

//! Fit a model structure on the clean series and write its parameter file

use anyhow::{Context, Result};
use clap::Parser;
use load_forecast::data::DataLoader;
use load_forecast::models::ModelVariant;
use load_forecast::params::{ArimaOrder, SeasonalOrder};
use load_forecast::train::{train, TrainConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Clean series produced by clean_extracts
    #[arg(long, default_value = "consommation_rte_clean.csv")]
    input: PathBuf,

    /// Model to train: sarimax or ar
    #[arg(long, default_value = "sarimax")]
    variant: ModelVariant,

    /// Non-seasonal order as p,d,q
    #[arg(long, value_delimiter = ',', num_args = 3)]
    order: Option<Vec<usize>>,

    /// Seasonal order as P,D,Q,S
    #[arg(long, value_delimiter = ',', num_args = 4)]
    seasonal_order: Option<Vec<usize>>,

    /// Lags of the plain autoregression
    #[arg(long)]
    lags: Option<usize>,

    /// Parameter file to write
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "load_forecast=info,train_model=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let series = DataLoader::from_csv(&cli.input)
        .with_context(|| format!("Failed to load {:?}", cli.input))?;

    let config = TrainConfig {
        variant: cli.variant,
        order: cli
            .order
            .map(|o| <[usize; 3]>::try_from(o.as_slice()))
            .transpose()
            .context("--order takes p,d,q")?
            .map(ArimaOrder::from),
        seasonal_order: cli
            .seasonal_order
            .map(|s| <[usize; 4]>::try_from(s.as_slice()))
            .transpose()
            .context("--seasonal-order takes P,D,Q,S")?
            .map(SeasonalOrder::from),
        lags: cli.lags,
        output: cli.output,
    };

    let outcome = train(&config, &series).context("Training failed")?;
    info!(
        model = %outcome.summary.model,
        output = %outcome.output.display(),
        "parameters written"
    );

    Ok(())
}

//! Clean every matching daily extract into one repaired series file

use anyhow::{bail, Context, Result};
use clap::Parser;
use load_series::persist::save_clean_series;
use load_series::{CleaningConfig, CleaningPipeline, SourceFile};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Glob selecting the extracts; matches are processed in sorted order
    #[arg(long, default_value = "conso_mix_RTE_*.csv")]
    pattern: String,

    /// Clean series destination
    #[arg(long, default_value = "consommation_rte_clean.csv")]
    output: PathBuf,

    /// JSON cleaning settings
    #[arg(long, env = "LOAD_CLEANING_CONFIG")]
    config: Option<PathBuf>,

    /// Leave Hour, DayOfWeek and IsWeekend out of the output
    #[arg(long)]
    no_calendar_columns: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "load_series=info,clean_extracts=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CleaningConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => CleaningConfig::default(),
    };
    if cli.no_calendar_columns {
        config.skip_calendar_columns = true;
    }

    let mut paths: Vec<PathBuf> = glob::glob(&cli.pattern)
        .with_context(|| format!("Invalid pattern '{}'", cli.pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "unreadable glob entry");
                None
            }
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        bail!("No file matches '{}'", cli.pattern);
    }
    info!(files = paths.len(), pattern = %cli.pattern, "selected extracts");

    let sources = paths
        .iter()
        .map(|path| SourceFile::read(path).with_context(|| format!("Failed to read {:?}", path)))
        .collect::<Result<Vec<_>>>()?;

    let pipeline = CleaningPipeline::new(config)?;
    let clean = pipeline.run(&sources)?;

    save_clean_series(
        &cli.output,
        &clean.points,
        !pipeline.config().skip_calendar_columns,
    )
    .with_context(|| format!("Failed to write {:?}", cli.output))?;

    let report = &clean.report;
    info!(
        rows = clean.points.len(),
        start = ?clean.points.first().map(|p| p.point.timestamp),
        end = ?clean.points.last().map(|p| p.point.timestamp),
        duplicates = report.duplicates_removed,
        outliers = report.repair.outliers_removed,
        residual_missing = report.repair.residual_missing.total(),
        output = %cli.output.display(),
        "clean series written"
    );

    Ok(())
}

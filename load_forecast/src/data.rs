//! Clean load series loading for training

use crate::error::{ForecastError, Result};
use chrono::NaiveDateTime;
use load_series::persist::DATETIME_FORMAT;
use load_series::SeriesPoint;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// Timestamped consumption values in chronological order
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSeries {
    timestamps: Vec<NaiveDateTime>,
    consumption: Vec<f64>,
}

impl LoadSeries {
    /// Build a series, sorting by timestamp
    pub fn new(mut rows: Vec<(NaiveDateTime, f64)>) -> Self {
        rows.sort_by_key(|(ts, _)| *ts);
        let (timestamps, consumption) = rows.into_iter().unzip();
        Self {
            timestamps,
            consumption,
        }
    }

    /// Consumption of points that have one
    pub fn from_points(points: &[SeriesPoint]) -> Self {
        Self::new(
            points
                .iter()
                .filter_map(|p| p.consumption.map(|c| (p.timestamp, c)))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.consumption.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumption.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn consumption(&self) -> &[f64] {
        &self.consumption
    }

    /// Observations per day implied by the smallest spacing
    pub fn points_per_day(&self) -> Option<usize> {
        let step = self
            .timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds())
            .filter(|s| *s > 0)
            .min()?;
        (86_400 % step == 0).then(|| (86_400 / step) as usize)
    }
}

/// Data loader for clean series files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a clean series CSV (`DateTime`, `Consommation`, ...)
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<LoadSeries> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        let series = Self::from_dataframe(&df)?;
        info!(path = %path.display(), rows = series.len(), "loaded training series");
        Ok(series)
    }

    /// Extract the time and consumption columns of a DataFrame
    ///
    /// Rows with a null value or an unreadable timestamp are dropped.
    pub fn from_dataframe(df: &DataFrame) -> Result<LoadSeries> {
        let time_column = Self::detect_time_column(df)?;
        let consumption_column = Self::detect_consumption_column(df)?;

        let times = df.column(&time_column)?.cast(&DataType::Utf8)?;
        let values = df.column(&consumption_column)?.cast(&DataType::Float64)?;

        let mut rows = Vec::with_capacity(df.height());
        let mut dropped = 0;
        for (time, value) in times.utf8()?.into_iter().zip(values.f64()?.into_iter()) {
            let parsed =
                time.and_then(|t| NaiveDateTime::parse_from_str(t.trim(), DATETIME_FORMAT).ok());
            match (parsed, value) {
                (Some(ts), Some(v)) if v.is_finite() => rows.push((ts, v)),
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(dropped, "dropped training rows without a timestamp or consumption");
        }
        if rows.is_empty() {
            return Err(ForecastError::EmptyAfterCleaning { dropped });
        }

        Ok(LoadSeries::new(rows))
    }

    /// Detect the time column in a DataFrame
    fn detect_time_column(df: &DataFrame) -> Result<String> {
        Self::find_column(df, &["datetime", "timestamp", "date", "time"]).ok_or_else(|| {
            ForecastError::Schema {
                column: "timestamp".to_string(),
                found: df.get_column_names().join(", "),
            }
        })
    }

    /// Detect the consumption column in a DataFrame
    fn detect_consumption_column(df: &DataFrame) -> Result<String> {
        Self::find_column(df, &["consommation", "consumption"]).ok_or_else(|| {
            ForecastError::Schema {
                column: "consumption".to_string(),
                found: df.get_column_names().join(", "),
            }
        })
    }

    /// First column whose lowercased name equals a candidate, in candidate order
    fn find_column(df: &DataFrame, candidates: &[&str]) -> Option<String> {
        let names = df.get_column_names();
        candidates.iter().find_map(|candidate| {
            names
                .iter()
                .find(|name| name.trim().to_lowercase() == *candidate)
                .map(|name| name.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_clean_series_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "DateTime,Consommation,PrevisionJ-1,PrevisionJ,Hour").unwrap();
        writeln!(file, "2023-01-01 00:15:00,51000.5,51200,51100,0").unwrap();
        writeln!(file, "2023-01-01 00:00:00,50000,50100,50050,0").unwrap();
        writeln!(file, "2023-01-01 00:30:00,,50100,50050,0").unwrap();
        writeln!(file, "2023-01-01 00:45:00,52000,52100,52050,0").unwrap();

        let series = DataLoader::from_csv(file.path()).unwrap();
        assert_eq!(series.consumption(), &[50000.0, 51000.5, 52000.0]);
        assert_eq!(series.points_per_day(), Some(96));
    }

    #[test]
    fn missing_consumption_column_is_a_schema_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "DateTime,PrevisionJ").unwrap();
        writeln!(file, "2023-01-01 00:00:00,1").unwrap();

        match DataLoader::from_csv(file.path()).unwrap_err() {
            ForecastError::Schema { column, .. } => assert_eq!(column, "consumption"),
            other => panic!("Expected Schema error, got {:?}", other),
        }
    }
}

//! Cleaning and repair settings

use crate::error::{Result, SeriesError};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Settings for the gap repair engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Grid cadence in minutes; must divide a day evenly
    pub interval_minutes: u32,
    /// Drop consumption outliers before resampling
    pub outlier_filter: bool,
    /// Lower percentile of the outlier band, in `[0, 1]`
    pub lower_percentile: f64,
    /// Upper percentile of the outlier band, in `[0, 1]`
    pub upper_percentile: f64,
    /// Multiplier applied to the inter-percentile range
    pub iqr_multiplier: f64,
    /// Runs of missing values longer than this are left to the hour-median pass
    pub max_interpolation_gap_minutes: Option<u32>,
    /// Widest first-to-last timestamp span accepted before building the grid
    pub max_span_days: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 15,
            outlier_filter: true,
            lower_percentile: 0.01,
            upper_percentile: 0.99,
            iqr_multiplier: 1.5,
            max_interpolation_gap_minutes: None,
            max_span_days: 3660,
        }
    }
}

impl RepairConfig {
    /// Check the settings for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 || MINUTES_PER_DAY % self.interval_minutes != 0 {
            return Err(SeriesError::Config(format!(
                "interval_minutes must divide {} evenly, got {}",
                MINUTES_PER_DAY, self.interval_minutes
            )));
        }

        let in_unit = |p: f64| (0.0..=1.0).contains(&p);
        if !in_unit(self.lower_percentile)
            || !in_unit(self.upper_percentile)
            || self.lower_percentile >= self.upper_percentile
        {
            return Err(SeriesError::Config(format!(
                "percentile band must satisfy 0 <= lower < upper <= 1, got [{}, {}]",
                self.lower_percentile, self.upper_percentile
            )));
        }

        if !(self.iqr_multiplier >= 0.0 && self.iqr_multiplier.is_finite()) {
            return Err(SeriesError::Config(format!(
                "iqr_multiplier must be a non-negative number, got {}",
                self.iqr_multiplier
            )));
        }

        if self.max_interpolation_gap_minutes == Some(0) {
            return Err(SeriesError::Config(
                "max_interpolation_gap_minutes must be positive when set".to_string(),
            ));
        }

        if self.max_span_days == 0 {
            return Err(SeriesError::Config(
                "max_span_days must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Grid cadence as a duration
    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    /// Number of grid points per day
    pub fn points_per_day(&self) -> usize {
        (MINUTES_PER_DAY / self.interval_minutes.max(1)) as usize
    }
}

/// Settings for a full cleaning run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub repair: RepairConfig,
    /// Omit `Hour`, `DayOfWeek` and `IsWeekend` from the clean file
    pub skip_calendar_columns: bool,
}

impl CleaningConfig {
    /// Load settings from a JSON file; absent fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let config: CleaningConfig = serde_json::from_reader(BufReader::new(file))?;
        debug!(path = %path.display(), ?config, "loaded cleaning config");
        config.repair.validate()?;
        Ok(config)
    }
}

//! Observation and series point types shared by every stage

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One parsed row of a daily extract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Day taken from the most recent day header
    pub day: NaiveDate,
    /// Wall-clock time from the row's first field
    pub time: NaiveTime,
    /// Forecast published the day before
    pub forecast_day_minus1: Option<f64>,
    /// Same-day forecast
    pub forecast_day: Option<f64>,
    /// Measured consumption
    pub consumption: Option<f64>,
}

impl RawObservation {
    /// Absolute timestamp of the observation
    pub fn timestamp(&self) -> NaiveDateTime {
        self.day.and_time(self.time)
    }

    /// Convert into a series point at [`Self::timestamp`]
    pub fn to_point(&self) -> SeriesPoint {
        SeriesPoint {
            timestamp: self.timestamp(),
            forecast_day_minus1: self.forecast_day_minus1,
            forecast_day: self.forecast_day,
            consumption: self.consumption,
        }
    }
}

/// A timestamped triple of forecast and measured load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub forecast_day_minus1: Option<f64>,
    pub forecast_day: Option<f64>,
    pub consumption: Option<f64>,
}

impl SeriesPoint {
    /// A point with every value missing
    pub fn empty(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            forecast_day_minus1: None,
            forecast_day: None,
            consumption: None,
        }
    }

    /// Read one value column
    pub fn value(&self, column: ValueColumn) -> Option<f64> {
        match column {
            ValueColumn::ForecastDayMinus1 => self.forecast_day_minus1,
            ValueColumn::ForecastDay => self.forecast_day,
            ValueColumn::Consumption => self.consumption,
        }
    }

    /// Overwrite one value column
    pub fn set_value(&mut self, column: ValueColumn, value: Option<f64>) {
        match column {
            ValueColumn::ForecastDayMinus1 => self.forecast_day_minus1 = value,
            ValueColumn::ForecastDay => self.forecast_day = value,
            ValueColumn::Consumption => self.consumption = value,
        }
    }

    /// True when no value column is missing
    pub fn is_complete(&self) -> bool {
        ValueColumn::ALL.iter().all(|&c| self.value(c).is_some())
    }
}

/// The three value columns carried by every point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueColumn {
    ForecastDayMinus1,
    ForecastDay,
    Consumption,
}

impl ValueColumn {
    /// Every column, in clean-file order after the consumption column
    pub const ALL: [ValueColumn; 3] = [
        ValueColumn::ForecastDayMinus1,
        ValueColumn::ForecastDay,
        ValueColumn::Consumption,
    ];

    /// Header used for the column in clean series files
    pub fn header(&self) -> &'static str {
        match self {
            ValueColumn::ForecastDayMinus1 => "PrevisionJ-1",
            ValueColumn::ForecastDay => "PrevisionJ",
            ValueColumn::Consumption => "Consommation",
        }
    }
}

impl fmt::Display for ValueColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

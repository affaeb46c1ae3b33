//! Calendar, cyclic hour and forecast-error features

use crate::records::SeriesPoint;
use chrono::{Datelike, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A series point with its derived features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPoint {
    pub point: SeriesPoint,
    /// Hour of the timestamp, 0 to 23
    pub hour_of_day: u32,
    /// Day of week with Monday as 0
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub hour_sin: f64,
    pub hour_cos: f64,
    /// Day-ahead forecast minus consumption
    pub error_j_minus1: Option<f64>,
    /// Same-day forecast minus consumption
    pub error_j: Option<f64>,
}

/// Derive the features of one point
///
/// The error features are missing only when one of their inputs is, which
/// cannot happen for a fully repaired series.
pub fn enrich(point: &SeriesPoint) -> EnrichedPoint {
    let hour = point.timestamp.hour();
    let weekday = point.timestamp.weekday();
    let angle = 2.0 * PI * f64::from(hour) / 24.0;

    EnrichedPoint {
        point: *point,
        hour_of_day: hour,
        day_of_week: weekday.num_days_from_monday(),
        is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
        hour_sin: angle.sin(),
        hour_cos: angle.cos(),
        error_j_minus1: forecast_error(point.forecast_day_minus1, point.consumption),
        error_j: forecast_error(point.forecast_day, point.consumption),
    }
}

/// Enrich a whole series in order
pub fn enrich_all(points: &[SeriesPoint]) -> Vec<EnrichedPoint> {
    points.iter().map(enrich).collect()
}

fn forecast_error(forecast: Option<f64>, consumption: Option<f64>) -> Option<f64> {
    Some(forecast? - consumption?)
}

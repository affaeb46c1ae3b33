//! Gap repair engine
//!
//! Turns an assembled series into one point per grid interval with every
//! value filled where the data can justify it. The passes run in a fixed
//! order:
//!
//! 1. optional consumption outlier filter (removed points become gaps)
//! 2. resampling onto the grid (missing boundaries become empty points)
//! 3. time-weighted linear interpolation, nearest value at the edges
//! 4. median of the same hour-of-day for whatever is still missing
//!
//! Values that no pass can fill stay missing and are reported.

use crate::config::RepairConfig;
use crate::error::{Result, SeriesError};
use crate::records::{SeriesPoint, ValueColumn};
use chrono::{Duration, NaiveDateTime, Timelike};
use load_math::statistics::{median, quantile};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A count per value column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCounts {
    pub forecast_day_minus1: usize,
    pub forecast_day: usize,
    pub consumption: usize,
}

impl ColumnCounts {
    pub fn get(&self, column: ValueColumn) -> usize {
        match column {
            ValueColumn::ForecastDayMinus1 => self.forecast_day_minus1,
            ValueColumn::ForecastDay => self.forecast_day,
            ValueColumn::Consumption => self.consumption,
        }
    }

    pub fn add(&mut self, column: ValueColumn, amount: usize) {
        match column {
            ValueColumn::ForecastDayMinus1 => self.forecast_day_minus1 += amount,
            ValueColumn::ForecastDay => self.forecast_day += amount,
            ValueColumn::Consumption => self.consumption += amount,
        }
    }

    pub fn total(&self) -> usize {
        self.forecast_day_minus1 + self.forecast_day + self.consumption
    }
}

/// What each repair pass did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub input_points: usize,
    pub outliers_removed: usize,
    /// Observations used as interpolation anchors but not on the grid
    pub off_grid_points: usize,
    /// Grid boundaries with no observation
    pub inserted_points: usize,
    pub interpolated: ColumnCounts,
    pub hour_median_filled: ColumnCounts,
    /// Values still missing after every pass
    pub residual_missing: ColumnCounts,
    pub output_points: usize,
}

/// Grid series plus the account of how it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct RepairedSeries {
    pub points: Vec<SeriesPoint>,
    pub report: RepairReport,
}

/// Resamples, imputes and filters an assembled series
#[derive(Debug, Clone)]
pub struct GapRepairEngine {
    config: RepairConfig,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    point: SeriesPoint,
    on_grid: bool,
}

impl GapRepairEngine {
    /// Create an engine after validating its settings
    pub fn new(config: RepairConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// Run every pass over `points`
    ///
    /// Points need not be sorted; duplicate timestamps keep the first entry.
    pub fn repair(&self, points: &[SeriesPoint]) -> Result<RepairedSeries> {
        if points.is_empty() {
            return Err(SeriesError::EmptyInput { files: 0 });
        }

        let mut report = RepairReport {
            input_points: points.len(),
            ..RepairReport::default()
        };

        let mut ordered = points.to_vec();
        ordered.sort_by_key(|p| p.timestamp);
        ordered.dedup_by_key(|p| p.timestamp);
        self.check_span(&ordered)?;

        let kept = if self.config.outlier_filter {
            let (kept, removed) = self.filter_outliers(&ordered);
            report.outliers_removed = removed;
            kept
        } else {
            ordered
        };

        let mut slots = self.resample(&kept, &mut report);

        for column in ValueColumn::ALL {
            let filled = self.interpolate(&mut slots, column);
            report.interpolated.add(column, filled);
        }

        let mut grid: Vec<SeriesPoint> = slots
            .into_iter()
            .filter(|s| s.on_grid)
            .map(|s| s.point)
            .collect();

        for column in ValueColumn::ALL {
            let filled = fill_with_hour_median(&mut grid, column);
            report.hour_median_filled.add(column, filled);

            let residual = grid.iter().filter(|p| p.value(column).is_none()).count();
            report.residual_missing.add(column, residual);
            if residual > 0 {
                warn!(
                    column = column.header(),
                    residual, "values left missing after every repair pass"
                );
            }
        }

        report.output_points = grid.len();
        info!(
            input = report.input_points,
            output = report.output_points,
            outliers = report.outliers_removed,
            inserted = report.inserted_points,
            interpolated = report.interpolated.total(),
            hour_median = report.hour_median_filled.total(),
            "repaired series"
        );

        Ok(RepairedSeries {
            points: grid,
            report,
        })
    }

    /// Refuse sorted points whose grid would cover more than `max_span_days`
    fn check_span(&self, ordered: &[SeriesPoint]) -> Result<()> {
        let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
            return Ok(());
        };
        let days = (last.timestamp - first.timestamp).num_days();
        if days > i64::from(self.config.max_span_days) {
            return Err(SeriesError::SpanTooLong {
                first: first.timestamp,
                last: last.timestamp,
                days,
                max_days: self.config.max_span_days,
            });
        }
        Ok(())
    }

    /// Drop points whose consumption lies outside the widened percentile band
    ///
    /// Returns the kept points and how many were removed. Points with a
    /// missing consumption are always kept.
    pub fn filter_outliers(&self, points: &[SeriesPoint]) -> (Vec<SeriesPoint>, usize) {
        let present: Vec<f64> = points.iter().filter_map(|p| p.consumption).collect();

        let band = quantile(&present, self.config.lower_percentile).and_then(|low| {
            quantile(&present, self.config.upper_percentile).map(|high| (low, high))
        });
        let Ok((low, high)) = band else {
            return (points.to_vec(), 0);
        };

        let spread = high - low;
        let lower_fence = low - self.config.iqr_multiplier * spread;
        let upper_fence = high + self.config.iqr_multiplier * spread;

        let kept: Vec<SeriesPoint> = points
            .iter()
            .filter(|p| match p.consumption {
                Some(v) => v >= lower_fence && v <= upper_fence,
                None => true,
            })
            .copied()
            .collect();

        let removed = points.len() - kept.len();
        if removed > 0 {
            info!(removed, lower_fence, upper_fence, "removed consumption outliers");
        }
        (kept, removed)
    }

    /// Interleave the grid boundaries with the observations
    fn resample(&self, points: &[SeriesPoint], report: &mut RepairReport) -> Vec<Slot> {
        let interval = self.config.interval();
        let interval_secs = interval.num_seconds();

        let first = points[0].timestamp;
        let last = points[points.len() - 1].timestamp;
        let start = floor_to_interval(first, interval_secs);
        let grid_len = ((last - start).num_seconds() / interval_secs) as usize + 1;

        let mut slots = Vec::with_capacity(grid_len + points.len());
        let mut observed = points.iter().peekable();

        for step in 0..grid_len {
            let boundary = start + Duration::seconds(step as i64 * interval_secs);

            while let Some(point) = observed.next_if(|p| p.timestamp < boundary) {
                slots.push(Slot {
                    point: *point,
                    on_grid: false,
                });
                report.off_grid_points += 1;
            }

            match observed.next_if(|p| p.timestamp == boundary) {
                Some(point) => slots.push(Slot {
                    point: *point,
                    on_grid: true,
                }),
                None => {
                    slots.push(Slot {
                        point: SeriesPoint::empty(boundary),
                        on_grid: true,
                    });
                    report.inserted_points += 1;
                }
            }
        }

        for point in observed {
            slots.push(Slot {
                point: *point,
                on_grid: false,
            });
            report.off_grid_points += 1;
        }

        slots
    }

    /// Fill one column by time-weighted interpolation; returns grid values filled
    fn interpolate(&self, slots: &mut [Slot], column: ValueColumn) -> usize {
        let max_gap_slots = self
            .config
            .max_interpolation_gap_minutes
            .map(|minutes| (minutes / self.config.interval_minutes) as usize);

        let mut filled = 0;
        let mut i = 0;
        while i < slots.len() {
            if slots[i].point.value(column).is_some() {
                i += 1;
                continue;
            }

            let run_start = i;
            while i < slots.len() && slots[i].point.value(column).is_none() {
                i += 1;
            }
            let run_end = i; // exclusive

            let before = run_start
                .checked_sub(1)
                .map(|k| (slots[k].point.timestamp, slots[k].point.value(column)));
            let after = slots
                .get(run_end)
                .map(|s| (s.point.timestamp, s.point.value(column)));

            let grid_missing = slots[run_start..run_end]
                .iter()
                .filter(|s| s.on_grid)
                .count();
            if matches!(max_gap_slots, Some(limit) if grid_missing > limit) {
                continue;
            }

            for slot in &mut slots[run_start..run_end] {
                let ts = slot.point.timestamp;
                let value = match (before, after) {
                    (Some((t0, Some(v0))), Some((t1, Some(v1)))) => {
                        let span = (t1 - t0).num_seconds() as f64;
                        let offset = (ts - t0).num_seconds() as f64;
                        Some(v0 + (v1 - v0) * offset / span)
                    }
                    (Some((_, Some(v0))), _) => Some(v0),
                    (_, Some((_, Some(v1)))) => Some(v1),
                    _ => None,
                };
                if value.is_some() {
                    slot.point.set_value(column, value);
                    if slot.on_grid {
                        filled += 1;
                    }
                }
            }
        }

        filled
    }
}

/// Fill missing entries of `column` with the median of their hour-of-day
fn fill_with_hour_median(grid: &mut [SeriesPoint], column: ValueColumn) -> usize {
    if grid.iter().all(|p| p.value(column).is_some()) {
        return 0;
    }

    let mut by_hour: [Vec<f64>; 24] = Default::default();
    for point in grid.iter() {
        if let Some(v) = point.value(column) {
            by_hour[point.timestamp.hour() as usize].push(v);
        }
    }
    let medians: Vec<Option<f64>> = by_hour.iter().map(|values| median(values).ok()).collect();

    let mut filled = 0;
    for point in grid.iter_mut() {
        if point.value(column).is_none() {
            if let Some(m) = medians[point.timestamp.hour() as usize] {
                point.set_value(column, Some(m));
                filled += 1;
            }
        }
    }
    filled
}

/// Round a timestamp down to a multiple of `interval_secs` since midnight
fn floor_to_interval(ts: NaiveDateTime, interval_secs: i64) -> NaiveDateTime {
    let since_midnight = i64::from(ts.num_seconds_from_midnight());
    let floored = since_midnight - since_midnight % interval_secs;
    ts.date().and_hms_opt(0, 0, 0).unwrap_or(ts) + Duration::seconds(floored)
}

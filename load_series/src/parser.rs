//! Record parser for one daily extract
//!
//! An extract is a sequence of lines. A day header such as
//! `Journée du 01/01/2023` sets the day for every following row until the
//! next header; rows are `time;forecastDayMinus1;forecastDay;consumption`
//! (`;` or `|` delimited) with decimal commas. Bad rows are counted and
//! skipped, never repaired.

use crate::error::{Result, SeriesError};
use crate::records::RawObservation;
use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Human-readable form of the day header, used in format errors
pub const DAY_MARKER_PATTERN: &str = "Journée du DD/MM/YYYY";

/// Number of delimited fields in a data row
pub const ROW_FIELDS: usize = 4;

// The accent may arrive mangled depending on the extract's encoding.
static DAY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)journ\S{0,2}e\s+du\s+(\d{1,2})/(\d{1,2})/(\d{4})")
        .expect("day marker pattern is valid")
});

/// Per-reason line counts for one extract
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Day header lines seen
    pub day_markers: usize,
    /// Rows turned into observations
    pub rows_accepted: usize,
    /// Column header lines skipped
    pub header_lines: usize,
    /// Rows seen before any day header
    pub rejected_missing_day: usize,
    /// Rows whose field count was not four
    pub rejected_field_count: usize,
    /// Rows with four fields but an unreadable time
    pub rejected_malformed: usize,
    /// Accepted rows with at least one unreadable number
    pub fields_coerced_to_missing: usize,
    /// Blank lines and free text without a delimiter
    pub ignored_lines: usize,
}

impl ParseStats {
    /// Total rows rejected for any reason
    pub fn rejected(&self) -> usize {
        self.rejected_missing_day + self.rejected_field_count + self.rejected_malformed
    }
}

impl AddAssign for ParseStats {
    fn add_assign(&mut self, other: Self) {
        self.day_markers += other.day_markers;
        self.rows_accepted += other.rows_accepted;
        self.header_lines += other.header_lines;
        self.rejected_missing_day += other.rejected_missing_day;
        self.rejected_field_count += other.rejected_field_count;
        self.rejected_malformed += other.rejected_malformed;
        self.fields_coerced_to_missing += other.fields_coerced_to_missing;
        self.ignored_lines += other.ignored_lines;
    }
}

/// Observations extracted from one source plus the line accounting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedExtract {
    pub observations: Vec<RawObservation>,
    pub stats: ParseStats,
}

/// Parse the text of one daily extract
///
/// Fails with [`SeriesError::Format`] only when the text holds neither a day
/// header nor a valid row. An extract with a header but no rows parses to an
/// empty observation list.
pub fn parse_extract(text: &str) -> Result<ParsedExtract> {
    let mut current_day: Option<NaiveDate> = None;
    let mut extract = ParsedExtract::default();

    for raw_line in text.lines() {
        let line = raw_line.trim_start_matches('\u{feff}').trim();

        if let Some(day) = day_marker(line) {
            current_day = Some(day);
            extract.stats.day_markers += 1;
            continue;
        }

        let Some(delimiter) = row_delimiter(line) else {
            extract.stats.ignored_lines += 1;
            continue;
        };

        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();

        if fields.len() == ROW_FIELDS && is_header_row(&fields) {
            extract.stats.header_lines += 1;
            continue;
        }

        let Some(day) = current_day else {
            extract.stats.rejected_missing_day += 1;
            continue;
        };

        if fields.len() != ROW_FIELDS {
            extract.stats.rejected_field_count += 1;
            continue;
        }

        let Some(time) = parse_time(fields[0]) else {
            extract.stats.rejected_malformed += 1;
            continue;
        };

        let values: Vec<Option<f64>> = fields[1..].iter().map(|f| parse_decimal(f)).collect();
        if fields[1..]
            .iter()
            .zip(&values)
            .any(|(raw, parsed)| !raw.is_empty() && parsed.is_none())
        {
            extract.stats.fields_coerced_to_missing += 1;
        }

        extract.observations.push(RawObservation {
            day,
            time,
            forecast_day_minus1: values[0],
            forecast_day: values[1],
            consumption: values[2],
        });
        extract.stats.rows_accepted += 1;
    }

    if extract.stats.day_markers == 0 && extract.observations.is_empty() {
        return Err(SeriesError::Format {
            expected: DAY_MARKER_PATTERN,
            detail: format!(
                "no day header and no valid row in {} line(s)",
                text.lines().count()
            ),
        });
    }

    Ok(extract)
}

/// Parse a decimal-comma number, returning `None` when it cannot be read
///
/// Spaces (including non-breaking ones used as thousands separators) are
/// dropped before the comma is swapped for a period.
pub fn parse_decimal(field: &str) -> Option<f64> {
    let cleaned: String = field
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn day_marker(line: &str) -> Option<NaiveDate> {
    let captures = DAY_MARKER.captures(line)?;
    let day = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let year = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn row_delimiter(line: &str) -> Option<char> {
    if line.contains(';') {
        Some(';')
    } else if line.contains('|') {
        Some('|')
    } else {
        None
    }
}

fn parse_time(field: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(field, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(field, "%H:%M:%S"))
        .ok()
}

fn is_header_row(fields: &[&str]) -> bool {
    parse_time(fields[0]).is_none()
        && fields
            .iter()
            .all(|f| f.chars().any(|c| c.is_alphabetic()))
}

//! Clean series CSV
//!
//! Columns are `DateTime, Consommation, PrevisionJ-1, PrevisionJ` followed by
//! `Hour, DayOfWeek, IsWeekend` unless calendar columns are skipped. Missing
//! values are written as empty cells.

use crate::error::{Result, SeriesError};
use crate::features::EnrichedPoint;
use crate::records::SeriesPoint;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Timestamp layout of the `DateTime` column
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BASE_COLUMNS: [&str; 4] = ["DateTime", "Consommation", "PrevisionJ-1", "PrevisionJ"];
const CALENDAR_COLUMNS: [&str; 3] = ["Hour", "DayOfWeek", "IsWeekend"];

#[derive(Debug, Deserialize)]
struct CleanRow {
    #[serde(rename = "DateTime")]
    date_time: String,
    #[serde(rename = "Consommation", default)]
    consumption: Option<f64>,
    #[serde(rename = "PrevisionJ-1", default)]
    forecast_day_minus1: Option<f64>,
    #[serde(rename = "PrevisionJ", default)]
    forecast_day: Option<f64>,
}

/// Write enriched points as a clean series
pub fn write_clean_series<W: Write>(
    writer: W,
    points: &[EnrichedPoint],
    calendar_columns: bool,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
    if calendar_columns {
        header.extend(CALENDAR_COLUMNS);
    }
    csv_writer.write_record(&header)?;

    for enriched in points {
        let p = &enriched.point;
        let mut record = vec![
            p.timestamp.format(DATETIME_FORMAT).to_string(),
            cell(p.consumption),
            cell(p.forecast_day_minus1),
            cell(p.forecast_day),
        ];
        if calendar_columns {
            record.push(enriched.hour_of_day.to_string());
            record.push(enriched.day_of_week.to_string());
            record.push(u8::from(enriched.is_weekend).to_string());
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Read a clean series back; unknown columns are ignored
pub fn read_clean_series<R: Read>(reader: R) -> Result<Vec<SeriesPoint>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut points = Vec::new();

    for row in csv_reader.deserialize::<CleanRow>() {
        let row = row?;
        let timestamp = NaiveDateTime::parse_from_str(row.date_time.trim(), DATETIME_FORMAT)
            .map_err(|e| SeriesError::Record {
                line: points.len() as u64 + 2,
                detail: format!("DateTime '{}': {}", row.date_time, e),
            })?;
        points.push(SeriesPoint {
            timestamp,
            forecast_day_minus1: row.forecast_day_minus1,
            forecast_day: row.forecast_day,
            consumption: row.consumption,
        });
    }

    Ok(points)
}

/// Write a clean series file at `path`
pub fn save_clean_series<P: AsRef<Path>>(
    path: P,
    points: &[EnrichedPoint],
    calendar_columns: bool,
) -> Result<()> {
    let path = path.as_ref();
    write_clean_series(File::create(path)?, points, calendar_columns)?;
    info!(path = %path.display(), rows = points.len(), "saved clean series");
    Ok(())
}

/// Read a clean series file at `path`
pub fn load_clean_series<P: AsRef<Path>>(path: P) -> Result<Vec<SeriesPoint>> {
    read_clean_series(File::open(path)?)
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::enrich_all;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<SeriesPoint> {
        let day = NaiveDate::from_ymd_opt(2023, 1, 7).unwrap();
        vec![
            SeriesPoint {
                timestamp: day.and_hms_opt(0, 0, 0).unwrap(),
                forecast_day_minus1: Some(61_200.0),
                forecast_day: Some(60_950.0),
                consumption: Some(60_812.5),
            },
            SeriesPoint {
                timestamp: day.and_hms_opt(0, 15, 0).unwrap(),
                forecast_day_minus1: None,
                forecast_day: Some(60_100.0),
                consumption: Some(60_300.0),
            },
        ]
    }

    #[test]
    fn writes_expected_layout() {
        let mut buffer = Vec::new();
        write_clean_series(&mut buffer, &enrich_all(&sample()), true).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "DateTime,Consommation,PrevisionJ-1,PrevisionJ,Hour,DayOfWeek,IsWeekend"
        );
        assert_eq!(lines[1], "2023-01-07 00:00:00,60812.5,61200,60950,0,5,1");
        assert_eq!(lines[2], "2023-01-07 00:15:00,60300,,60100,0,5,1");
    }

    #[test]
    fn calendar_columns_can_be_skipped() {
        let mut buffer = Vec::new();
        write_clean_series(&mut buffer, &enrich_all(&sample()), false).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "DateTime,Consommation,PrevisionJ-1,PrevisionJ"
        );
    }

    #[test]
    fn reads_back_what_it_wrote() {
        let mut buffer = Vec::new();
        write_clean_series(&mut buffer, &enrich_all(&sample()), true).unwrap();
        let points = read_clean_series(buffer.as_slice()).unwrap();
        assert_eq!(points, sample());
    }

    #[test]
    fn bad_timestamp_names_the_line() {
        let text = "DateTime,Consommation\n2023-01-01 00:00:00,1\nyesterday,2\n";
        match read_clean_series(text.as_bytes()).unwrap_err() {
            SeriesError::Record { line, .. } => assert_eq!(line, 3),
            other => panic!("Expected Record error, got {:?}", other),
        }
    }
}

//! Uploaded series adapter
//!
//! Accepts the tabular files people actually upload: delimiter sniffed from
//! the header line, header names matched against known aliases, timestamps
//! in several layouts and consumption with decimal commas. Rows that cannot
//! be coerced are counted and dropped.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use load_series::parser::parse_decimal;
use load_series::pipeline::decode_text;
use tracing::{debug, warn};

const DELIMITERS: [u8; 4] = [b',', b';', b'|', b'\t'];

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Day that bare wall-clock times are anchored to
pub fn reference_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Timestamp,
    Consumption,
}

/// Timestamp and consumption pairs read from one upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedSeries {
    timestamps: Vec<NaiveDateTime>,
    consumption: Vec<f64>,
    pub invalid_timestamp_rows: usize,
    pub invalid_consumption_rows: usize,
}

impl UploadedSeries {
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn consumption(&self) -> &[f64] {
        &self.consumption
    }

    pub fn len(&self) -> usize {
        self.consumption.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumption.is_empty()
    }

    pub fn dropped_rows(&self) -> usize {
        self.invalid_timestamp_rows + self.invalid_consumption_rows
    }
}

/// Read an uploaded file into a sorted series
///
/// Fails with [`ForecastError::Schema`] when the timestamp or consumption
/// column cannot be found and with [`ForecastError::EmptyAfterCleaning`]
/// when every row is dropped.
pub fn parse_upload(bytes: &[u8]) -> Result<UploadedSeries> {
    let text = decode_text(bytes);
    let text = text.trim_start_matches('\u{feff}');

    let header_line = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ForecastError::Upload("the uploaded file is empty".to_string()))?;
    let delimiter = sniff_delimiter(header_line);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record.map_err(|e| ForecastError::Upload(e.to_string()))?,
        None => return Err(ForecastError::Upload("the uploaded file is empty".to_string())),
    };

    let missing = |column: &str| ForecastError::Schema {
        column: column.to_string(),
        found: header.iter().collect::<Vec<_>>().join(", "),
    };
    let timestamp_index = find_role(&header, Role::Timestamp).ok_or_else(|| missing("timestamp"))?;
    let consumption_index =
        find_role(&header, Role::Consumption).ok_or_else(|| missing("consumption"))?;
    debug!(
        delimiter = %char::from(delimiter),
        timestamp = %&header[timestamp_index],
        consumption = %&header[consumption_index],
        "matched upload columns"
    );

    let mut rows: Vec<(NaiveDateTime, f64)> = Vec::new();
    let mut invalid_timestamp_rows = 0;
    let mut invalid_consumption_rows = 0;

    for record in records {
        let record = record.map_err(|e| ForecastError::Upload(e.to_string()))?;

        let Some(timestamp) = record.get(timestamp_index).and_then(coerce_timestamp) else {
            invalid_timestamp_rows += 1;
            continue;
        };
        let Some(value) = record.get(consumption_index).and_then(parse_decimal) else {
            invalid_consumption_rows += 1;
            continue;
        };
        rows.push((timestamp, value));
    }

    let dropped = invalid_timestamp_rows + invalid_consumption_rows;
    if dropped > 0 {
        warn!(
            invalid_timestamp_rows,
            invalid_consumption_rows, "dropped upload rows that failed coercion"
        );
    }
    if rows.is_empty() {
        return Err(ForecastError::EmptyAfterCleaning { dropped });
    }

    rows.sort_by_key(|(ts, _)| *ts);
    let (timestamps, consumption) = rows.into_iter().unzip();

    Ok(UploadedSeries {
        timestamps,
        consumption,
        invalid_timestamp_rows,
        invalid_consumption_rows,
    })
}

/// Parse a timestamp in any accepted layout
///
/// A bare time of day is placed on [`reference_day`].
pub fn coerce_timestamp(field: &str) -> Option<NaiveDateTime> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(field) {
        return Some(parsed.naive_local());
    }
    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(field, f).ok())
    {
        return Some(parsed);
    }
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(field, f).ok())
        .map(|time| reference_day().and_time(time))
}

fn sniff_delimiter(header_line: &str) -> u8 {
    DELIMITERS
        .iter()
        .copied()
        .max_by_key(|d| header_line.bytes().filter(|b| b == d).count())
        .filter(|d| header_line.as_bytes().contains(d))
        .unwrap_or(b',')
}

fn find_role(header: &StringRecord, role: Role) -> Option<usize> {
    header
        .iter()
        .enumerate()
        .position(|(index, name)| column_role(name, index) == Some(role))
}

fn column_role(name: &str, index: usize) -> Option<Role> {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "timestamp" | "datetime" | "date" | "heure" | "heures" | "time" => Some(Role::Timestamp),
        "consumption" | "consommation" | "valeur" => Some(Role::Consumption),
        // day-header exports leave the consumption column unnamed
        "" if index == 3 => Some(Role::Consumption),
        other if other.starts_with("journ") => Some(Role::Timestamp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn reads_plain_csv_and_sorts() {
        let upload = "timestamp,consumption\n\
2023-01-01 00:30:00,52000\n\
2023-01-01 00:00:00,50000\n\
2023-01-01 00:15:00,51000\n";
        let series = parse_upload(upload.as_bytes()).unwrap();
        assert_eq!(series.consumption(), &[50000.0, 51000.0, 52000.0]);
        assert_eq!(series.dropped_rows(), 0);
    }

    #[test]
    fn french_export_with_semicolons_and_commas() {
        let upload = "Heures;PrévisionJ-1;PrévisionJ;Consommation\n00:00;1;2;60 812,5\n00:15;1;2;60300\n";
        let series = parse_upload(upload.as_bytes()).unwrap();
        assert_eq!(series.consumption(), &[60812.5, 60300.0]);
        assert_eq!(
            series.timestamps()[1],
            reference_day().and_hms_opt(0, 15, 0).unwrap()
        );
    }

    #[test]
    fn day_header_export_maps_unnamed_column() {
        let upload = "Journée du 01/01/2023;;;\nHeures;PrévisionJ-1;PrévisionJ;Consommation\n00:00;1;2;3\n";
        let series = parse_upload(upload.as_bytes()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.invalid_timestamp_rows, 1);
    }

    #[test]
    fn coercion_failures_are_counted() {
        let upload = "DateTime,Consommation\n\
2023-01-01 00:00:00,1\n\
not a date,2\n\
2023-01-01 00:30:00,n/a\n\
2023-01-01 00:45:00,4\n";
        let series = parse_upload(upload.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.invalid_timestamp_rows, 1);
        assert_eq!(series.invalid_consumption_rows, 1);
        assert_eq!(series.dropped_rows(), 2);
    }

    #[test]
    fn missing_consumption_column_names_it() {
        let upload = "timestamp,load\n2023-01-01 00:00:00,1\n";
        match parse_upload(upload.as_bytes()).unwrap_err() {
            ForecastError::Schema { column, found } => {
                assert_eq!(column, "consumption");
                assert_eq!(found, "timestamp, load");
            }
            other => panic!("Expected Schema error, got {:?}", other),
        }
    }

    #[test]
    fn nothing_usable_is_empty_after_cleaning() {
        let upload = "timestamp,consumption\nx,1\ny,2\n";
        assert!(matches!(
            parse_upload(upload.as_bytes()),
            Err(ForecastError::EmptyAfterCleaning { dropped: 2 })
        ));
        assert!(matches!(parse_upload(b"  \n"), Err(ForecastError::Upload(_))));
    }

    #[rstest]
    #[case("2023-03-05T10:15:00+01:00", "2023-03-05 10:15:00")]
    #[case("2023-03-05 10:15", "2023-03-05 10:15:00")]
    #[case("2023-03-05T10:15:30", "2023-03-05 10:15:30")]
    #[case("05/03/2023 10:15", "2023-03-05 10:15:00")]
    #[case("10:15", "2023-01-01 10:15:00")]
    fn timestamp_layouts(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(coerce_timestamp(input).unwrap().to_string(), expected);
    }

    #[test]
    fn delimiter_sniffing() {
        assert_eq!(sniff_delimiter("a;b;c"), b';');
        assert_eq!(sniff_delimiter("a\tb"), b'\t');
        assert_eq!(sniff_delimiter("single"), b',');
    }
}

//! Error types for the load_series crate

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors raised while cleaning load extracts
#[derive(Debug, Error)]
pub enum SeriesError {
    /// The extract had neither a day header nor a single usable row
    #[error("Unrecognised extract format (expected a day header like '{expected}'): {detail}")]
    Format {
        expected: &'static str,
        detail: String,
    },

    /// No observation survived across all selected files
    #[error("No valid observations in {files} file(s)")]
    EmptyInput { files: usize },

    /// A clean series row that could not be read back
    #[error("Invalid clean series record at line {line}: {detail}")]
    Record { line: u64, detail: String },

    /// Observations spread over more days than the grid may cover
    #[error("Observations span {days} days ({first} to {last}), more than the {max_days} allowed")]
    SpanTooLong {
        first: NaiveDateTime,
        last: NaiveDateTime,
        days: i64,
        max_days: u32,
    },

    /// Invalid cleaning or repair settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reading or writing the clean series CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error decoding a JSON configuration file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, SeriesError>;

//! Error types for the load_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while training, loading or serving forecast models
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A required column is absent from the input
    #[error("Schema error: missing required column '{column}' (found: {found})")]
    Schema { column: String, found: String },

    /// No row survived timestamp and value coercion
    #[error("No usable rows left after cleaning ({dropped} dropped)")]
    EmptyAfterCleaning { dropped: usize },

    /// Too few observations for the requested model or horizon
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Fitting failed numerically
    #[error("Training error: {0}")]
    Training(String),

    /// The parameters for a model variant were never loaded
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The uploaded payload could not be read at all
    #[error("Upload error: {0}")]
    Upload(String),

    /// Model parameters could not be written or read
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] load_math::MathError),

    /// Error from the cleaning pipeline
    #[error("Series error: {0}")]
    Series(#[from] load_series::SeriesError),
}

impl ForecastError {
    /// HTTP-style status: 400 for caller input, 500 for server-side failures
    pub fn status_code(&self) -> u16 {
        match self {
            ForecastError::Schema { .. }
            | ForecastError::EmptyAfterCleaning { .. }
            | ForecastError::InsufficientData(_)
            | ForecastError::InvalidParameter(_)
            | ForecastError::Upload(_) => 400,
            ForecastError::Training(_)
            | ForecastError::ModelUnavailable(_)
            | ForecastError::Persistence(_)
            | ForecastError::Io(_)
            | ForecastError::Polars(_)
            | ForecastError::Math(_)
            | ForecastError::Series(_) => 500,
        }
    }

    /// Short machine-readable name of the error
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::Schema { .. } => "schema",
            ForecastError::EmptyAfterCleaning { .. } => "empty_after_cleaning",
            ForecastError::InsufficientData(_) => "insufficient_data",
            ForecastError::Training(_) => "training",
            ForecastError::ModelUnavailable(_) => "model_unavailable",
            ForecastError::InvalidParameter(_) => "invalid_parameter",
            ForecastError::Upload(_) => "upload",
            ForecastError::Persistence(_) => "persistence",
            ForecastError::Io(_) => "io",
            ForecastError::Polars(_) => "polars",
            ForecastError::Math(_) => "math",
            ForecastError::Series(_) => "series",
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Persistence(err.to_string())
    }
}

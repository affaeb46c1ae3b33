//! # Load Forecast
//!
//! Short-term forecasting of national electricity consumption.
//!
//! ## Features
//!
//! - Seasonal ARIMA estimated by conditional sum of squares
//! - Plain autoregression with an intercept, estimated by least squares
//! - Persisted model structure (orders and lags) in a small JSON layout
//! - Tolerant reading of uploaded series (delimiters, header aliases, decimal commas)
//! - A prediction service that refits the stored structure on every upload
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use load_forecast::data::DataLoader;
//! use load_forecast::models::ModelVariant;
//! use load_forecast::params::ModelParameters;
//!
//! let series = DataLoader::from_csv("consommation_rte_clean.csv")?;
//! let params = ModelParameters::default_for(
//!     ModelVariant::Sarimax,
//!     series.points_per_day().unwrap_or(96),
//! );
//!
//! let fitted = params.fit(series.consumption())?;
//! let next = fitted.forecast(4)?;
//! println!("{:?}", next.values());
//!
//! params.save("sarimax_model_params.json")?;
//! # Ok::<(), load_forecast::ForecastError>(())
//! ```

pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod params;
pub mod service;
pub mod store;
pub mod train;
pub mod upload;

// Re-export commonly used types
pub use crate::data::{DataLoader, LoadSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::metrics::{forecast_accuracy, ForecastAccuracy};
pub use crate::models::{
    FitSummary, ForecastModel, ForecastResult, ModelVariant, TrainedForecastModel,
};
pub use crate::params::{ArParameters, ArimaOrder, ModelParameters, SarimaParameters, SeasonalOrder};
pub use crate::service::{PredictionResult, PredictionService, ServiceConfig};
pub use crate::store::{ParameterStore, SlotStatus};
pub use crate::train::{train, TrainConfig, TrainingOutcome};
pub use crate::upload::{parse_upload, UploadedSeries};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

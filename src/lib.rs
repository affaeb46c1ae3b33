//! # Voltcast
//!
//! Cleaning, modelling and serving of 15-minute national electricity
//! consumption series.
//!
//! - [`series`]: daily extract parsing, gap repair and the clean series file
//! - [`forecast`]: seasonal and plain autoregressive models, parameter files
//!   and the prediction service
//! - [`math`]: the numeric kernels both of them share
//!
//! ## Example
//!
//! ```no_run
//! use voltcast_workspace::forecast::{DataLoader, ModelParameters, ModelVariant};
//!
//! let series = DataLoader::from_csv("consommation_rte_clean.csv")?;
//! let params = ModelParameters::default_for(ModelVariant::Autoregressive, 96);
//! let fitted = params.fit(series.consumption())?;
//! println!("next value: {}", fitted.forecast(1)?.values()[0]);
//! # Ok::<(), voltcast_workspace::forecast::ForecastError>(())
//! ```

pub use load_forecast as forecast;
pub use load_math as math;
pub use load_series as series;

//! Persisted model parameters
//!
//! Only the model structure is persisted: the orders of the seasonal model or
//! the lag count of the plain autoregression. Coefficients are always
//! re-estimated against the series being forecast. Files use the layout
//!
//! ```json
//! {"order": [1, 0, 0], "seasonal_order": [1, 0, 0, 96]}
//! {"order": [5]}
//! ```

use crate::error::{ForecastError, Result};
use crate::models::autoreg::AutoRegressive;
use crate::models::sarima::Sarima;
use crate::models::{ForecastModel, ModelVariant, TrainedForecastModel};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Non-seasonal `(p, d, q)` order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 3]", into = "[usize; 3]")]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl From<[usize; 3]> for ArimaOrder {
    fn from([p, d, q]: [usize; 3]) -> Self {
        Self { p, d, q }
    }
}

impl From<ArimaOrder> for [usize; 3] {
    fn from(order: ArimaOrder) -> Self {
        [order.p, order.d, order.q]
    }
}

/// Seasonal `(P, D, Q, S)` order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 4]", into = "[usize; 4]")]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    /// Observations per season
    pub period: usize,
}

impl SeasonalOrder {
    /// No seasonal component
    pub fn none() -> Self {
        Self {
            p: 0,
            d: 0,
            q: 0,
            period: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.p + self.d + self.q > 0
    }
}

impl From<[usize; 4]> for SeasonalOrder {
    fn from([p, d, q, period]: [usize; 4]) -> Self {
        Self { p, d, q, period }
    }
}

impl From<SeasonalOrder> for [usize; 4] {
    fn from(order: SeasonalOrder) -> Self {
        [order.p, order.d, order.q, order.period]
    }
}

/// Structure of a seasonal autoregressive model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarimaParameters {
    pub order: ArimaOrder,
    pub seasonal_order: SeasonalOrder,
}

impl SarimaParameters {
    /// `(1,0,0)(1,0,0,S)` with a daily season of `points_per_day`
    pub fn daily(points_per_day: usize) -> Self {
        Self {
            order: ArimaOrder { p: 1, d: 0, q: 0 },
            seasonal_order: SeasonalOrder {
                p: 1,
                d: 0,
                q: 0,
                period: points_per_day,
            },
        }
    }
}

/// Structure of a plain autoregression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArParameters {
    #[serde(rename = "order", with = "single_lag")]
    pub lags: usize,
}

impl Default for ArParameters {
    fn default() -> Self {
        Self { lags: 5 }
    }
}

mod single_lag {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(lags: &usize, serializer: S) -> Result<S::Ok, S::Error> {
        [*lags].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
        let [lags] = <[usize; 1]>::deserialize(deserializer)?;
        Ok(lags)
    }
}

/// Parameters of either model variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelParameters {
    Sarima(SarimaParameters),
    Autoregressive(ArParameters),
}

impl ModelParameters {
    pub fn variant(&self) -> ModelVariant {
        match self {
            ModelParameters::Sarima(_) => ModelVariant::Sarimax,
            ModelParameters::Autoregressive(_) => ModelVariant::Autoregressive,
        }
    }

    /// Default structure for `variant` at a cadence of `points_per_day`
    pub fn default_for(variant: ModelVariant, points_per_day: usize) -> Self {
        match variant {
            ModelVariant::Sarimax => {
                ModelParameters::Sarima(SarimaParameters::daily(points_per_day))
            }
            ModelVariant::Autoregressive => {
                ModelParameters::Autoregressive(ArParameters::default())
            }
        }
    }

    /// Estimate coefficients for this structure on `series`
    pub fn fit(&self, series: &[f64]) -> Result<Box<dyn TrainedForecastModel>> {
        match self {
            ModelParameters::Sarima(params) => {
                Ok(Box::new(Sarima::from_parameters(params)?.train(series)?))
            }
            ModelParameters::Autoregressive(params) => {
                Ok(Box::new(AutoRegressive::new(params.lags)?.train(series)?))
            }
        }
    }

    /// Write the parameters as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            ForecastError::Persistence(format!("cannot create {}: {}", path.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), variant = %self.variant(), "saved model parameters");
        Ok(())
    }

    /// Read parameters written by [`Self::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ForecastError::Persistence(format!("cannot open {}: {}", path.display(), e))
        })?;
        let params = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ForecastError::Persistence(format!("cannot decode {}: {}", path.display(), e))
        })?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn seasonal_layout_matches_training_scripts() {
        let params = ModelParameters::Sarima(SarimaParameters::daily(96));
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"order":[1,0,0],"seasonal_order":[1,0,0,96]}"#);
    }

    #[test]
    fn autoregressive_layout_matches_training_scripts() {
        let json = r#"{"order": [5]}"#;
        let params: ModelParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params, ModelParameters::Autoregressive(ArParameters { lags: 5 }));
        assert_eq!(params.variant(), ModelVariant::Autoregressive);
    }

    #[test]
    fn seasonal_file_from_scripts_is_understood() {
        let json = r#"{"order": [2, 1, 1], "seasonal_order": [1, 1, 0, 24]}"#;
        match serde_json::from_str::<ModelParameters>(json).unwrap() {
            ModelParameters::Sarima(p) => {
                assert_eq!(p.order, ArimaOrder { p: 2, d: 1, q: 1 });
                assert_eq!(p.seasonal_order.period, 24);
            }
            other => panic!("Expected seasonal parameters, got {:?}", other),
        }
    }

    #[test]
    fn malformed_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"order\": \"five\"}").unwrap();
        assert!(matches!(
            ModelParameters::load(&path),
            Err(ForecastError::Persistence(_))
        ));
    }
}

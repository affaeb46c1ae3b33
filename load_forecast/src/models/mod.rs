//! Forecasting models for load series

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::{self, Debug};
use std::str::FromStr;

pub mod autoreg;
pub mod sarima;

/// The model families a caller can ask for by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Seasonal autoregressive model
    Sarimax,
    /// Plain autoregression on the previous k values
    #[serde(rename = "ar")]
    Autoregressive,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Sarimax, ModelVariant::Autoregressive];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Sarimax => "sarimax",
            ModelVariant::Autoregressive => "ar",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sarimax" | "sarima" => Ok(ModelVariant::Sarimax),
            "ar" | "autoreg" => Ok(ModelVariant::Autoregressive),
            other => Err(ForecastError::InvalidParameter(format!(
                "unknown model variant '{}' (expected 'sarimax' or 'ar')",
                other
            ))),
        }
    }
}

/// Out-of-sample forecast with per-step standard errors
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    values: Vec<f64>,
    std_errors: Vec<f64>,
}

impl ForecastResult {
    pub fn new(values: Vec<f64>, std_errors: Vec<f64>) -> Result<Self> {
        if values.len() != std_errors.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Values length ({}) doesn't match standard errors length ({})",
                values.len(),
                std_errors.len()
            )));
        }
        Ok(Self { values, std_errors })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn std_errors(&self) -> &[f64] {
        &self.std_errors
    }

    /// Number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.values.len()
    }

    /// Normal prediction intervals at `confidence_level`
    pub fn intervals(&self, confidence_level: f64) -> Result<Vec<(f64, f64)>> {
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Confidence level must be between 0 and 1, got {}",
                confidence_level
            )));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        let z = normal.inverse_cdf(1.0 - (1.0 - confidence_level) / 2.0);

        Ok(self
            .values
            .iter()
            .zip(&self.std_errors)
            .map(|(v, se)| (v - z * se, v + z * se))
            .collect())
    }
}

/// Fit quality and estimated coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub model: String,
    pub coefficients: Vec<(String, f64)>,
    /// Innovation variance
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    /// Observations the likelihood was computed over
    pub observations: usize,
}

impl FitSummary {
    /// Gaussian log-likelihood and AIC from a residual sum of squares
    pub(crate) fn from_sse(
        model: String,
        coefficients: Vec<(String, f64)>,
        sse: f64,
        observations: usize,
    ) -> Self {
        let n = observations as f64;
        let sigma2 = (sse / n).max(f64::MIN_POSITIVE);
        let log_likelihood = -0.5 * n * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let estimated = coefficients.len() as f64 + 1.0;
        Self {
            model,
            coefficients,
            sigma2,
            log_likelihood,
            aic: 2.0 * estimated - 2.0 * log_likelihood,
            observations,
        }
    }
}

/// A model whose coefficients have been estimated on one series
pub trait TrainedForecastModel: Debug + Send + Sync {
    /// Forecast `horizon` steps past the end of the training series
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// One-step in-sample predictions aligned with the training series
    ///
    /// Entries without enough history are `None`.
    fn in_sample(&self) -> &[Option<f64>];

    fn summary(&self) -> &FitSummary;

    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a load series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel + 'static;

    /// Estimate coefficients on `series`
    fn train(&self, series: &[f64]) -> Result<Self::Trained>;

    fn name(&self) -> &str;
}

/// Reject non-finite inputs before any estimation
pub(crate) fn ensure_finite(series: &[f64]) -> Result<()> {
    match series.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ForecastError::InvalidParameter(format!(
            "series value at index {} is not finite",
            index
        ))),
        None => Ok(()),
    }
}

/// Reject horizons outside `1..=observations`
pub(crate) fn check_horizon(horizon: usize, observations: usize) -> Result<()> {
    if horizon == 0 || horizon > observations {
        return Err(ForecastError::InvalidParameter(format!(
            "forecast horizon must be between 1 and {}, got {}",
            observations, horizon
        )));
    }
    Ok(())
}

/// Standard errors of 1..=horizon step forecasts from MA(inf) weights
///
/// `ar` holds the coefficients of the full autoregressive operator (with any
/// differencing folded in), `ma` those of the moving-average operator, both
/// indexed from lag 1.
pub(crate) fn forecast_std_errors(ar: &[f64], ma: &[f64], sigma2: f64, horizon: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(horizon);
    psi.push(1.0);
    for j in 1..horizon {
        let mut weight = ma.get(j - 1).copied().unwrap_or(0.0);
        for (k, phi) in ar.iter().enumerate().take(j) {
            weight += phi * psi[j - k - 1];
        }
        psi.push(weight);
    }

    let mut cumulative = 0.0;
    psi.iter()
        .map(|w| {
            cumulative += w * w;
            (sigma2 * cumulative).sqrt()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn variants_by_name() {
        assert_eq!("sarimax".parse::<ModelVariant>().unwrap(), ModelVariant::Sarimax);
        assert_eq!(" AR ".parse::<ModelVariant>().unwrap(), ModelVariant::Autoregressive);
        assert!("prophet".parse::<ModelVariant>().is_err());
        assert_eq!(ModelVariant::Autoregressive.to_string(), "ar");
    }

    #[test]
    fn ninety_five_percent_interval_uses_normal_quantile() {
        let result = ForecastResult::new(vec![100.0], vec![2.0]).unwrap();
        let (lower, upper) = result.intervals(0.95).unwrap()[0];
        assert_relative_eq!(lower, 100.0 - 1.959964 * 2.0, epsilon = 1e-4);
        assert_relative_eq!(upper, 100.0 + 1.959964 * 2.0, epsilon = 1e-4);
        assert!(result.intervals(1.0).is_err());
    }

    #[test]
    fn random_walk_errors_grow_with_sqrt_horizon() {
        let errors = forecast_std_errors(&[1.0], &[], 4.0, 4);
        assert_relative_eq!(errors[0], 2.0);
        assert_relative_eq!(errors[3], 4.0);
    }

    #[test]
    fn horizon_bounds() {
        assert!(check_horizon(0, 10).is_err());
        assert!(check_horizon(11, 10).is_err());
        assert!(check_horizon(10, 10).is_ok());
    }
}

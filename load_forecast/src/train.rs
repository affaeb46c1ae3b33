//! Offline training step
//!
//! Fits the chosen structure on the clean series once to prove it converges,
//! logs the fit and writes the parameter file the service reads at startup.

use crate::data::LoadSeries;
use crate::error::{ForecastError, Result};
use crate::metrics::{forecast_accuracy, ForecastAccuracy};
use crate::models::{FitSummary, ModelVariant};
use crate::params::{ArParameters, ArimaOrder, ModelParameters, SarimaParameters, SeasonalOrder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Points per day assumed when the series is too short to tell
const FALLBACK_POINTS_PER_DAY: usize = 96;

/// What to train and where to write it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub variant: ModelVariant,
    /// Non-seasonal order; `(1,0,0)` when absent
    pub order: Option<ArimaOrder>,
    /// Seasonal order; a daily `(1,0,0,S)` when absent
    pub seasonal_order: Option<SeasonalOrder>,
    /// Autoregression lags; 5 when absent
    pub lags: Option<usize>,
    /// Parameter file destination; the variant's usual file name when absent
    pub output: Option<PathBuf>,
}

impl TrainConfig {
    pub fn new(variant: ModelVariant) -> Self {
        Self {
            variant,
            order: None,
            seasonal_order: None,
            lags: None,
            output: None,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_parameter_file(self.variant)))
    }

    /// Resolve the structure to fit on `series`
    pub fn parameters(&self, series: &LoadSeries) -> Result<ModelParameters> {
        match self.variant {
            ModelVariant::Sarimax => {
                if self.lags.is_some() {
                    return Err(ForecastError::InvalidParameter(
                        "lags only apply to the ar variant".to_string(),
                    ));
                }
                let mut params = SarimaParameters::daily(
                    series.points_per_day().unwrap_or(FALLBACK_POINTS_PER_DAY),
                );
                if let Some(order) = self.order {
                    params.order = order;
                }
                if let Some(seasonal) = self.seasonal_order {
                    params.seasonal_order = seasonal;
                }
                Ok(ModelParameters::Sarima(params))
            }
            ModelVariant::Autoregressive => {
                if self.order.is_some() || self.seasonal_order.is_some() {
                    return Err(ForecastError::InvalidParameter(
                        "orders only apply to the sarimax variant".to_string(),
                    ));
                }
                let lags = self.lags.unwrap_or(ArParameters::default().lags);
                Ok(ModelParameters::Autoregressive(ArParameters { lags }))
            }
        }
    }
}

/// File name the training scripts have always used for `variant`
pub fn default_parameter_file(variant: ModelVariant) -> &'static str {
    match variant {
        ModelVariant::Sarimax => "sarimax_model_params.json",
        ModelVariant::Autoregressive => "ar_model_params.json",
    }
}

/// Result of one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub parameters: ModelParameters,
    pub summary: FitSummary,
    pub accuracy: ForecastAccuracy,
    pub output: PathBuf,
}

/// Fit, log and persist
///
/// Nothing is written when the fit fails.
pub fn train(config: &TrainConfig, series: &LoadSeries) -> Result<TrainingOutcome> {
    let parameters = config.parameters(series)?;
    info!(
        variant = %config.variant,
        observations = series.len(),
        parameters = ?parameters,
        "training"
    );

    let fitted = parameters.fit(series.consumption())?;
    let summary = fitted.summary().clone();
    let accuracy = forecast_accuracy(fitted.in_sample(), series.consumption())?;

    for (name, value) in &summary.coefficients {
        info!(model = %summary.model, coefficient = %name, value, "estimated");
    }
    info!(
        model = %summary.model,
        sigma2 = summary.sigma2,
        log_likelihood = summary.log_likelihood,
        aic = summary.aic,
        mae = accuracy.mae,
        rmse = accuracy.rmse,
        mape = accuracy.mape,
        "fit summary"
    );

    let output = config.output_path();
    parameters.save(&output)?;

    Ok(TrainingOutcome {
        parameters,
        summary,
        accuracy,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;

    fn hourly_series(days: i64) -> LoadSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rows = (0..days * 24)
            .map(|i| {
                let hour = (i % 24) as f64;
                let value = 50_000.0
                    + 8_000.0 * (hour / 24.0 * std::f64::consts::TAU).sin()
                    + (i % 7) as f64 * 150.0;
                (start + Duration::hours(i), value)
            })
            .collect();
        LoadSeries::new(rows)
    }

    #[test]
    fn sarimax_defaults_to_a_daily_season() {
        let series = hourly_series(3);
        let params = TrainConfig::new(ModelVariant::Sarimax)
            .parameters(&series)
            .unwrap();
        assert_eq!(
            params,
            ModelParameters::Sarima(SarimaParameters::daily(24))
        );
    }

    #[test]
    fn mismatched_options_are_rejected() {
        let series = hourly_series(2);
        let mut config = TrainConfig::new(ModelVariant::Autoregressive);
        config.order = Some(ArimaOrder { p: 2, d: 0, q: 0 });
        assert!(matches!(
            config.parameters(&series),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn writes_the_parameter_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TrainConfig::new(ModelVariant::Autoregressive);
        config.lags = Some(3);
        config.output = Some(dir.path().join("ar.json"));

        let outcome = train(&config, &hourly_series(5)).unwrap();
        assert_eq!(outcome.summary.model, "AR(3)");
        assert_eq!(
            ModelParameters::load(&outcome.output).unwrap(),
            ModelParameters::Autoregressive(ArParameters { lags: 3 })
        );
    }

    #[test]
    fn failed_fit_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TrainConfig::new(ModelVariant::Autoregressive);
        config.lags = Some(40);
        config.output = Some(dir.path().join("ar.json"));

        assert!(train(&config, &hourly_series(2)).is_err());
        assert!(!dir.path().join("ar.json").exists());
    }
}

//! Prediction service: refit the persisted model structure on an upload
//!
//! Every request fits fresh coefficients against the uploaded series using
//! the order or lag held by the [`ParameterStore`], then reports the fit, a
//! genuine one-step-ahead forecast and a small sample.

use crate::error::{ForecastError, Result};
use crate::metrics::forecast_accuracy;
use crate::models::ModelVariant;
use crate::params::ModelParameters;
use crate::store::ParameterStore;
use crate::upload::{parse_upload, UploadedSeries};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Settings of the prediction service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Rows returned in the result sample
    pub sample_size: usize,
    /// Coverage of the next-value prediction interval
    pub confidence_level: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sample_size: 5,
            confidence_level: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub observation_count: usize,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInterval {
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Mean squared error of the in-sample predictions
    pub mse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub timestamp: NaiveDateTime,
    pub consumption: f64,
    pub prediction: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warnings {
    pub dropped_rows: usize,
    pub invalid_timestamp_rows: usize,
    pub invalid_consumption_rows: usize,
}

/// Outcome of one successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub model: String,
    pub metadata: Metadata,
    pub last_value: f64,
    pub next_prediction: f64,
    pub next_prediction_interval: PredictionInterval,
    pub statistics: SeriesStatistics,
    pub sample: Vec<SampleRow>,
    pub warnings: Warnings,
}

/// Per-file outcomes of a batch, in upload order
pub type BatchResults = Vec<(String, Result<PredictionResult>)>;

/// Runs predictions against the parameters held by a store
#[derive(Debug, Clone)]
pub struct PredictionService {
    store: Arc<ParameterStore>,
    config: ServiceConfig,
}

impl PredictionService {
    pub fn new(store: Arc<ParameterStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Predict one uploaded file with `variant`
    ///
    /// Fails fast with [`ForecastError::ModelUnavailable`] before reading the
    /// upload when the variant has no parameters.
    pub fn predict(&self, upload: &[u8], variant: ModelVariant) -> Result<PredictionResult> {
        let params = self.store.get(variant)?;
        self.predict_with_parameters(upload, &params)
    }

    /// Predict one uploaded file with parameters already taken from the store
    ///
    /// Lets a caller resolve the parameters once and apply the same set to
    /// every file of a request, even if the store is reloaded meanwhile.
    pub fn predict_with_parameters(
        &self,
        upload: &[u8],
        params: &ModelParameters,
    ) -> Result<PredictionResult> {
        let series = parse_upload(upload)?;
        self.predict_series(&series, params)
    }

    /// Predict every file independently
    ///
    /// A missing parameter set fails the whole batch; any other failure is
    /// recorded against its file only.
    pub fn predict_batch(
        &self,
        files: &[(String, Vec<u8>)],
        variant: ModelVariant,
    ) -> Result<BatchResults> {
        let params = self.store.get(variant)?;

        let results: BatchResults = files
            .par_iter()
            .map(|(name, bytes)| {
                let outcome = self.predict_with_parameters(bytes, &params);
                if let Err(e) = &outcome {
                    warn!(file = %name, %variant, error = %e, "prediction failed");
                }
                (name.clone(), outcome)
            })
            .collect();

        info!(
            %variant,
            files = results.len(),
            failed = results.iter().filter(|(_, r)| r.is_err()).count(),
            "batch prediction finished"
        );
        Ok(results)
    }

    /// Fit `params` on an already parsed upload and summarise
    pub fn predict_series(
        &self,
        series: &UploadedSeries,
        params: &ModelParameters,
    ) -> Result<PredictionResult> {
        let consumption = series.consumption();
        let timestamps = series.timestamps();
        let (Some(&period_start), Some(&period_end), Some(&last_value)) =
            (timestamps.first(), timestamps.last(), consumption.last())
        else {
            return Err(ForecastError::EmptyAfterCleaning {
                dropped: series.dropped_rows(),
            });
        };

        let model = params.fit(consumption)?;
        let in_sample = model.in_sample();
        let accuracy = forecast_accuracy(in_sample, consumption)?;

        let next = model.forecast(1)?;
        let intervals = next.intervals(self.config.confidence_level)?;
        let (Some(&next_prediction), Some(&(lower, upper))) =
            (next.values().first(), intervals.first())
        else {
            return Err(ForecastError::Training(format!(
                "{} produced no one-step forecast",
                model.name()
            )));
        };

        let sample = timestamps
            .iter()
            .zip(consumption)
            .zip(in_sample)
            .take(self.config.sample_size)
            .map(|((timestamp, consumption), prediction)| SampleRow {
                timestamp: *timestamp,
                consumption: *consumption,
                prediction: *prediction,
            })
            .collect();

        debug!(
            model = model.name(),
            observations = consumption.len(),
            mse = accuracy.mse,
            next_prediction,
            "prediction complete"
        );

        Ok(PredictionResult {
            model: model.name().to_string(),
            metadata: Metadata {
                observation_count: consumption.len(),
                period_start,
                period_end,
            },
            last_value,
            next_prediction,
            next_prediction_interval: PredictionInterval {
                lower,
                upper,
                confidence_level: self.config.confidence_level,
            },
            statistics: SeriesStatistics {
                mean: statrs::statistics::Statistics::mean(consumption),
                min: statrs::statistics::Statistics::min(consumption),
                max: statrs::statistics::Statistics::max(consumption),
                mse: accuracy.mse,
            },
            sample,
            warnings: Warnings {
                dropped_rows: series.dropped_rows(),
                invalid_timestamp_rows: series.invalid_timestamp_rows,
                invalid_consumption_rows: series.invalid_consumption_rows,
            },
        })
    }
}

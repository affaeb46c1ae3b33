//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error over non-zero actuals
    pub mape: f64,
    /// Pairs the metrics were computed over
    pub count: usize,
}

/// Compare in-sample predictions with actual values
///
/// Positions where the prediction is missing are skipped, so the leading
/// undefined predictions of a lagged model never count as errors.
pub fn forecast_accuracy(predicted: &[Option<f64>], actual: &[f64]) -> Result<ForecastAccuracy> {
    if predicted.len() != actual.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "Prediction length ({}) doesn't match actual length ({})",
            predicted.len(),
            actual.len()
        )));
    }

    let pairs: Vec<(f64, f64)> = predicted
        .iter()
        .zip(actual)
        .filter_map(|(p, a)| p.map(|p| (p, *a)))
        .collect();
    if pairs.is_empty() {
        return Err(ForecastError::InsufficientData(
            "no position has both a prediction and an actual value".to_string(),
        ));
    }

    let n = pairs.len() as f64;
    let mae = pairs.iter().map(|(p, a)| (a - p).abs()).sum::<f64>() / n;
    let mse = pairs.iter().map(|(p, a)| (a - p).powi(2)).sum::<f64>() / n;

    let percentage: Vec<f64> = pairs
        .iter()
        .filter(|(_, a)| *a != 0.0)
        .map(|(p, a)| ((a - p) / a).abs() * 100.0)
        .collect();
    let mape = if percentage.is_empty() {
        f64::NAN
    } else {
        percentage.iter().sum::<f64>() / percentage.len() as f64
    };

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse: mse.sqrt(),
        mape,
        count: pairs.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn skips_missing_predictions() {
        let predicted = [None, Some(11.0), Some(18.0)];
        let actual = [5.0, 10.0, 20.0];
        let accuracy = forecast_accuracy(&predicted, &actual).unwrap();

        assert_eq!(accuracy.count, 2);
        assert_relative_eq!(accuracy.mae, 1.5);
        assert_relative_eq!(accuracy.mse, 2.5);
        assert_relative_eq!(accuracy.rmse, 2.5_f64.sqrt());
        assert_relative_eq!(accuracy.mape, 10.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(forecast_accuracy(&[Some(1.0)], &[1.0, 2.0]).is_err());
        assert!(forecast_accuracy(&[None], &[1.0]).is_err());
    }
}

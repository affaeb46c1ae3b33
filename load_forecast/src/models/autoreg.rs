//! Plain autoregression with an intercept, estimated by least squares

use super::{
    check_horizon, ensure_finite, forecast_std_errors, FitSummary, ForecastModel, ForecastResult,
    TrainedForecastModel,
};
use crate::error::{ForecastError, Result};
use load_math::least_squares::ordinary_least_squares;
use load_math::MathError;
use tracing::info;

/// AR(k) model: `y_t = c + Σ β_i y_{t-i} + e_t`
#[derive(Debug, Clone)]
pub struct AutoRegressive {
    lags: usize,
    name: String,
}

impl AutoRegressive {
    pub fn new(lags: usize) -> Result<Self> {
        if lags == 0 {
            return Err(ForecastError::InvalidParameter(
                "autoregression needs at least one lag".to_string(),
            ));
        }
        Ok(Self {
            lags,
            name: format!("AR({})", lags),
        })
    }

    pub fn lags(&self) -> usize {
        self.lags
    }
}

impl ForecastModel for AutoRegressive {
    type Trained = TrainedAutoRegressive;

    fn train(&self, series: &[f64]) -> Result<TrainedAutoRegressive> {
        ensure_finite(series)?;

        let k = self.lags;
        // one row per target, one column per lag plus the intercept
        if series.len() < 2 * k + 2 {
            return Err(ForecastError::InsufficientData(format!(
                "{} needs at least {} observations, got {}",
                self.name,
                2 * k + 2,
                series.len()
            )));
        }

        let design: Vec<Vec<f64>> = (k..series.len())
            .map(|t| {
                let mut row = Vec::with_capacity(k + 1);
                row.push(1.0);
                row.extend((1..=k).map(|lag| series[t - lag]));
                row
            })
            .collect();
        let targets = &series[k..];

        let beta = ordinary_least_squares(&design, targets).map_err(|e| match e {
            MathError::Singular(detail) => ForecastError::Training(format!(
                "{} design matrix is singular: {}",
                self.name, detail
            )),
            other => ForecastError::Training(format!("{}: {}", self.name, other)),
        })?;

        let fitted: Vec<f64> = design
            .iter()
            .map(|row| row.iter().zip(&beta).map(|(x, b)| x * b).sum())
            .collect();
        let sse: f64 = fitted
            .iter()
            .zip(targets)
            .map(|(f, y)| (y - f).powi(2))
            .sum();

        let in_sample: Vec<Option<f64>> = std::iter::repeat(None)
            .take(k)
            .chain(fitted.into_iter().map(Some))
            .collect();

        let mut coefficients = vec![("const".to_string(), beta[0])];
        coefficients.extend((1..=k).map(|lag| (format!("y.L{}", lag), beta[lag])));
        let summary = FitSummary::from_sse(self.name.clone(), coefficients, sse, targets.len());

        info!(
            model = %self.name,
            observations = series.len(),
            sigma2 = summary.sigma2,
            aic = summary.aic,
            "fitted autoregression"
        );

        Ok(TrainedAutoRegressive {
            name: self.name.clone(),
            series: series.to_vec(),
            intercept: beta[0],
            weights: beta[1..].to_vec(),
            in_sample,
            summary,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// AR(k) with estimated coefficients
#[derive(Debug, Clone)]
pub struct TrainedAutoRegressive {
    name: String,
    series: Vec<f64>,
    intercept: f64,
    /// Weight of lag `i + 1` at index `i`
    weights: Vec<f64>,
    in_sample: Vec<Option<f64>>,
    summary: FitSummary,
}

impl TrainedAutoRegressive {
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl TrainedForecastModel for TrainedAutoRegressive {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        check_horizon(horizon, self.series.len())?;

        let mut history = self.series.clone();
        let mut values = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let t = history.len();
            let next = self.intercept
                + self
                    .weights
                    .iter()
                    .enumerate()
                    .map(|(i, w)| w * history[t - i - 1])
                    .sum::<f64>();
            history.push(next);
            values.push(next);
        }

        let std_errors = forecast_std_errors(&self.weights, &[], self.summary.sigma2, horizon);
        ForecastResult::new(values, std_errors)
    }

    fn in_sample(&self) -> &[Option<f64>] {
        &self.in_sample
    }

    fn summary(&self) -> &FitSummary {
        &self.summary
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn recovers_coefficients_of_a_simulated_ar2() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::new(0.0, 0.5).unwrap();
        let mut series = vec![20.0, 20.0];
        for t in 2..4000 {
            let next = 4.0 + 0.5 * series[t - 1] + 0.3 * series[t - 2] + noise.sample(&mut rng);
            series.push(next);
        }

        let fitted = AutoRegressive::new(2).unwrap().train(&series).unwrap();
        assert_relative_eq!(fitted.weights()[0], 0.5, epsilon = 0.05);
        assert_relative_eq!(fitted.weights()[1], 0.3, epsilon = 0.05);
        assert_relative_eq!(fitted.summary().sigma2, 0.25, epsilon = 0.03);
    }

    #[test]
    fn first_k_predictions_are_missing_not_zero() {
        let series: Vec<f64> = (0..40).map(|t| (t as f64 * 0.7).sin() * 5.0 + 50.0).collect();
        let fitted = AutoRegressive::new(5).unwrap().train(&series).unwrap();

        assert_eq!(fitted.in_sample().len(), 40);
        assert!(fitted.in_sample()[..5].iter().all(Option::is_none));
        assert!(fitted.in_sample()[5..].iter().all(Option::is_some));
    }

    #[test]
    fn forecast_follows_the_recursion() {
        let series: Vec<f64> = (0..30).map(|t| if t % 2 == 0 { 1.0 } else { 3.0 }).collect();
        let fitted = AutoRegressive::new(1).unwrap().train(&series).unwrap();
        let forecast = fitted.forecast(3).unwrap();

        // y_t = 4 - y_{t-1} fits the alternation exactly
        assert_relative_eq!(forecast.values()[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(forecast.values()[1], 3.0, epsilon = 1e-8);
        assert_relative_eq!(forecast.values()[2], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn constant_series_is_a_training_error() {
        let series = vec![7.0; 50];
        assert!(matches!(
            AutoRegressive::new(2).unwrap().train(&series),
            Err(ForecastError::Training(_))
        ));
    }

    #[test]
    fn short_series_is_insufficient_data() {
        assert!(matches!(
            AutoRegressive::new(5).unwrap().train(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Err(ForecastError::InsufficientData(_))
        ));
        assert!(AutoRegressive::new(0).is_err());
    }
}

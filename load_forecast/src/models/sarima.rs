//! Seasonal ARIMA estimated by conditional sum of squares
//!
//! The series is differenced by `(1-B)^d (1-B^S)^D`, demeaned when no
//! differencing applies, and the multiplicative lag polynomials
//! `(1-φ(B))(1-Φ(B^S)) w_t = (1+θ(B))(1+Θ(B^S)) e_t` are expanded into plain
//! lag lists. Coefficients are kept inside `(-1, 1)` by a `tanh` transform
//! and found with a Nelder-Mead search on the concentrated Gaussian
//! likelihood. Lags reaching before the first differenced value count as
//! zero, so every differenced value contributes a residual and a single
//! seasonal cycle is enough to fit a seasonal model.

use super::{
    check_horizon, ensure_finite, forecast_std_errors, FitSummary, ForecastModel, ForecastResult,
    TrainedForecastModel,
};
use crate::error::{ForecastError, Result};
use crate::params::{ArimaOrder, SarimaParameters, SeasonalOrder};
use load_math::optimize::NelderMead;
use load_math::statistics::{autocorrelation, mean};
use load_math::MathError;
use tracing::{debug, info};

/// Seasonal ARIMA specification
#[derive(Debug, Clone)]
pub struct Sarima {
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    optimizer: NelderMead,
    name: String,
}

impl Sarima {
    pub fn new(order: ArimaOrder, seasonal: SeasonalOrder) -> Result<Self> {
        if seasonal.is_active() && seasonal.period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal period must be at least 2 when a seasonal order is set, got {}",
                seasonal.period
            )));
        }

        let name = format!(
            "SARIMA({},{},{})({},{},{},{})",
            order.p, order.d, order.q, seasonal.p, seasonal.d, seasonal.q, seasonal.period
        );
        Ok(Self {
            order,
            seasonal,
            optimizer: NelderMead::default(),
            name,
        })
    }

    pub fn from_parameters(params: &SarimaParameters) -> Result<Self> {
        Self::new(params.order, params.seasonal_order)
    }

    /// Replace the default simplex settings
    pub fn with_optimizer(mut self, optimizer: NelderMead) -> Self {
        self.optimizer = optimizer;
        self
    }

    fn period(&self) -> usize {
        if self.seasonal.is_active() {
            self.seasonal.period
        } else {
            0
        }
    }

    fn coefficient_count(&self) -> usize {
        self.order.p + self.order.q + self.seasonal.p + self.seasonal.q
    }

    /// Split a transformed parameter vector into the four coefficient groups
    fn unpack<'a>(&self, coefficients: &'a [f64]) -> Coefficients<'a> {
        let (ar, rest) = coefficients.split_at(self.order.p);
        let (ma, rest) = rest.split_at(self.order.q);
        let (seasonal_ar, seasonal_ma) = rest.split_at(self.seasonal.p);
        Coefficients {
            ar,
            ma,
            seasonal_ar,
            seasonal_ma,
        }
    }

    fn coefficient_names(&self) -> Vec<String> {
        let s = self.period();
        let mut names = Vec::with_capacity(self.coefficient_count());
        names.extend((1..=self.order.p).map(|i| format!("ar.L{}", i)));
        names.extend((1..=self.order.q).map(|i| format!("ma.L{}", i)));
        names.extend((1..=self.seasonal.p).map(|j| format!("ar.S.L{}", j * s)));
        names.extend((1..=self.seasonal.q).map(|j| format!("ma.S.L{}", j * s)));
        names
    }

    /// Starting values from the sample autocorrelation at lags 1 and S
    fn starting_point(&self, w: &[f64]) -> Vec<f64> {
        let guess = |lag: usize| {
            autocorrelation(w, lag)
                .map(|r| r.clamp(-0.9, 0.9).atanh())
                .unwrap_or(0.0)
        };

        let mut start = vec![0.0; self.coefficient_count()];
        if self.order.p > 0 {
            start[0] = guess(1);
        }
        if self.seasonal.p > 0 {
            start[self.order.p + self.order.q] = guess(self.period());
        }
        start
    }
}

struct Coefficients<'a> {
    ar: &'a [f64],
    ma: &'a [f64],
    seasonal_ar: &'a [f64],
    seasonal_ma: &'a [f64],
}

impl Coefficients<'_> {
    /// Dense `(1-φ(B))(1-Φ(B^S))`, index = lag
    fn ar_polynomial(&self, period: usize) -> Vec<f64> {
        poly_mul(
            &lag_polynomial(self.ar, 1, -1.0),
            &lag_polynomial(self.seasonal_ar, period, -1.0),
        )
    }

    /// Dense `(1+θ(B))(1+Θ(B^S))`, index = lag
    fn ma_polynomial(&self, period: usize) -> Vec<f64> {
        poly_mul(
            &lag_polynomial(self.ma, 1, 1.0),
            &lag_polynomial(self.seasonal_ma, period, 1.0),
        )
    }
}

/// `1 + sign·Σ c_i B^(i·step)` as a dense coefficient vector
fn lag_polynomial(coefficients: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        if *x == 0.0 {
            continue;
        }
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `(1-B)^d (1-B^S)^D`
fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    for _ in 0..seasonal_d {
        poly = poly_mul(&poly, &lag_polynomial(&[1.0], period, -1.0));
    }
    poly
}

/// Non-zero `(lag, weight)` pairs of a polynomial's lags 1 and up
///
/// With `negate` the weights are flipped, turning `1 - Σφ B^k` into the
/// right-hand-side form `Σφ w_{t-k}`.
fn sparse_lags(poly: &[f64], negate: bool) -> Vec<(usize, f64)> {
    poly.iter()
        .enumerate()
        .skip(1)
        .filter(|(_, c)| **c != 0.0)
        .map(|(lag, c)| (lag, if negate { -c } else { *c }))
        .collect()
}

/// One-step predictions and residuals of the ARMA recursion on `w`
///
/// Pre-sample values and residuals are taken as zero.
fn arma_recursion(
    w: &[f64],
    ar: &[(usize, f64)],
    ma: &[(usize, f64)],
) -> (Vec<f64>, Vec<f64>, f64) {
    let mut predictions = Vec::with_capacity(w.len());
    let mut residuals: Vec<f64> = Vec::with_capacity(w.len());
    let mut sse = 0.0;

    for t in 0..w.len() {
        let mut prediction = 0.0;
        for &(lag, c) in ar {
            if lag <= t {
                prediction += c * w[t - lag];
            }
        }
        for &(lag, c) in ma {
            if lag <= t {
                prediction += c * residuals[t - lag];
            }
        }

        let residual = w[t] - prediction;
        sse += residual * residual;
        predictions.push(prediction);
        residuals.push(residual);
    }

    (predictions, residuals, sse)
}

impl ForecastModel for Sarima {
    type Trained = TrainedSarima;

    fn train(&self, series: &[f64]) -> Result<TrainedSarima> {
        ensure_finite(series)?;

        let period = self.period();
        let diff = differencing_polynomial(self.order.d, self.seasonal.d, period);
        let lost = diff.len() - 1;
        let k = self.coefficient_count();

        if series.len() <= lost + k {
            return Err(ForecastError::InsufficientData(format!(
                "{} needs more than {} observations, got {}",
                self.name,
                lost + k,
                series.len()
            )));
        }

        let differenced: Vec<f64> = (lost..series.len())
            .map(|t| {
                diff.iter()
                    .enumerate()
                    .map(|(lag, c)| c * series[t - lag])
                    .sum()
            })
            .collect();

        let level = if lost == 0 { mean(&differenced)? } else { 0.0 };
        let w: Vec<f64> = differenced.iter().map(|v| v - level).collect();
        let effective = w.len();

        let objective = |raw: &[f64]| {
            let bounded: Vec<f64> = raw.iter().map(|x| x.tanh()).collect();
            let coefficients = self.unpack(&bounded);
            let ar = sparse_lags(&coefficients.ar_polynomial(period), true);
            let ma = sparse_lags(&coefficients.ma_polynomial(period), false);
            let (_, _, sse) = arma_recursion(&w, &ar, &ma);
            0.5 * effective as f64 * (sse / effective as f64).max(f64::MIN_POSITIVE).ln()
        };

        let minimum = self
            .optimizer
            .minimize(objective, &self.starting_point(&w))
            .map_err(|e| match e {
                MathError::NotConverged { iterations, spread } => ForecastError::Training(format!(
                    "{} did not converge after {} iterations (spread {:e})",
                    self.name, iterations, spread
                )),
                other => ForecastError::Training(format!("{}: {}", self.name, other)),
            })?;
        debug!(
            model = %self.name,
            iterations = minimum.iterations,
            objective = minimum.value,
            "simplex search finished"
        );

        let bounded: Vec<f64> = minimum.point.iter().map(|x| x.tanh()).collect();
        let coefficients = self.unpack(&bounded);
        let ar_poly = coefficients.ar_polynomial(period);
        let ma_poly = coefficients.ma_polynomial(period);
        let ar = sparse_lags(&ar_poly, true);
        let ma = sparse_lags(&ma_poly, false);
        let (predictions, residuals, sse) = arma_recursion(&w, &ar, &ma);

        if !sse.is_finite() {
            return Err(ForecastError::Training(format!(
                "{} produced a non-finite residual sum of squares",
                self.name
            )));
        }

        let in_sample: Vec<Option<f64>> = (0..series.len())
            .map(|t| {
                (t >= lost).then(|| {
                    let carried: f64 = diff
                        .iter()
                        .enumerate()
                        .skip(1)
                        .map(|(lag, c)| c * series[t - lag])
                        .sum();
                    predictions[t - lost] + level - carried
                })
            })
            .collect();

        let mut named: Vec<(String, f64)> = self
            .coefficient_names()
            .into_iter()
            .zip(bounded.iter().copied())
            .collect();
        if lost == 0 {
            named.push(("intercept".to_string(), level));
        }
        let summary = FitSummary::from_sse(self.name.clone(), named, sse, effective);

        info!(
            model = %self.name,
            observations = series.len(),
            sigma2 = summary.sigma2,
            aic = summary.aic,
            "fitted seasonal model"
        );

        // Differencing folded into the autoregressive operator for error growth
        let full_ar: Vec<f64> = poly_mul(&ar_poly, &diff)
            .iter()
            .skip(1)
            .map(|c| -c)
            .collect();
        let ma_weights: Vec<f64> = ma_poly.iter().skip(1).copied().collect();

        Ok(TrainedSarima {
            name: self.name.clone(),
            series: series.to_vec(),
            w,
            residuals,
            level,
            diff,
            ar,
            ma,
            full_ar,
            ma_weights,
            in_sample,
            summary,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Seasonal ARIMA with estimated coefficients
#[derive(Debug, Clone)]
pub struct TrainedSarima {
    name: String,
    series: Vec<f64>,
    /// Differenced, demeaned series
    w: Vec<f64>,
    residuals: Vec<f64>,
    level: f64,
    diff: Vec<f64>,
    ar: Vec<(usize, f64)>,
    ma: Vec<(usize, f64)>,
    full_ar: Vec<f64>,
    ma_weights: Vec<f64>,
    in_sample: Vec<Option<f64>>,
    summary: FitSummary,
}

impl TrainedForecastModel for TrainedSarima {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        check_horizon(horizon, self.series.len())?;

        let mut w = self.w.clone();
        let mut residuals = self.residuals.clone();
        let mut levels = self.series.clone();
        let mut values = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let t = w.len();
            let mut next = 0.0;
            for &(lag, c) in &self.ar {
                if lag <= t {
                    next += c * w[t - lag];
                }
            }
            for &(lag, c) in &self.ma {
                if lag <= t {
                    next += c * residuals[t - lag];
                }
            }
            w.push(next);
            residuals.push(0.0);

            let at = levels.len();
            let carried: f64 = self
                .diff
                .iter()
                .enumerate()
                .skip(1)
                .map(|(lag, c)| c * levels[at - lag])
                .sum();
            let value = next + self.level - carried;
            levels.push(value);
            values.push(value);
        }

        let std_errors =
            forecast_std_errors(&self.full_ar, &self.ma_weights, self.summary.sigma2, horizon);
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

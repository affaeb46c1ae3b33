//! Descriptive statistics over slices

use crate::{MathError, Result};

/// Arithmetic mean of a non-empty slice
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty slice".to_string(),
        ));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Quantile with linear interpolation between closest ranks
///
/// `q` must lie in `[0, 1]`. For `n` sorted values the quantile sits at
/// position `q * (n - 1)`; fractional positions blend the two neighbours.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be between 0 and 1, got {}",
            q
        )));
    }
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take a quantile of an empty slice".to_string(),
        ));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::InvalidInput(
            "Quantile input contains NaN".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Median (the 0.5 quantile)
pub fn median(values: &[f64]) -> Result<f64> {
    quantile(values, 0.5)
}

/// Lag-`k` sample autocorrelation
///
/// Uses the biased estimator (denominator `n`), which keeps the sequence of
/// autocorrelations positive semi-definite.
pub fn autocorrelation(values: &[f64], lag: usize) -> Result<f64> {
    if values.len() <= lag {
        return Err(MathError::InsufficientData(format!(
            "Need more than {} observations for lag-{} autocorrelation, got {}",
            lag,
            lag,
            values.len()
        )));
    }

    let center = mean(values)?;
    let denominator: f64 = values.iter().map(|v| (v - center).powi(2)).sum();
    if denominator.abs() < 1e-12 {
        return Ok(0.0);
    }

    let numerator: f64 = (lag..values.len())
        .map(|i| (values[i] - center) * (values[i - lag] - center))
        .sum();

    Ok(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(1.0, 5.0)]
    #[case(0.5, 3.0)]
    #[case(0.25, 2.0)]
    #[case(0.01, 1.04)]
    #[case(0.99, 4.96)]
    fn quantile_interpolates_between_ranks(#[case] q: f64, #[case] expected: f64) {
        let values = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert_relative_eq!(quantile(&values, q).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn quantile_rejects_bad_inputs() {
        assert!(quantile(&[], 0.5).is_err());
        assert!(quantile(&[1.0], 1.5).is_err());
        assert!(quantile(&[1.0, f64::NAN], 0.5).is_err());
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn autocorrelation_of_alternating_series_is_negative() {
        let values: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let rho = autocorrelation(&values, 1).unwrap();
        assert!(rho < -0.9);
    }

    #[test]
    fn autocorrelation_of_constant_series_is_zero() {
        assert_eq!(autocorrelation(&[2.0; 10], 1).unwrap(), 0.0);
    }
}

//! Derivative-free minimisation (Nelder-Mead simplex)

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Settings for the Nelder-Mead simplex search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NelderMead {
    /// Iteration budget before giving up
    pub max_iterations: usize,
    /// Relative spread of objective values at which the simplex has converged
    pub tolerance: f64,
    /// Offset applied to each coordinate to build the initial simplex
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 5_000,
            tolerance: 1e-10,
            initial_step: 0.25,
        }
    }
}

/// Outcome of a successful minimisation
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

impl NelderMead {
    /// Minimise `objective` starting from `start`
    ///
    /// Non-finite objective values are treated as `+inf`, so the simplex moves
    /// away from them. Fails with [`MathError::NotConverged`] when the
    /// iteration budget runs out and with [`MathError::InvalidInput`] when
    /// even the best vertex has a non-finite value.
    pub fn minimize<F>(&self, mut objective: F, start: &[f64]) -> Result<Minimum>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let dim = start.len();
        let mut eval = |x: &[f64]| {
            let value = objective(x);
            if value.is_finite() {
                value
            } else {
                f64::INFINITY
            }
        };

        if dim == 0 {
            let value = eval(start);
            return finish(Vec::new(), value, 0);
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
        simplex.push(start.to_vec());
        for i in 0..dim {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        let mut iterations = 0;
        loop {
            let mut order: Vec<usize> = (0..=dim).collect();
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let best = values[0];
            let worst = values[dim];
            let spread = if worst.is_finite() {
                worst - best
            } else {
                f64::INFINITY
            };
            if spread <= self.tolerance * (best.abs() + self.tolerance) {
                return finish(simplex.swap_remove(0), best, iterations);
            }
            if iterations >= self.max_iterations {
                return Err(MathError::NotConverged { iterations, spread });
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..dim)
                .map(|k| simplex[..dim].iter().map(|v| v[k]).sum::<f64>() / dim as f64)
                .collect();
            let along = |t: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&simplex[dim])
                    .map(|(c, w)| c + t * (w - c))
                    .collect()
            };

            let reflected = along(-1.0);
            let reflected_value = eval(&reflected);

            if reflected_value < values[0] {
                let expanded = along(-2.0);
                let expanded_value = eval(&expanded);
                if expanded_value < reflected_value {
                    simplex[dim] = expanded;
                    values[dim] = expanded_value;
                } else {
                    simplex[dim] = reflected;
                    values[dim] = reflected_value;
                }
                continue;
            }

            if reflected_value < values[dim - 1] {
                simplex[dim] = reflected;
                values[dim] = reflected_value;
                continue;
            }

            let (contracted, contracted_value) = if reflected_value < values[dim] {
                let outside = along(-0.5);
                let value = eval(&outside);
                (outside, value)
            } else {
                let inside = along(0.5);
                let value = eval(&inside);
                (inside, value)
            };

            if contracted_value < values[dim].min(reflected_value) {
                simplex[dim] = contracted;
                values[dim] = contracted_value;
                continue;
            }

            // shrink toward the best vertex
            let anchor = simplex[0].clone();
            for i in 1..=dim {
                let shrunk: Vec<f64> = anchor
                    .iter()
                    .zip(&simplex[i])
                    .map(|(a, v)| a + 0.5 * (v - a))
                    .collect();
                values[i] = eval(&shrunk);
                simplex[i] = shrunk;
            }
        }
    }
}

fn finish(point: Vec<f64>, value: f64, iterations: usize) -> Result<Minimum> {
    if !value.is_finite() {
        return Err(MathError::InvalidInput(
            "Objective is not finite anywhere on the final simplex".to_string(),
        ));
    }
    Ok(Minimum {
        point,
        value,
        iterations,
    })
}

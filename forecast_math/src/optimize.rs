//! Derivative-free minimisation
//!
//! Nelder-Mead simplex search, used to estimate the coefficients of the
//! seasonal ARMA model by conditional sum of squares.

use crate::{MathError, Result};

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Nelder-Mead simplex minimiser
#[derive(Debug, Clone)]
pub struct NelderMead {
    max_iterations: usize,
    tolerance: f64,
    initial_step: f64,
}

/// Result of a successful minimisation
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Location of the best vertex
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations used
    pub iterations: usize,
}

impl NelderMead {
    /// Create a new minimiser
    pub fn new(max_iterations: usize, tolerance: f64) -> Result<Self> {
        if max_iterations == 0 {
            return Err(MathError::InvalidInput(
                "Iteration budget must be greater than zero".to_string(),
            ));
        }
        if tolerance <= 0.0 || !tolerance.is_finite() {
            return Err(MathError::InvalidInput(
                "Tolerance must be a positive finite number".to_string(),
            ));
        }

        Ok(Self {
            max_iterations,
            tolerance,
            initial_step: 0.1,
        })
    }

    /// Set the edge length of the starting simplex
    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = step;
        self
    }

    /// Minimise `objective` starting from `start`
    ///
    /// Non-finite objective values are treated as `+inf`. Fails with
    /// `NotConverged` when the simplex has not collapsed within the budget.
    pub fn minimize<F>(&self, objective: F, start: &[f64]) -> Result<Minimum>
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = start.len();
        if n == 0 {
            return Err(MathError::InvalidInput(
                "Cannot minimise over zero parameters".to_string(),
            ));
        }

        let eval = |p: &[f64]| {
            let v = objective(p);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), eval(start)));
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            let value = eval(&vertex);
            simplex.push((vertex, value));
        }

        for iteration in 0..self.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = simplex[0].1;
            let worst = simplex[n].1;
            if best.is_finite() && (worst - best).abs() <= self.tolerance * (best.abs() + 1.0) {
                let (point, value) = simplex.swap_remove(0);
                return Ok(Minimum {
                    point,
                    value,
                    iterations: iteration,
                });
            }

            // Centroid of every vertex except the worst
            let mut centroid = vec![0.0; n];
            for (vertex, _) in &simplex[..n] {
                for (c, v) in centroid.iter_mut().zip(vertex) {
                    *c += v / n as f64;
                }
            }

            let toward = |from: &[f64], coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(from)
                    .map(|(c, x)| c + coef * (x - c))
                    .collect()
            };

            let reflected = toward(&simplex[n].0, -REFLECTION);
            let reflected_value = eval(&reflected);

            if reflected_value < best {
                let expanded = toward(&reflected, EXPANSION);
                let expanded_value = eval(&expanded);
                simplex[n] = if expanded_value < reflected_value {
                    (expanded, expanded_value)
                } else {
                    (reflected, reflected_value)
                };
                continue;
            }

            if reflected_value < simplex[n - 1].1 {
                simplex[n] = (reflected, reflected_value);
                continue;
            }

            let contracted = if reflected_value < worst {
                toward(&reflected, CONTRACTION)
            } else {
                toward(&simplex[n].0, CONTRACTION)
            };
            let contracted_value = eval(&contracted);
            if contracted_value < reflected_value.min(worst) {
                simplex[n] = (contracted, contracted_value);
                continue;
            }

            let anchor = simplex[0].0.clone();
            for (vertex, value) in simplex.iter_mut().skip(1) {
                for (x, a) in vertex.iter_mut().zip(&anchor) {
                    *x = a + SHRINK * (*x - a);
                }
                *value = eval(vertex);
            }
        }

        Err(MathError::NotConverged {
            iterations: self.max_iterations,
        })
    }
}

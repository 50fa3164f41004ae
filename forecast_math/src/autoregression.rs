//! Autoregressive kernels
//!
//! Contains:
//! - Regular and seasonal differencing with exact integration
//! - Sample autocovariance and Yule-Walker estimation (Levinson-Durbin)
//! - Seasonal ARMA estimation by conditional sum of squares

use crate::optimize::NelderMead;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Difference a series at the given lag: `x[t] - x[t - lag]`
pub fn difference(series: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 || series.len() <= lag {
        return Vec::new();
    }
    (lag..series.len())
        .map(|t| series[t] - series[t - lag])
        .collect()
}

/// Undoes a chain of differencing stages
///
/// Each stage remembers its lag and the tail of the series it was applied to,
/// which is exactly what is needed to turn forecasts of the differenced series
/// back into forecasts on the original scale.
#[derive(Debug, Clone)]
pub struct Integrator {
    stages: Vec<(usize, Vec<f64>)>,
}

impl Integrator {
    /// Difference `series` once per entry of `lags`, in order
    pub fn difference(series: &[f64], lags: &[usize]) -> Result<(Vec<f64>, Self)> {
        let mut current = series.to_vec();
        let mut stages = Vec::with_capacity(lags.len());

        for &lag in lags {
            if lag == 0 {
                return Err(MathError::InvalidInput(
                    "Differencing lag must be greater than zero".to_string(),
                ));
            }
            if current.len() <= lag {
                return Err(MathError::InsufficientData(format!(
                    "Cannot difference {} values at lag {}",
                    current.len(),
                    lag
                )));
            }
            let tail = current[current.len() - lag..].to_vec();
            current = difference(&current, lag);
            stages.push((lag, tail));
        }

        Ok((current, Self { stages }))
    }

    /// Map forecasts of the differenced series back to the original scale
    pub fn integrate(&self, differenced: &[f64]) -> Vec<f64> {
        let mut current = differenced.to_vec();

        for (lag, tail) in self.stages.iter().rev() {
            let mut history = tail.clone();
            let mut restored = Vec::with_capacity(current.len());
            for w in current {
                let value = w + history[history.len() - lag];
                history.push(value);
                restored.push(value);
            }
            current = restored;
        }

        current
    }
}

/// Biased sample autocovariances of the demeaned series for lags `0..=max_lag`
pub fn autocovariance(series: &[f64], max_lag: usize) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return vec![0.0; max_lag + 1];
    }
    let mean = crate::mean(series);

    (0..=max_lag)
        .map(|lag| {
            if lag >= n {
                return 0.0;
            }
            (lag..n)
                .map(|t| (series[t] - mean) * (series[t - lag] - mean))
                .sum::<f64>()
                / n as f64
        })
        .collect()
}

/// Solve the Yule-Walker equations with the Levinson-Durbin recursion
///
/// Returns the AR coefficients `phi[0..order]` and the innovation variance.
/// A series with zero variance yields all-zero coefficients.
pub fn levinson_durbin(autocov: &[f64], order: usize) -> Result<(Vec<f64>, f64)> {
    if autocov.len() <= order {
        return Err(MathError::InsufficientData(format!(
            "Need {} autocovariances for an AR({}) fit, got {}",
            order + 1,
            order,
            autocov.len()
        )));
    }

    let mut phi = vec![0.0; order];
    let mut error = autocov[0];
    if error.abs() < 1e-12 {
        return Ok((phi, 0.0));
    }

    for k in 1..=order {
        let acc = autocov[k]
            - (1..k)
                .map(|j| phi[j - 1] * autocov[k - j])
                .sum::<f64>();
        let reflection = acc / error;

        let previous = phi.clone();
        phi[k - 1] = reflection;
        for j in 1..k {
            phi[j - 1] = previous[j - 1] - reflection * previous[k - j - 1];
        }

        error *= 1.0 - reflection * reflection;
        if !(error > 0.0) {
            return Err(MathError::CalculationError(format!(
                "Non-positive innovation variance at AR order {}",
                k
            )));
        }
    }

    Ok((phi, error))
}

/// Multiply two lag polynomials given as coefficient vectors (index = power of B)
fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Orders of a multiplicative seasonal ARMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalArmaSpec {
    /// Non-seasonal AR order
    pub p: usize,
    /// Non-seasonal MA order
    pub q: usize,
    /// Seasonal AR order
    pub seasonal_p: usize,
    /// Seasonal MA order
    pub seasonal_q: usize,
    /// Season length in periods
    pub period: usize,
}

impl SeasonalArmaSpec {
    /// Total number of free coefficients
    pub fn parameter_count(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q
    }

    /// Expand `[ar.., ma.., seasonal_ar.., seasonal_ma..]` into lag coefficients
    ///
    /// The model is `phi(B) Phi(B^s) w_t = theta(B) Theta(B^s) e_t`; the returned
    /// vectors hold the coefficients of `w_{t-k}` and `e_{t-k}` at index `k`.
    fn expand(&self, params: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (ar, rest) = params.split_at(self.p);
        let (ma, rest) = rest.split_at(self.q);
        let (sar, sma) = rest.split_at(self.seasonal_p);

        let mut ar_poly = vec![1.0];
        ar_poly.extend(ar.iter().map(|c| -c));
        let mut sar_poly = vec![0.0; self.seasonal_p * self.period + 1];
        sar_poly[0] = 1.0;
        for (j, c) in sar.iter().enumerate() {
            sar_poly[(j + 1) * self.period] = -c;
        }

        let mut ma_poly = vec![1.0];
        ma_poly.extend_from_slice(ma);
        let mut sma_poly = vec![0.0; self.seasonal_q * self.period + 1];
        sma_poly[0] = 1.0;
        for (j, c) in sma.iter().enumerate() {
            sma_poly[(j + 1) * self.period] = *c;
        }

        let ar_lags: Vec<f64> = poly_mul(&ar_poly, &sar_poly).iter().map(|c| -c).collect();
        let ma_lags = poly_mul(&ma_poly, &sma_poly);
        (ar_lags, ma_lags)
    }
}

/// A fitted ARMA recursion on a (differenced) series
#[derive(Debug, Clone)]
pub struct ArmaFit {
    /// Coefficient of `w_{t-k}` at index `k` (index 0 unused)
    ar_lags: Vec<f64>,
    /// Coefficient of `e_{t-k}` at index `k` (index 0 unused)
    ma_lags: Vec<f64>,
    /// Mean the recursion is centred on
    mean: f64,
    /// Series the model was fitted on
    history: Vec<f64>,
    /// In-sample innovations
    residuals: Vec<f64>,
    /// Free parameters in model order
    params: Vec<f64>,
}

impl ArmaFit {
    /// Wrap pure AR coefficients, e.g. from [`levinson_durbin`]
    pub fn from_ar(series: &[f64], coefficients: &[f64], mean: f64) -> Self {
        let mut ar_lags = vec![0.0];
        ar_lags.extend_from_slice(coefficients);
        let ma_lags = vec![1.0];
        let residuals = css_residuals(series, &ar_lags, &ma_lags, mean);

        Self {
            ar_lags,
            ma_lags,
            mean,
            history: series.to_vec(),
            residuals,
            params: coefficients.to_vec(),
        }
    }

    /// Estimate a seasonal ARMA model by conditional sum of squares
    ///
    /// Coefficients are searched through a `tanh` transform so that each one
    /// stays inside (-1, 1).
    pub fn fit_css(series: &[f64], spec: SeasonalArmaSpec, optimizer: &NelderMead) -> Result<Self> {
        let k = spec.parameter_count();
        if series.len() <= k {
            return Err(MathError::InsufficientData(format!(
                "Need more than {} observations to estimate {} coefficients",
                k, k
            )));
        }
        if spec.period == 0 && (spec.seasonal_p > 0 || spec.seasonal_q > 0) {
            return Err(MathError::InvalidInput(
                "Seasonal terms require a positive period".to_string(),
            ));
        }

        let params = if k == 0 {
            Vec::new()
        } else {
            let objective = |z: &[f64]| {
                let coefficients: Vec<f64> = z.iter().map(|v| v.tanh()).collect();
                let (ar_lags, ma_lags) = spec.expand(&coefficients);
                css_residuals(series, &ar_lags, &ma_lags, 0.0)
                    .iter()
                    .map(|e| e * e)
                    .sum::<f64>()
            };
            let minimum = optimizer.minimize(objective, &vec![0.0; k])?;
            minimum.point.iter().map(|v| v.tanh()).collect()
        };

        let (ar_lags, ma_lags) = spec.expand(&params);
        let residuals = css_residuals(series, &ar_lags, &ma_lags, 0.0);
        if residuals.iter().any(|e| !e.is_finite()) {
            return Err(MathError::CalculationError(
                "Seasonal ARMA residuals are not finite".to_string(),
            ));
        }

        Ok(Self {
            ar_lags,
            ma_lags,
            mean: 0.0,
            history: series.to_vec(),
            residuals,
            params,
        })
    }

    /// Free parameters in model order
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// In-sample innovations
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Forecast `horizon` steps past the end of the fitted series
    ///
    /// Future innovations are set to zero.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut values: Vec<f64> = self.history.iter().map(|v| v - self.mean).collect();
        let mut errors = self.residuals.clone();
        let start = values.len();

        for t in start..start + horizon {
            let ar: f64 = lagged_sum(&values, &self.ar_lags, t);
            let ma: f64 = lagged_sum(&errors, &self.ma_lags, t);
            values.push(ar + ma);
            errors.push(0.0);
        }

        values[start..].iter().map(|v| v + self.mean).collect()
    }
}

/// `Σ coef[k] * series[t - k]` for `k >= 1`, treating pre-sample values as zero
fn lagged_sum(series: &[f64], coefficients: &[f64], t: usize) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(k, _)| *k <= t)
        .map(|(k, c)| c * series[t - k])
        .sum()
}

/// Innovations of the ARMA recursion, conditioning on zero pre-sample values
fn css_residuals(series: &[f64], ar_lags: &[f64], ma_lags: &[f64], mean: f64) -> Vec<f64> {
    let centred: Vec<f64> = series.iter().map(|v| v - mean).collect();
    let mut residuals: Vec<f64> = Vec::with_capacity(centred.len());

    for t in 0..centred.len() {
        let ar = lagged_sum(&centred, ar_lags, t);
        let ma = lagged_sum(&residuals, ma_lags, t);
        residuals.push(centred[t] - ar - ma);
    }

    residuals
}

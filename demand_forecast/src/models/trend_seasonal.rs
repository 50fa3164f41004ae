//! Additive trend + seasonality regression
//!
//! The scaled series is modelled as a piecewise-linear trend with evenly
//! spaced changepoints plus Fourier seasonality:
//!
//! `y / y_max = k + m t + Σ δ_j (t - s_j)+ + yearly(t) + weekly(t)`
//!
//! with `t` the elapsed time scaled to [0, 1] over the training window.
//! Coefficients come from one ridge-regularised least-squares solve in which
//! changepoint deltas and seasonal terms are shrunk by their prior scales.
//! Only the `(period, quantity)` pairs are used, so gaps in the series are
//! tolerated.

use crate::data::DemandSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::utils::future_periods;
use chrono::{Datelike, NaiveDate};
use forecast_math::linalg::ridge_least_squares;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const YEAR_DAYS: f64 = 365.25;
const WEEK_DAYS: f64 = 7.0;
/// History needed before yearly seasonality is fitted
const MIN_YEARLY_SPAN_DAYS: i64 = 730;
/// History needed before weekly seasonality is fitted
const MIN_WEEKLY_SPAN_DAYS: i64 = 14;

/// Structure of the trend + seasonality regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSeasonalParams {
    /// Maximum number of trend changepoints
    pub changepoint_count: usize,
    /// Share of the history in which changepoints are placed
    pub changepoint_range: f64,
    /// Prior scale of changepoint deltas
    pub changepoint_prior_scale: f64,
    /// Prior scale of seasonal coefficients
    pub seasonality_prior_scale: f64,
    pub yearly_fourier_order: usize,
    pub weekly_fourier_order: usize,
}

impl Default for TrendSeasonalParams {
    fn default() -> Self {
        Self {
            changepoint_count: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_fourier_order: 10,
            weekly_fourier_order: 3,
        }
    }
}

impl TrendSeasonalParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        for (name, scale) in [
            ("changepoint_prior_scale", self.changepoint_prior_scale),
            ("seasonality_prior_scale", self.seasonality_prior_scale),
        ] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, scale
                )));
            }
        }
        Ok(())
    }
}

/// Trend + seasonality model
#[derive(Debug, Clone)]
pub struct TrendSeasonalModel {
    name: String,
    params: TrendSeasonalParams,
}

/// Trained trend + seasonality model
#[derive(Debug, Clone)]
pub struct TrainedTrendSeasonalModel {
    name: String,
    /// First training period, `t = 0`
    origin: NaiveDate,
    /// Training span in days, `t = 1`
    span_days: f64,
    /// Changepoint locations on the scaled time axis
    changepoints: Vec<f64>,
    yearly_order: usize,
    weekly_order: usize,
    coefficients: Vec<f64>,
    /// Divisor applied to the target before fitting
    y_scale: f64,
    last_period: NaiveDate,
}

impl TrendSeasonalModel {
    /// Create a new model, rejecting out-of-range parameters
    pub fn new(params: TrendSeasonalParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            name: "TrendSeasonal".to_string(),
            params,
        })
    }

    pub fn params(&self) -> &TrendSeasonalParams {
        &self.params
    }

    /// Changepoints at evenly spaced observation indices in the first
    /// `changepoint_range` of the history
    fn changepoints(&self, t: &[f64]) -> Vec<f64> {
        let history = (t.len() as f64 * self.params.changepoint_range).floor() as usize;
        let count = self.params.changepoint_count.min(history.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        let last_index = (history - 1) as f64;
        (1..=count)
            .map(|j| {
                let index = (last_index * j as f64 / count as f64).round() as usize;
                t[index]
            })
            .collect()
    }
}

impl TrainedTrendSeasonalModel {
    /// Regressor row for `date`
    fn features(&self, date: NaiveDate) -> Vec<f64> {
        let t = (date - self.origin).num_days() as f64 / self.span_days;
        let mut row = Vec::with_capacity(self.coefficients.len());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));

        let day = date.num_days_from_ce() as f64;
        fourier_terms(day, YEAR_DAYS, self.yearly_order, &mut row);
        fourier_terms(day, WEEK_DAYS, self.weekly_order, &mut row);
        row
    }
}

/// Append `sin`/`cos` pairs of orders `1..=order` for a cycle of `period` days
fn fourier_terms(day: f64, period: f64, order: usize, row: &mut Vec<f64>) {
    for k in 1..=order {
        let x = 2.0 * PI * k as f64 * day / period;
        row.push(x.sin());
        row.push(x.cos());
    }
}

impl ForecastModel for TrendSeasonalModel {
    type Trained = TrainedTrendSeasonalModel;

    fn train(&self, data: &DemandSeries) -> Result<Self::Trained> {
        if data.len() < 2 {
            return Err(ForecastError::ForecastingError(format!(
                "Insufficient data for {}. Need at least 2 observations.",
                self.name
            )));
        }

        let periods = data.periods();
        let origin = periods[0];
        let last_period = periods[periods.len() - 1];
        let span = (last_period - origin).num_days();
        let span_days = span as f64;

        let t: Vec<f64> = periods
            .iter()
            .map(|p| (*p - origin).num_days() as f64 / span_days)
            .collect();
        let changepoints = self.changepoints(&t);

        let min_spacing = periods
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .min()
            .unwrap_or(0);
        let yearly_order = if span >= MIN_YEARLY_SPAN_DAYS {
            self.params.yearly_fourier_order
        } else {
            0
        };
        let weekly_order = if min_spacing < 7 && span >= MIN_WEEKLY_SPAN_DAYS {
            self.params.weekly_fourier_order
        } else {
            0
        };

        let y_max = data.values().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_max > 0.0 { y_max } else { 1.0 };
        let target: Vec<f64> = data.values().iter().map(|v| v / y_scale).collect();

        let mut trained = TrainedTrendSeasonalModel {
            name: self.name.clone(),
            origin,
            span_days,
            changepoints,
            yearly_order,
            weekly_order,
            coefficients: Vec::new(),
            y_scale,
            last_period,
        };

        let design: Vec<Vec<f64>> = periods.iter().map(|p| trained.features(*p)).collect();
        let delta_penalty = 1.0 / self.params.changepoint_prior_scale.powi(2);
        let seasonal_penalty = 1.0 / self.params.seasonality_prior_scale.powi(2);
        let mut penalties = vec![0.0, 0.0];
        penalties.extend(std::iter::repeat(delta_penalty).take(trained.changepoints.len()));
        penalties.extend(std::iter::repeat(seasonal_penalty).take(2 * (yearly_order + weekly_order)));

        trained.coefficients = ridge_least_squares(&design, &target, &penalties)?;
        Ok(trained)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedTrendSeasonalModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let values = future_periods(self.last_period, horizon)
            .into_iter()
            .map(|period| {
                let row = self.features(period);
                let scaled: f64 = row
                    .iter()
                    .zip(&self.coefficients)
                    .map(|(x, b)| x * b)
                    .sum();
                scaled * self.y_scale
            })
            .collect();

        ForecastResult::continuing(self.last_period, values)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

//! ARIMA models for weekly demand

use crate::data::DemandSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use chrono::NaiveDate;
use forecast_math::autoregression::{autocovariance, levinson_durbin, ArmaFit, Integrator, SeasonalArmaSpec};
use forecast_math::optimize::NelderMead;
use serde::{Deserialize, Serialize};

/// Iteration budget of the CSS search for MA terms
pub(crate) const CSS_MAX_ITERATIONS: usize = 5000;
/// Convergence tolerance of the CSS search
pub(crate) const CSS_TOLERANCE: f64 = 1e-10;

/// Orders of a non-seasonal ARIMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 5, d: 1, q: 0 }
    }
}

/// ARIMA model (AutoRegressive Integrated Moving Average)
///
/// Pure AR structures are estimated by Yule-Walker; MA terms switch the
/// estimator to conditional sum of squares.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    order: ArimaOrder,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// Recursion on the centred, differenced series
    fit: ArmaFit,
    /// Mean removed before fitting
    level: f64,
    /// Undoes the differencing
    integrator: Integrator,
    last_period: NaiveDate,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_order(ArimaOrder { p, d, q })
    }

    pub fn from_order(order: ArimaOrder) -> Self {
        Self {
            name: format!("ARIMA({},{},{})", order.p, order.d, order.q),
            order,
        }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Fewest observations the model can be fitted on
    pub fn min_observations(&self) -> usize {
        self.order.p + self.order.d + self.order.q + 1
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &DemandSeries) -> Result<Self::Trained> {
        let ArimaOrder { p, d, q } = self.order;
        if data.len() < self.min_observations() {
            return Err(ForecastError::ForecastingError(format!(
                "Insufficient data for ARIMA({},{},{}). Need at least {} observations.",
                p,
                d,
                q,
                self.min_observations()
            )));
        }
        let last_period = data
            .last_period()
            .ok_or_else(|| ForecastError::DataError("Empty training series".to_string()))?;

        let (differenced, integrator) = Integrator::difference(data.values(), &vec![1; d])?;

        // Without differencing the recursion is centred on the sample mean,
        // otherwise it carries no drift
        let level = if d == 0 {
            forecast_math::mean(&differenced)
        } else {
            0.0
        };
        let centered: Vec<f64> = differenced.iter().map(|v| v - level).collect();

        let fit = if q == 0 {
            let autocov = autocovariance(&centered, p);
            let (coefficients, _innovation_variance) = levinson_durbin(&autocov, p)?;
            ArmaFit::from_ar(&centered, &coefficients, 0.0)
        } else {
            let spec = SeasonalArmaSpec {
                p,
                q,
                seasonal_p: 0,
                seasonal_q: 0,
                period: 1,
            };
            let optimizer = NelderMead::new(CSS_MAX_ITERATIONS, CSS_TOLERANCE)?;
            ArmaFit::fit_css(&centered, spec, &optimizer)?
        };

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            fit,
            level,
            integrator,
            last_period,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    /// Estimated coefficients of the differenced series
    pub fn coefficients(&self) -> &[f64] {
        self.fit.params()
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let differenced: Vec<f64> = self
            .fit
            .forecast(horizon)
            .into_iter()
            .map(|v| v + self.level)
            .collect();
        let values = self.integrator.integrate(&differenced);
        ForecastResult::continuing(self.last_period, values)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn weekly(values: &[f64]) -> DemandSeries {
        let start = NaiveDate::from_ymd_opt(2015, 1, 5).unwrap();
        let periods = (0..values.len())
            .map(|i| start + Duration::weeks(i as i64))
            .collect();
        DemandSeries::new("item", periods, values.to_vec()).unwrap()
    }

    #[test]
    fn test_minimum_observations() {
        let model = ArimaModel::new(5, 1, 0);
        assert_eq!(model.min_observations(), 7);
        let err = model.fit_predict(&weekly(&[1.0; 6]), 1).unwrap_err();
        assert!(err.to_string().contains("Need at least 7 observations"));
    }

    #[test]
    fn test_constant_series_is_a_random_walk() {
        let model = ArimaModel::new(5, 1, 0);
        let forecast = model.fit_predict(&weekly(&[20.0; 12]), 3).unwrap();
        for v in forecast.values() {
            assert_relative_eq!(*v, 20.0);
        }
    }

    #[test]
    fn test_forecast_periods_continue_the_grid() {
        let series = weekly(&[10.0, 12.0, 11.0, 13.0, 12.0, 14.0, 13.0, 15.0]);
        let forecast = ArimaModel::new(5, 1, 0).fit_predict(&series, 2).unwrap();
        let last = series.last_period().unwrap();
        assert_eq!(
            forecast.periods(),
            &[last + Duration::weeks(1), last + Duration::weeks(2)]
        );
        assert!(forecast.values().iter().all(|v| *v >= 0.0 && v.is_finite()));
    }

    #[test]
    fn test_ar1_without_differencing_reverts_to_mean() {
        let values: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 110.0 } else { 90.0 })
            .collect();
        let trained = ArimaModel::new(1, 0, 0).train(&weekly(&values)).unwrap();
        assert!(trained.coefficients()[0] < -0.9);

        let forecast = trained.forecast(1).unwrap();
        // Last value was 90, the alternating recursion swings back above the mean
        assert!(forecast.values()[0] > 100.0);
    }
}

//! Seasonal ARIMA models for weekly demand

use crate::data::DemandSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::{CSS_MAX_ITERATIONS, CSS_TOLERANCE};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use chrono::NaiveDate;
use forecast_math::autoregression::{ArmaFit, Integrator, SeasonalArmaSpec};
use forecast_math::optimize::NelderMead;
use serde::{Deserialize, Serialize};

/// Orders of a SARIMA(p,d,q)(P,D,Q) model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
}

impl Default for SeasonalOrder {
    fn default() -> Self {
        Self {
            p: 1,
            d: 1,
            q: 1,
            seasonal_p: 1,
            seasonal_d: 1,
            seasonal_q: 1,
        }
    }
}

impl SeasonalOrder {
    fn has_seasonal_terms(&self) -> bool {
        self.seasonal_p + self.seasonal_d + self.seasonal_q > 0
    }
}

/// SARIMA model fitted by conditional sum of squares
#[derive(Debug, Clone)]
pub struct SeasonalArimaModel {
    name: String,
    order: SeasonalOrder,
    /// Season length in periods
    period: usize,
}

/// Trained SARIMA model
#[derive(Debug, Clone)]
pub struct TrainedSeasonalArimaModel {
    name: String,
    fit: ArmaFit,
    integrator: Integrator,
    last_period: NaiveDate,
}

impl SeasonalArimaModel {
    /// Create a new SARIMA model with a season of `period` weeks
    pub fn new(order: SeasonalOrder, period: usize) -> Result<Self> {
        if order.has_seasonal_terms() && period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonal period must be at least 2, got {}",
                period
            )));
        }

        Ok(Self {
            name: format!(
                "SARIMA({},{},{})({},{},{},{})",
                order.p,
                order.d,
                order.q,
                order.seasonal_p,
                order.seasonal_d,
                order.seasonal_q,
                period
            ),
            order,
            period,
        })
    }

    pub fn order(&self) -> SeasonalOrder {
        self.order
    }

    /// Fewest observations the model can be fitted on
    ///
    /// Always more than one full season when seasonal terms are present.
    pub fn min_observations(&self) -> usize {
        let o = &self.order;
        let needed = o.d
            + o.seasonal_d * self.period
            + o.p
            + o.q
            + o.seasonal_p
            + o.seasonal_q
            + 1;
        if o.has_seasonal_terms() {
            needed.max(self.period + 1)
        } else {
            needed
        }
    }

    fn differencing_lags(&self) -> Vec<usize> {
        let mut lags = vec![1; self.order.d];
        lags.extend(std::iter::repeat(self.period).take(self.order.seasonal_d));
        lags
    }
}

impl ForecastModel for SeasonalArimaModel {
    type Trained = TrainedSeasonalArimaModel;

    fn train(&self, data: &DemandSeries) -> Result<Self::Trained> {
        if data.len() < self.min_observations() {
            return Err(ForecastError::ForecastingError(format!(
                "Insufficient data for {}. Need at least {} observations, got {}.",
                self.name,
                self.min_observations(),
                data.len()
            )));
        }
        let last_period = data
            .last_period()
            .ok_or_else(|| ForecastError::DataError("Empty training series".to_string()))?;

        let (differenced, integrator) = Integrator::difference(data.values(), &self.differencing_lags())?;

        let spec = SeasonalArmaSpec {
            p: self.order.p,
            q: self.order.q,
            seasonal_p: self.order.seasonal_p,
            seasonal_q: self.order.seasonal_q,
            period: self.period,
        };
        let optimizer = NelderMead::new(CSS_MAX_ITERATIONS, CSS_TOLERANCE)?;
        let fit = ArmaFit::fit_css(&differenced, spec, &optimizer)?;

        Ok(TrainedSeasonalArimaModel {
            name: self.name.clone(),
            fit,
            integrator,
            last_period,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSeasonalArimaModel {
    /// Estimated `[ar.., ma.., seasonal_ar.., seasonal_ma..]` coefficients
    pub fn coefficients(&self) -> &[f64] {
        self.fit.params()
    }
}

impl TrainedForecastModel for TrainedSeasonalArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let differenced = self.fit.forecast(horizon);
        let values = self.integrator.integrate(&differenced);
        ForecastResult::continuing(self.last_period, values)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

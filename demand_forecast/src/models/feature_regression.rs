//! Gradient-boosted regression on calendar features
//!
//! Demand is modelled as a function of `[iso_week_of_year, iso_year]` only,
//! never of its own lagged values.

use crate::data::DemandSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::utils::future_periods;
use chrono::{Datelike, NaiveDate};
use forecast_math::boosting::{BoostingParams, GradientBoostedRegressor};

/// Calendar regressors of one period
pub fn calendar_features(period: NaiveDate) -> Vec<f64> {
    let week = period.iso_week();
    vec![week.week() as f64, week.year() as f64]
}

/// Boosted-tree model on calendar features
#[derive(Debug, Clone)]
pub struct FeatureRegressionModel {
    name: String,
    params: BoostingParams,
}

/// Trained boosted-tree model
#[derive(Debug, Clone)]
pub struct TrainedFeatureRegressionModel {
    name: String,
    regressor: GradientBoostedRegressor,
    last_period: NaiveDate,
}

impl FeatureRegressionModel {
    /// Create a new model, rejecting out-of-range boosting parameters
    pub fn new(params: BoostingParams) -> Result<Self> {
        params
            .validate()
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        Ok(Self {
            name: format!(
                "GBT(n={}, depth={}, lr={})",
                params.n_estimators, params.max_depth, params.learning_rate
            ),
            params,
        })
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }
}

impl ForecastModel for FeatureRegressionModel {
    type Trained = TrainedFeatureRegressionModel;

    fn train(&self, data: &DemandSeries) -> Result<Self::Trained> {
        let last_period = data.last_period().ok_or_else(|| {
            ForecastError::ForecastingError(format!(
                "Insufficient data for {}. Need at least 1 observation.",
                self.name
            ))
        })?;

        let features: Vec<Vec<f64>> = data.periods().iter().map(|p| calendar_features(*p)).collect();
        let regressor = GradientBoostedRegressor::fit(&features, data.values(), &self.params)?;

        Ok(TrainedFeatureRegressionModel {
            name: self.name.clone(),
            regressor,
            last_period,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedFeatureRegressionModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let rows: Vec<Vec<f64>> = future_periods(self.last_period, horizon)
            .into_iter()
            .map(calendar_features)
            .collect();
        ForecastResult::continuing(self.last_period, self.regressor.predict_many(&rows))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

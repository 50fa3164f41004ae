//! Forecasting models for weekly demand series

use crate::config::ForecastConfig;
use crate::data::DemandSeries;
use crate::error::{ForecastError, Result};
use crate::utils::future_periods;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Forecast result containing predicted values keyed by period
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Start of each forecast period
    periods: Vec<NaiveDate>,
    /// Forecasted values
    values: Vec<f64>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(periods: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if values.len() != periods.len() {
            return Err(ForecastError::ForecastingError(format!(
                "Values length ({}) doesn't match periods ({})",
                values.len(),
                periods.len()
            )));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::ForecastingError(format!(
                "Forecast contains a non-finite value ({})",
                v
            )));
        }

        Ok(Self { periods, values })
    }

    /// Forecast for the weeks that follow `last_period`, clipped at zero
    pub fn continuing(last_period: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let periods = future_periods(last_period, values.len());
        let values = values.into_iter().map(|v| if v < 0.0 { 0.0 } else { v }).collect();
        Self::new(periods, values)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the forecast periods
    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Get the number of periods forecasted
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    /// `(period, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.periods.iter().copied().zip(self.values.iter().copied())
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for the periods after the training window
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a demand series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a demand series
    fn train(&self, data: &DemandSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;

    /// Fit on `data` and forecast the next `horizon` periods
    fn fit_predict(&self, data: &DemandSeries, horizon: usize) -> Result<ForecastResult> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be greater than zero".to_string(),
            ));
        }
        let forecast = self.train(data)?.forecast(horizon)?;
        if forecast.horizon() != horizon {
            return Err(ForecastError::ForecastingError(format!(
                "{} returned {} values for a horizon of {}",
                self.name(),
                forecast.horizon(),
                horizon
            )));
        }
        Ok(forecast)
    }
}

/// The closed set of competing model variants
///
/// Declaration order is the selection priority: on a tied score the earlier
/// variant wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    TrendSeasonal,
    Autoregressive,
    SeasonalAutoregressive,
    FeatureRegression,
}

impl ModelVariant {
    /// Every variant in priority order
    pub const PRIORITY: [ModelVariant; 4] = [
        ModelVariant::TrendSeasonal,
        ModelVariant::Autoregressive,
        ModelVariant::SeasonalAutoregressive,
        ModelVariant::FeatureRegression,
    ];

    pub fn all() -> Vec<ModelVariant> {
        Self::PRIORITY.to_vec()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelVariant::TrendSeasonal => "TrendSeasonalModel",
            ModelVariant::Autoregressive => "AutoregressiveModel",
            ModelVariant::SeasonalAutoregressive => "SeasonalAutoregressiveModel",
            ModelVariant::FeatureRegression => "FeatureRegressionModel",
        }
    }

    /// Build this variant from `config`, fit it on `train` and forecast `horizon` periods
    pub fn fit_predict(
        self,
        config: &ForecastConfig,
        train: &DemandSeries,
        horizon: usize,
    ) -> Result<ForecastResult> {
        match self {
            ModelVariant::TrendSeasonal => {
                TrendSeasonalModel::new(config.trend_seasonal)?.fit_predict(train, horizon)
            }
            ModelVariant::Autoregressive => {
                ArimaModel::from_order(config.autoregressive).fit_predict(train, horizon)
            }
            ModelVariant::SeasonalAutoregressive => SeasonalArimaModel::new(
                config.seasonal_autoregressive,
                config.seasonal_period,
            )?
            .fit_predict(train, horizon),
            ModelVariant::FeatureRegression => {
                FeatureRegressionModel::new(config.feature_regression)?
                    .fit_predict(train, horizon)
            }
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub mod arima;
pub mod feature_regression;
pub mod sarima;
pub mod trend_seasonal;

pub use arima::ArimaModel;
pub use feature_regression::FeatureRegressionModel;
pub use sarima::SeasonalArimaModel;
pub use trend_seasonal::TrendSeasonalModel;

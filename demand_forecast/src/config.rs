//! Run configuration
//!
//! Every option of a forecasting run lives in one immutable [`ForecastConfig`]
//! that is built once and passed into the pipeline.

use crate::error::{ForecastError, Result};
use crate::models::arima::ArimaOrder;
use crate::models::sarima::SeasonalOrder;
use crate::models::trend_seasonal::TrendSeasonalParams;
use crate::models::ModelVariant;
use chrono::NaiveDate;
use forecast_math::boosting::BoostingParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which interquartile filter to apply to daily `(date, item)` sums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierFilter {
    /// Keep every row
    #[default]
    Disabled,
    /// Quartiles over all rows of all items
    Global,
    /// Quartiles within each item
    PerItem,
}

/// Static parameters of one forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// First period of the held-out window
    pub cutoff_date: NaiveDate,
    /// Held-out periods to forecast; `None` uses every period from the cutoff on
    #[serde(default)]
    pub horizon: Option<usize>,
    /// Season length in weeks
    #[serde(default = "default_seasonal_period")]
    pub seasonal_period: usize,
    #[serde(default)]
    pub outlier_filter: OutlierFilter,
    /// Report items without any viable model instead of failing the run
    #[serde(default)]
    pub skip_unviable_items: bool,
    /// Accepted raw date formats; a file is read with the first one that fits all its rows
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    /// Enabled model variants
    #[serde(default = "ModelVariant::all")]
    pub variants: Vec<ModelVariant>,
    #[serde(default)]
    pub trend_seasonal: TrendSeasonalParams,
    #[serde(default)]
    pub autoregressive: ArimaOrder,
    #[serde(default)]
    pub seasonal_autoregressive: SeasonalOrder,
    #[serde(default)]
    pub feature_regression: BoostingParams,
}

fn default_seasonal_period() -> usize {
    52
}

fn default_date_formats() -> Vec<String> {
    ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .map(|f| f.to_string())
        .collect()
}

impl ForecastConfig {
    /// Create a configuration with default model parameters
    pub fn new(cutoff_date: NaiveDate) -> Self {
        Self {
            cutoff_date,
            horizon: None,
            seasonal_period: default_seasonal_period(),
            outlier_filter: OutlierFilter::default(),
            skip_unviable_items: false,
            date_formats: default_date_formats(),
            variants: ModelVariant::all(),
            trend_seasonal: TrendSeasonalParams::default(),
            autoregressive: ArimaOrder::default(),
            seasonal_autoregressive: SeasonalOrder::default(),
            feature_regression: BoostingParams::default(),
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Limit the held-out window to `horizon` periods
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Set the season length in weeks
    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self
    }

    /// Set the outlier filter
    pub fn with_outlier_filter(mut self, filter: OutlierFilter) -> Self {
        self.outlier_filter = filter;
        self
    }

    /// Restrict the competing variants
    pub fn with_variants(mut self, variants: Vec<ModelVariant>) -> Self {
        self.variants = variants;
        self
    }

    /// Skip items without a viable model instead of failing
    pub fn skipping_unviable_items(mut self) -> Self {
        self.skip_unviable_items = true;
        self
    }

    /// Enabled variants in selection priority order, without duplicates
    pub fn enabled_variants(&self) -> Vec<ModelVariant> {
        let mut variants = self.variants.clone();
        variants.sort();
        variants.dedup();
        variants
    }

    /// Check every parameter
    pub fn validate(&self) -> Result<()> {
        if self.horizon == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "horizon must be greater than zero".to_string(),
            ));
        }
        if self.seasonal_period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal_period must be at least 2, got {}",
                self.seasonal_period
            )));
        }
        if self.date_formats.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one date format is required".to_string(),
            ));
        }
        if self.variants.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one model variant must be enabled".to_string(),
            ));
        }

        self.trend_seasonal.validate()?;
        self.feature_regression
            .validate()
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        Ok(())
    }
}

//! # Pantry Forecast
//!
//! Weekly demand forecasting per menu item and projection of the winning
//! forecasts onto ingredient requirements.
//!
//! The workspace is split into two crates:
//!
//! - [`forecast_math`]: numerical kernels (differencing, autoregression,
//!   ridge least squares, Nelder-Mead, boosted trees)
//! - [`demand_forecast`]: data loading, the competing models, scoring,
//!   selection and the end-to-end pipeline
//!
//! ## Example
//!
//! ```
//! use pantry_forecast::demand_forecast::models::ModelVariant;
//!
//! let variants = ModelVariant::all();
//! assert_eq!(variants[0], ModelVariant::TrendSeasonal);
//! assert_eq!(variants.len(), 4);
//! ```

pub use demand_forecast;
pub use forecast_math;

pub use demand_forecast::{ForecastConfig, ForecastError, IngredientTable, Pipeline, PipelineReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports_are_wired() {
        assert_eq!(forecast_math::mean(&[1.0, 2.0, 3.0]), 2.0);
        assert!(IngredientTable::default().is_empty());
    }
}

//! # Demand Forecast
//!
//! A Rust library for weekly item demand forecasting and ingredient planning.
//!
//! ## Features
//!
//! - Weekly demand grids built from raw transaction logs (zero-filled, gap-free)
//! - Four competing forecasting models:
//!   - additive trend + seasonality regression
//!   - ARIMA(5,1,0)
//!   - SARIMA(1,1,1)(1,1,1)[52]
//!   - gradient-boosted trees on calendar features
//! - Held-out MAPE scoring and deterministic model selection
//! - Projection of the selected forecast onto per-item ingredient masses
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use demand_forecast::data::DataLoader;
//! use demand_forecast::pipeline::Pipeline;
//! use demand_forecast::ForecastConfig;
//!
//! let cutoff = NaiveDate::from_ymd_opt(2015, 12, 1).unwrap();
//! let config = ForecastConfig::new(cutoff);
//!
//! let transactions = DataLoader::transactions_from_csv("sales.csv")?;
//! let ingredients = DataLoader::ingredients_from_csv("ingredients.csv")?;
//!
//! let report = Pipeline::new(config)?.run(&transactions, &ingredients)?;
//! for (item, outcome) in &report.outcomes {
//!     println!("{}: {} ({})", item, outcome.winner, outcome.scores);
//! }
//! # Ok::<(), demand_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod requirements;
pub mod selection;
pub mod utils;

// Re-export commonly used types
pub use crate::config::{ForecastConfig, OutlierFilter};
pub use crate::data::{DataLoader, DemandSeries, RawTransaction, TimeSeriesDataset, Transaction};
pub use crate::error::{ForecastError, Result};
pub use crate::metrics::{EvaluationResult, Evaluator};
pub use crate::models::{ForecastModel, ForecastResult, ModelVariant, TrainedForecastModel};
pub use crate::pipeline::{Pipeline, PipelineReport};
pub use crate::requirements::{IngredientRequirement, IngredientTable, RequirementProjector};
pub use crate::selection::{ModelSelector, ScoreTable, SelectionOutcome, VariantScore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

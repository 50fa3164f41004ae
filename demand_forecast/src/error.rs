//! Error types for the demand_forecast crate

use crate::models::ModelVariant;
use crate::selection::ScoreTable;
use forecast_math::MathError;
use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A source record lacks a parseable date, item identifier or quantity
    #[error("Malformed input at record {record}: {reason}")]
    MalformedInput { record: usize, reason: String },

    /// Predictions and held-out truth do not line up period for period
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// A model variant could not be fitted for one item
    #[error("{variant} failed to fit item '{item_id}': {reason}")]
    FitFailure {
        variant: ModelVariant,
        item_id: String,
        reason: String,
    },

    /// Every model variant failed for one item
    #[error("No viable model for item '{item_id}': {scores}")]
    NoViableModel { item_id: String, scores: ScoreTable },

    /// The held-out window has no period with non-zero demand
    #[error("Score undefined: {0}")]
    UndefinedScore(String),

    /// Error related to forecasting operations
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from mathematical operations
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from JSON (de)serialisation
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    /// Whether the error is recovered locally by dropping one model variant
    pub fn is_variant_local(&self) -> bool {
        matches!(
            self,
            ForecastError::FitFailure { .. }
                | ForecastError::ForecastingError(_)
                | ForecastError::Math(_)
                | ForecastError::UndefinedScore(_)
        )
    }
}

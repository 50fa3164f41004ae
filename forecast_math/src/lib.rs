//! # Forecast Math
//!
//! Numerical building blocks for the demand forecasting models.
//! This crate has no notion of dates, items or configuration; it works on
//! plain `f64` slices so every kernel can be tested in isolation.

use thiserror::Error;

// Kernel modules
pub mod autoregression;
pub mod boosting;
pub mod linalg;
pub mod optimize;

/// Errors that can occur in forecasting math
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Optimiser did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Arithmetic mean, `0.0` for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

//! Metrics for evaluating forecast accuracy on the held-out window

use crate::data::DemandSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastResult, ModelVariant};
use chrono::NaiveDate;

/// Mean absolute percentage error as a fraction
///
/// Periods whose actual value is exactly zero carry no percentage error and
/// are left out of the mean. Fails with `UndefinedScore` when no period is
/// left to score.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::Alignment(format!(
            "{} predictions for {} actual values",
            predicted.len(),
            actual.len()
        )));
    }

    let (sum, count) = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| **a != 0.0)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((a - p) / a).abs(), count + 1)
        });

    if count == 0 {
        return Err(ForecastError::UndefinedScore(format!(
            "none of the {} held-out periods has non-zero demand",
            actual.len()
        )));
    }

    Ok(sum / count as f64)
}

/// Score of one variant on one item
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub variant: ModelVariant,
    /// MAPE as a fraction, lower is better
    pub score: f64,
    /// Predictions aligned with the held-out periods
    pub predictions: ForecastResult,
}

/// Scores predictions against held-out truth
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// MAPE of `predictions` against `truth`
    ///
    /// The two sequences must carry the same periods in the same positions.
    pub fn score(&self, predictions: &ForecastResult, truth: &DemandSeries) -> Result<f64> {
        let predicted: Vec<(NaiveDate, f64)> = predictions.iter().collect();
        let actual: Vec<(NaiveDate, f64)> = truth
            .periods()
            .iter()
            .copied()
            .zip(truth.values().iter().copied())
            .collect();
        self.score_pairs(&predicted, &actual)
    }

    /// MAPE of period-keyed predictions against period-keyed truth
    ///
    /// Keys are compared position by position before any value is used. Terms
    /// are summed in period order, so permuting both inputs the same way gives
    /// an identical score.
    pub fn score_pairs(&self, predicted: &[(NaiveDate, f64)], actual: &[(NaiveDate, f64)]) -> Result<f64> {
        if predicted.len() != actual.len() {
            return Err(ForecastError::Alignment(format!(
                "{} predictions for {} held-out periods",
                predicted.len(),
                actual.len()
            )));
        }
        if let Some(((p, _), (a, _))) = predicted
            .iter()
            .zip(actual)
            .find(|((p, _), (a, _))| p != a)
        {
            return Err(ForecastError::Alignment(format!(
                "prediction for {} is aligned with truth for {}",
                p, a
            )));
        }

        let mut order: Vec<usize> = (0..actual.len()).collect();
        order.sort_by_key(|&i| actual[i].0);
        let actual_values: Vec<f64> = order.iter().map(|&i| actual[i].1).collect();
        let predicted_values: Vec<f64> = order.iter().map(|&i| predicted[i].1).collect();

        mean_absolute_percentage_error(&actual_values, &predicted_values)
    }

    /// Score `predictions` and keep them with the result
    pub fn evaluate(
        &self,
        variant: ModelVariant,
        predictions: ForecastResult,
        truth: &DemandSeries,
    ) -> Result<EvaluationResult> {
        let score = self.score(&predictions, truth)?;
        Ok(EvaluationResult {
            variant,
            score,
            predictions,
        })
    }
}

//! Model selection by held-out MAPE
//!
//! For every item each enabled variant is fitted on the training window,
//! forecasts the held-out window and is scored. The lowest score wins; scores
//! within [`TIE_TOLERANCE`] of the minimum are ties, resolved in favour of the
//! variant that comes first in [`ModelVariant::PRIORITY`].

use crate::config::ForecastConfig;
use crate::data::DemandSeries;
use crate::error::{ForecastError, Result};
use crate::metrics::{EvaluationResult, Evaluator};
use crate::models::{ForecastResult, ModelVariant};
use crate::requirements::ForecastRow;
use approx::relative_eq;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Absolute and relative distance under which two scores are tied
pub const TIE_TOLERANCE: f64 = 1e-12;

/// What one variant produced for one item
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// Fitted and scored
    Scored(EvaluationResult),
    /// Fitted, but no held-out week had demand to score against
    Unscored {
        predictions: ForecastResult,
        reason: String,
    },
    /// Could not be fitted or forecast
    Failed(String),
}

/// Score of one variant, or why it has none
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariantScore {
    Scored { score: f64 },
    /// Fitted, but the held-out window gave nothing to score
    Undefined { reason: String },
    Unavailable { reason: String },
}

impl VariantScore {
    pub fn score(&self) -> Option<f64> {
        match self {
            VariantScore::Scored { score } => Some(*score),
            VariantScore::Undefined { .. } | VariantScore::Unavailable { .. } => None,
        }
    }
}

/// Every variant's score for one item
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScoreTable {
    scores: BTreeMap<ModelVariant, VariantScore>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variant: ModelVariant, score: VariantScore) {
        self.scores.insert(variant, score);
    }

    pub fn get(&self, variant: ModelVariant) -> Option<&VariantScore> {
        self.scores.get(&variant)
    }

    /// Score of `variant`, `None` when it is unavailable or absent
    pub fn score(&self, variant: ModelVariant) -> Option<f64> {
        self.get(variant).and_then(VariantScore::score)
    }

    /// Entries in priority order
    pub fn iter(&self) -> impl Iterator<Item = (ModelVariant, &VariantScore)> {
        self.scores.iter().map(|(v, s)| (*v, s))
    }

    /// Variants that produced a score
    pub fn scored(&self) -> impl Iterator<Item = (ModelVariant, f64)> + '_ {
        self.iter().filter_map(|(v, s)| s.score().map(|score| (v, score)))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl fmt::Display for ScoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (variant, score) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match score {
                VariantScore::Scored { score } => write!(f, "{}={:.4}", variant, score)?,
                VariantScore::Undefined { reason } => write!(f, "{}=undefined ({})", variant, reason)?,
                VariantScore::Unavailable { reason } => {
                    write!(f, "{}=unavailable ({})", variant, reason)?
                }
            }
        }
        Ok(())
    }
}

/// Selected model of one item
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOutcome {
    pub item_id: String,
    pub winner: ModelVariant,
    /// Winner's held-out MAPE; `None` when no held-out week had demand
    pub score: Option<f64>,
    /// Winner's predictions over the held-out window
    pub forecast: ForecastResult,
    /// Every enabled and disabled variant
    pub scores: ScoreTable,
}

impl SelectionOutcome {
    /// The winning forecast as `(period, item, quantity)` rows
    pub fn forecast_rows(&self) -> Vec<ForecastRow> {
        self.forecast
            .iter()
            .map(|(period_start, predicted_quantity)| ForecastRow {
                period_start,
                item_id: self.item_id.clone(),
                predicted_quantity,
            })
            .collect()
    }
}

/// Runs the fit / predict / score / select cycle for one item at a time
#[derive(Debug, Clone)]
pub struct ModelSelector {
    config: ForecastConfig,
    evaluator: Evaluator,
}

impl ModelSelector {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            config,
            evaluator: Evaluator::new(),
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Select the best variant for `train`, scored on `test`
    ///
    /// A variant that fails to fit is recorded as unavailable. When the
    /// held-out window has no demand at all, fitted variants are recorded as
    /// undefined and the first of them in priority order is kept without a
    /// score. Misaligned predictions are fatal, as is the failure of every
    /// variant to fit.
    pub fn select(&self, train: &DemandSeries, test: &DemandSeries) -> Result<SelectionOutcome> {
        let item_id = train.item_id();
        if test.is_empty() {
            return Err(ForecastError::InvalidParameter(format!(
                "Held-out window of item '{}' is empty",
                item_id
            )));
        }

        let enabled = self.config.enabled_variants();
        let mut scores = ScoreTable::new();
        for variant in ModelVariant::PRIORITY {
            if !enabled.contains(&variant) {
                scores.insert(
                    variant,
                    VariantScore::Unavailable {
                        reason: "disabled by configuration".to_string(),
                    },
                );
            }
        }

        #[cfg(feature = "parallel")]
        let attempts: Vec<(ModelVariant, Result<Attempt>)> = enabled
            .par_iter()
            .map(|variant| (*variant, self.evaluate(*variant, train, test)))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let attempts: Vec<(ModelVariant, Result<Attempt>)> = enabled
            .iter()
            .map(|variant| (*variant, self.evaluate(*variant, train, test)))
            .collect();

        let mut results = Vec::with_capacity(attempts.len());
        let mut unscored = Vec::new();
        for (variant, attempt) in attempts {
            match attempt? {
                Attempt::Scored(result) => {
                    scores.insert(variant, VariantScore::Scored { score: result.score });
                    results.push(result);
                }
                Attempt::Unscored { predictions, reason } => {
                    scores.insert(variant, VariantScore::Undefined { reason });
                    unscored.push((variant, predictions));
                }
                Attempt::Failed(reason) => {
                    scores.insert(variant, VariantScore::Unavailable { reason });
                }
            }
        }

        if let Some(winner) = Self::pick_winner(&results) {
            info!(
                item = item_id,
                winner = %winner.variant,
                score = winner.score,
                "Selected model"
            );
            return Ok(SelectionOutcome {
                item_id: item_id.to_string(),
                winner: winner.variant,
                score: Some(winner.score),
                forecast: winner.predictions.clone(),
                scores,
            });
        }

        // Nothing to compare on: the first fitted variant in priority order
        match unscored.into_iter().min_by_key(|(variant, _)| *variant) {
            Some((variant, predictions)) => {
                warn!(
                    item = item_id,
                    winner = %variant,
                    "No held-out demand to score against, keeping the first fitted variant"
                );
                Ok(SelectionOutcome {
                    item_id: item_id.to_string(),
                    winner: variant,
                    score: None,
                    forecast: predictions,
                    scores,
                })
            }
            None => Err(ForecastError::NoViableModel {
                item_id: item_id.to_string(),
                scores,
            }),
        }
    }

    /// Fit, forecast and score one variant
    ///
    /// Errors returned here abort the selection; everything recoverable is an
    /// [`Attempt`].
    pub fn evaluate(
        &self,
        variant: ModelVariant,
        train: &DemandSeries,
        test: &DemandSeries,
    ) -> Result<Attempt> {
        debug!(item = train.item_id(), variant = %variant, observations = train.len(), "Fitting variant");

        let predictions = match variant.fit_predict(&self.config, train, test.len()) {
            Ok(predictions) => predictions,
            Err(e) => {
                let failure = ForecastError::FitFailure {
                    variant,
                    item_id: train.item_id().to_string(),
                    reason: e.to_string(),
                };
                warn!(error = %failure, "Variant excluded");
                return Ok(Attempt::Failed(e.to_string()));
            }
        };

        match self.evaluator.score(&predictions, test) {
            Ok(score) => {
                debug!(item = train.item_id(), variant = %variant, score, "Scored variant");
                Ok(Attempt::Scored(EvaluationResult {
                    variant,
                    score,
                    predictions,
                }))
            }
            Err(ForecastError::UndefinedScore(reason)) => {
                debug!(item = train.item_id(), variant = %variant, %reason, "Variant left unscored");
                Ok(Attempt::Unscored { predictions, reason })
            }
            Err(e) if e.is_variant_local() => {
                warn!(item = train.item_id(), variant = %variant, error = %e, "Variant excluded");
                Ok(Attempt::Failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Lowest score, ties going to the earliest variant in priority order
    pub fn pick_winner(results: &[EvaluationResult]) -> Option<&EvaluationResult> {
        let best = results.iter().map(|r| r.score).fold(f64::INFINITY, f64::min);
        results
            .iter()
            .filter(|r| {
                relative_eq!(
                    r.score,
                    best,
                    epsilon = TIE_TOLERANCE,
                    max_relative = TIE_TOLERANCE
                )
            })
            .min_by_key(|r| r.variant)
    }
}

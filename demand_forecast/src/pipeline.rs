//! End-to-end forecasting run
//!
//! Raw transactions → weekly grid → train/test split → per-item model
//! selection → ingredient requirements.

use crate::config::ForecastConfig;
use crate::data::{RawTransaction, TimeSeriesDataset, Transaction};
use crate::error::{ForecastError, Result};
use crate::models::ModelVariant;
use crate::requirements::{ForecastRow, IngredientRequirement, IngredientTable, RequirementProjector};
use crate::selection::{ModelSelector, ScoreTable, SelectionOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::{info, warn};

/// An item left out of the run because no variant could forecast it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub item_id: String,
    pub scores: ScoreTable,
}

/// Everything a run produces
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Selection per item, in item order
    pub outcomes: BTreeMap<String, SelectionOutcome>,
    pub skipped_items: Vec<SkippedItem>,
    pub requirements: Vec<IngredientRequirement>,
}

#[derive(Serialize)]
struct ItemScores<'a> {
    winner: Option<ModelVariant>,
    score: Option<f64>,
    scores: &'a ScoreTable,
}

impl PipelineReport {
    /// Winning forecasts of every item
    pub fn forecast_rows(&self) -> Vec<ForecastRow> {
        self.outcomes
            .values()
            .flat_map(SelectionOutcome::forecast_rows)
            .collect()
    }

    /// Write the winner and score table of every item, skipped ones included, as JSON
    pub fn write_scores_json<W: Write>(&self, writer: W) -> Result<()> {
        let mut report: BTreeMap<&str, ItemScores<'_>> = self
            .outcomes
            .iter()
            .map(|(item, outcome)| {
                (
                    item.as_str(),
                    ItemScores {
                        winner: Some(outcome.winner),
                        score: outcome.score,
                        scores: &outcome.scores,
                    },
                )
            })
            .collect();
        for skipped in &self.skipped_items {
            report.insert(
                skipped.item_id.as_str(),
                ItemScores {
                    winner: None,
                    score: None,
                    scores: &skipped.scores,
                },
            );
        }

        serde_json::to_writer_pretty(writer, &report)?;
        Ok(())
    }
}

/// A configured forecasting run
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: ForecastConfig,
    selector: ModelSelector,
    projector: RequirementProjector,
}

impl Pipeline {
    /// Validate `config` and prepare a run
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            selector: ModelSelector::new(config.clone()),
            projector: RequirementProjector::new(),
            config,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Validate raw rows and build the weekly grid
    pub fn build_dataset(&self, raw: &[RawTransaction]) -> Result<TimeSeriesDataset> {
        TimeSeriesDataset::from_raw(raw, &self.config.date_formats, self.config.outlier_filter)
    }

    /// Run on raw transaction rows
    pub fn run(&self, raw: &[RawTransaction], ingredients: &IngredientTable) -> Result<PipelineReport> {
        let dataset = self.build_dataset(raw)?;
        self.run_dataset(&dataset, ingredients)
    }

    /// Run on already validated transactions
    pub fn run_transactions(
        &self,
        transactions: &[Transaction],
        ingredients: &IngredientTable,
    ) -> Result<PipelineReport> {
        let dataset = TimeSeriesDataset::from_transactions(transactions, self.config.outlier_filter)?;
        self.run_dataset(&dataset, ingredients)
    }

    /// Run on a weekly grid
    pub fn run_dataset(&self, dataset: &TimeSeriesDataset, ingredients: &IngredientTable) -> Result<PipelineReport> {
        let cutoff = self.config.cutoff_date;
        let (train, test) = dataset.split_at(cutoff);

        let (first, last) = match (dataset.periods().first(), dataset.periods().last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(ForecastError::DataError("Dataset has no periods".to_string())),
        };
        if train.periods().is_empty() {
            return Err(ForecastError::DataError(format!(
                "No training periods before cutoff {} (data spans {} to {})",
                cutoff, first, last
            )));
        }
        if test.periods().is_empty() {
            return Err(ForecastError::DataError(format!(
                "No held-out periods at or after cutoff {} (data spans {} to {})",
                cutoff, first, last
            )));
        }

        let available = test.periods().len();
        let horizon = match self.config.horizon {
            Some(h) if h > available => {
                return Err(ForecastError::DataError(format!(
                    "Horizon of {} periods exceeds the {} held-out periods from {}",
                    h, available, cutoff
                )))
            }
            Some(h) => h,
            None => available,
        };

        info!(
            items = dataset.item_count(),
            train_periods = train.periods().len(),
            horizon,
            %cutoff,
            "Starting model selection"
        );

        let mut report = PipelineReport::default();
        for item_id in dataset.items() {
            let (train_series, test_series) = match (train.series(item_id), test.series(item_id)) {
                (Some(train_series), Some(test_series)) => (train_series, test_series.head(horizon)),
                _ => {
                    return Err(ForecastError::DataError(format!(
                        "Item '{}' is missing from the split",
                        item_id
                    )))
                }
            };

            match self.selector.select(&train_series, &test_series) {
                Ok(outcome) => {
                    report.outcomes.insert(item_id.to_string(), outcome);
                }
                Err(ForecastError::NoViableModel { item_id, scores }) if self.config.skip_unviable_items => {
                    warn!(item = %item_id, %scores, "Skipping item without a viable model");
                    report.skipped_items.push(SkippedItem { item_id, scores });
                }
                Err(e) => return Err(e),
            }
        }

        report.requirements = self.projector.project(&report.forecast_rows(), ingredients);
        info!(
            forecast_items = report.outcomes.len(),
            skipped_items = report.skipped_items.len(),
            requirement_rows = report.requirements.len(),
            "Run finished"
        );
        Ok(report)
    }

    pub fn projector(&self) -> &RequirementProjector {
        &self.projector
    }
}

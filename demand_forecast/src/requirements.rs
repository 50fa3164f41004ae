//! Projection of forecast demand onto ingredient requirements

use crate::error::{ForecastError, Result};
use crate::utils::normalize_name;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One row of the static ingredient table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRow {
    #[serde(alias = "pizza_name_id")]
    pub item_id: String,
    #[serde(alias = "pizza_ingredients")]
    pub ingredient_name: String,
    #[serde(alias = "Items_Qty_In_Grams")]
    pub mass_per_unit_grams: f64,
}

/// One line of an ingredient sheet as it appears on disk
///
/// Continuation lines may leave the item and mass blank; they repeat the
/// values of the line above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIngredientRow {
    #[serde(alias = "pizza_name_id", default)]
    pub item_id: Option<String>,
    #[serde(alias = "pizza_ingredients", default)]
    pub ingredient_name: Option<String>,
    #[serde(alias = "Items_Qty_In_Grams", default)]
    pub mass_per_unit_grams: Option<f64>,
}

impl IngredientRow {
    /// Fill blank items and masses from the previous line
    ///
    /// A blank item or mass on the first line, or a blank ingredient name on
    /// any line, is `MalformedInput`.
    pub fn forward_fill(raw: Vec<RawIngredientRow>) -> Result<Vec<IngredientRow>> {
        let mut previous: Option<(String, f64)> = None;
        let mut rows = Vec::with_capacity(raw.len());

        for (record, row) in raw.into_iter().enumerate() {
            let item_id = row
                .item_id
                .filter(|id| !id.trim().is_empty())
                .or_else(|| previous.as_ref().map(|(id, _)| id.clone()))
                .ok_or_else(|| ForecastError::MalformedInput {
                    record,
                    reason: "missing item identifier".to_string(),
                })?;
            let mass = row
                .mass_per_unit_grams
                .or_else(|| previous.as_ref().map(|(_, mass)| *mass))
                .ok_or_else(|| ForecastError::MalformedInput {
                    record,
                    reason: "missing ingredient mass".to_string(),
                })?;
            let ingredient_name = row.ingredient_name.ok_or_else(|| ForecastError::MalformedInput {
                record,
                reason: "missing ingredient name".to_string(),
            })?;

            previous = Some((item_id.clone(), mass));
            rows.push(IngredientRow {
                item_id,
                ingredient_name,
                mass_per_unit_grams: mass,
            });
        }

        Ok(rows)
    }
}

/// Mass of one ingredient needed per unit of an item
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub mass_per_unit_grams: f64,
}

/// Ingredients of every item, read-only once built
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientTable {
    items: BTreeMap<String, Vec<Ingredient>>,
}

impl IngredientTable {
    /// Validate and index `rows`
    ///
    /// Ingredient names are trimmed with inner whitespace collapsed.
    pub fn new(rows: Vec<IngredientRow>) -> Result<Self> {
        let mut items: BTreeMap<String, Vec<Ingredient>> = BTreeMap::new();

        for (record, row) in rows.into_iter().enumerate() {
            let item_id = row.item_id.trim();
            let name = normalize_name(&row.ingredient_name);
            if item_id.is_empty() || name.is_empty() {
                return Err(ForecastError::MalformedInput {
                    record,
                    reason: "missing item or ingredient name".to_string(),
                });
            }
            if !row.mass_per_unit_grams.is_finite() || row.mass_per_unit_grams < 0.0 {
                return Err(ForecastError::MalformedInput {
                    record,
                    reason: format!("invalid ingredient mass {}", row.mass_per_unit_grams),
                });
            }

            items.entry(item_id.to_string()).or_default().push(Ingredient {
                name,
                mass_per_unit_grams: row.mass_per_unit_grams,
            });
        }

        Ok(Self { items })
    }

    /// Ingredients of `item_id`; empty when the item has no mapping
    pub fn ingredients_for(&self, item_id: &str) -> &[Ingredient] {
        self.items.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mapped items in sorted order
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Number of ingredient rows
    pub fn len(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One forecast `(period, item, quantity)` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub period_start: NaiveDate,
    pub item_id: String,
    pub predicted_quantity: f64,
}

/// Projected need for one ingredient of one item in one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientRequirement {
    pub period_start: NaiveDate,
    pub item_id: String,
    pub predicted_quantity: f64,
    pub ingredient_name: String,
    #[serde(skip_serializing)]
    pub ingredient_mass_per_unit: f64,
    pub projected_total_mass: f64,
}

/// Joins forecasts with the ingredient table
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementProjector;

impl RequirementProjector {
    pub fn new() -> Self {
        Self
    }

    /// One requirement per forecast row and ingredient of its item
    ///
    /// Items without an ingredient mapping contribute no rows.
    pub fn project(&self, forecast: &[ForecastRow], table: &IngredientTable) -> Vec<IngredientRequirement> {
        forecast
            .iter()
            .flat_map(|row| {
                table
                    .ingredients_for(&row.item_id)
                    .iter()
                    .map(move |ingredient| IngredientRequirement {
                        period_start: row.period_start,
                        item_id: row.item_id.clone(),
                        predicted_quantity: row.predicted_quantity,
                        ingredient_name: ingredient.name.clone(),
                        ingredient_mass_per_unit: ingredient.mass_per_unit_grams,
                        projected_total_mass: row.predicted_quantity * ingredient.mass_per_unit_grams,
                    })
            })
            .collect()
    }

    /// Total projected mass per ingredient, largest first
    pub fn totals_by_ingredient(&self, requirements: &[IngredientRequirement]) -> Vec<(String, f64)> {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for req in requirements {
            *totals.entry(req.ingredient_name.as_str()).or_insert(0.0) += req.projected_total_mass;
        }

        let mut totals: Vec<(String, f64)> = totals
            .into_iter()
            .map(|(name, mass)| (name.to_string(), mass))
            .collect();
        totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        totals
    }

    /// Total projected mass per `(period, ingredient)`
    pub fn totals_by_period(&self, requirements: &[IngredientRequirement]) -> BTreeMap<(NaiveDate, String), f64> {
        let mut totals = BTreeMap::new();
        for req in requirements {
            *totals
                .entry((req.period_start, req.ingredient_name.clone()))
                .or_insert(0.0) += req.projected_total_mass;
        }
        totals
    }

    /// Write requirements as CSV with a header row
    pub fn write_csv<W: Write>(&self, requirements: &[IngredientRequirement], writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for req in requirements {
            csv_writer.serialize(req)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write requirements to a CSV file
    pub fn write_csv_file<P: AsRef<Path>>(&self, requirements: &[IngredientRequirement], path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv(requirements, file)
    }
}

//! Transaction records and weekly demand series

use crate::config::OutlierFilter;
use crate::error::{ForecastError, Result};
use crate::requirements::{IngredientRow, IngredientTable, RawIngredientRow};
use crate::utils::{date_parser, week_start, weekly_grid};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Multiple of the interquartile range beyond which a daily sum is an outlier
const IQR_FENCE: f64 = 1.5;

/// One transaction line as it appears in a sales log
///
/// Every field is optional so that incomplete rows reach validation and are
/// reported with their record index instead of failing deserialisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(alias = "order_date", default)]
    pub date: Option<String>,
    #[serde(alias = "pizza_name_id", default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

/// A validated transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub item_id: String,
    pub quantity: f64,
    pub unit_price: Option<f64>,
}

impl Transaction {
    /// Create a transaction, rejecting an empty item or a negative quantity
    pub fn new(date: NaiveDate, item_id: impl Into<String>, quantity: f64) -> Result<Self> {
        let item_id = item_id.into();
        if item_id.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Item identifier must not be empty".to_string(),
            ));
        }
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Quantity must be a non-negative number, got {}",
                quantity
            )));
        }
        Ok(Self {
            date,
            item_id: item_id.trim().to_string(),
            quantity,
            unit_price: None,
        })
    }

    /// Validate source row `record`
    pub fn parse(raw: &RawTransaction, record: usize, date_formats: &[String]) -> Result<Self> {
        let malformed = |reason: String| ForecastError::MalformedInput { record, reason };

        let date_text = raw
            .date
            .as_deref()
            .ok_or_else(|| malformed("missing date".to_string()))?;
        let date = date_parser::parse(date_text, date_formats)
            .ok_or_else(|| malformed(format!("unparseable date '{}'", date_text)))?;

        let item_id = raw
            .item_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("missing item identifier".to_string()))?;

        let quantity = raw
            .quantity
            .ok_or_else(|| malformed("missing quantity".to_string()))?;
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(malformed(format!("invalid quantity {}", quantity)));
        }

        Ok(Self {
            date,
            item_id: item_id.to_string(),
            quantity,
            unit_price: raw.unit_price,
        })
    }
}

/// Weekly demand of one item, in period order
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    item_id: String,
    periods: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DemandSeries {
    /// Create a series from strictly increasing periods and matching values
    pub fn new(item_id: impl Into<String>, periods: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if periods.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "Series has {} periods but {} values",
                periods.len(),
                values.len()
            )));
        }
        if periods.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::DataError(
                "Series periods must be strictly increasing".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Series values must be finite".to_string(),
            ));
        }

        Ok(Self {
            item_id: item_id.into(),
            periods,
            values,
        })
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Last period of the series, if any
    pub fn last_period(&self) -> Option<NaiveDate> {
        self.periods.last().copied()
    }

    /// The first `n` periods
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            item_id: self.item_id.clone(),
            periods: self.periods[..n].to_vec(),
            values: self.values[..n].to_vec(),
        }
    }
}

/// One row of the weekly grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandRecord {
    pub period_start: NaiveDate,
    pub item_id: String,
    pub quantity: f64,
}

/// Gap-free weekly demand grid for every observed item
///
/// Every item carries one value per period of the shared grid; weeks without
/// sales are explicit zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesDataset {
    periods: Vec<NaiveDate>,
    series: BTreeMap<String, Vec<f64>>,
}

impl TimeSeriesDataset {
    /// Aggregate transactions into the weekly grid
    pub fn from_transactions(transactions: &[Transaction], filter: OutlierFilter) -> Result<Self> {
        if transactions.is_empty() {
            return Err(ForecastError::DataError(
                "Cannot build a dataset from zero transactions".to_string(),
            ));
        }

        let mut daily: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
        for tx in transactions {
            *daily.entry((tx.date, tx.item_id.clone())).or_insert(0.0) += tx.quantity;
        }

        let before = daily.len();
        let daily = filter_outliers(daily, filter);
        debug!(
            filter = ?filter,
            dropped = before - daily.len(),
            "Filtered daily item sums"
        );

        let (first, last) = match (daily.keys().map(|k| k.0).min(), daily.keys().map(|k| k.0).max()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(ForecastError::DataError(
                    "Every transaction was removed by the outlier filter".to_string(),
                ))
            }
        };

        let periods = weekly_grid(first, last);
        let first_period = periods[0];
        let mut series: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for ((date, item_id), quantity) in daily {
            let index = ((week_start(date) - first_period).num_days() / 7) as usize;
            let values = series
                .entry(item_id)
                .or_insert_with(|| vec![0.0; periods.len()]);
            values[index] += quantity;
        }

        debug!(
            periods = periods.len(),
            items = series.len(),
            "Built weekly demand grid"
        );
        Ok(Self { periods, series })
    }

    /// Validate raw rows, then aggregate them
    ///
    /// Dates are read with the first format that fits every row, so ambiguous
    /// day/month values are read the same way throughout the log.
    pub fn from_raw(raw: &[RawTransaction], date_formats: &[String], filter: OutlierFilter) -> Result<Self> {
        let samples: Vec<&str> = raw
            .iter()
            .filter_map(|row| row.date.as_deref())
            .filter(|date| !date.trim().is_empty())
            .collect();
        let date_formats = date_parser::resolve(&samples, date_formats);
        debug!(formats = ?date_formats, "Resolved transaction date format");

        let transactions = raw
            .iter()
            .enumerate()
            .map(|(record, row)| Transaction::parse(row, record, date_formats))
            .collect::<Result<Vec<_>>>()?;
        Self::from_transactions(&transactions, filter)
    }

    /// Shared period axis
    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Item identifiers in sorted order
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn item_count(&self) -> usize {
        self.series.len()
    }

    /// Number of (period, item) rows
    pub fn len(&self) -> usize {
        self.periods.len() * self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Series of one item
    pub fn series(&self, item_id: &str) -> Option<DemandSeries> {
        self.series.get(item_id).map(|values| DemandSeries {
            item_id: item_id.to_string(),
            periods: self.periods.clone(),
            values: values.clone(),
        })
    }

    /// All rows, period-major
    pub fn records(&self) -> Vec<DemandRecord> {
        self.periods
            .iter()
            .enumerate()
            .flat_map(|(i, period)| {
                self.series.iter().map(move |(item_id, values)| DemandRecord {
                    period_start: *period,
                    item_id: item_id.clone(),
                    quantity: values[i],
                })
            })
            .collect()
    }

    /// Partition into periods before `cutoff` and periods at or after it
    pub fn split_at(&self, cutoff: NaiveDate) -> (Self, Self) {
        let index = self.periods.partition_point(|p| *p < cutoff);
        let part = |range: std::ops::Range<usize>| Self {
            periods: self.periods[range.clone()].to_vec(),
            series: self
                .series
                .iter()
                .map(|(item, values)| (item.clone(), values[range.clone()].to_vec()))
                .collect(),
        };
        (part(0..index), part(index..self.periods.len()))
    }
}

/// Drop daily sums outside the interquartile fences
fn filter_outliers(
    daily: BTreeMap<(NaiveDate, String), f64>,
    filter: OutlierFilter,
) -> BTreeMap<(NaiveDate, String), f64> {
    match filter {
        OutlierFilter::Disabled => daily,
        OutlierFilter::Global => {
            let (low, high) = iqr_fences(daily.values().copied().collect());
            daily
                .into_iter()
                .filter(|(_, v)| *v >= low && *v <= high)
                .collect()
        }
        OutlierFilter::PerItem => {
            let mut by_item: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
            for ((_, item), v) in &daily {
                by_item.entry(item.as_str()).or_default().push(*v);
            }
            let fences: BTreeMap<String, (f64, f64)> = by_item
                .into_iter()
                .map(|(item, values)| (item.to_string(), iqr_fences(values)))
                .collect();

            daily
                .into_iter()
                .filter(|((_, item), v)| {
                    fences
                        .get(item)
                        .map_or(true, |(low, high)| *v >= *low && *v <= *high)
                })
                .collect()
        }
    }
}

/// `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`
fn iqr_fences(values: Vec<f64>) -> (f64, f64) {
    let mut data = Data::new(values);
    let q1 = data.lower_quartile();
    let q3 = data.upper_quartile();
    if !q1.is_finite() || !q3.is_finite() {
        return (f64::NEG_INFINITY, f64::INFINITY);
    }
    let iqr = q3 - q1;
    (q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr)
}

/// Data loader for sales logs and ingredient tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load raw transactions from a CSV file with a header row
    pub fn transactions_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawTransaction>> {
        let file = File::open(path)?;
        Self::transactions_from_reader(file)
    }

    /// Load raw transactions from any CSV source
    pub fn transactions_from_reader<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
        Self::deserialize_rows(reader)
    }

    /// Load and normalise an ingredient table from a CSV file
    pub fn ingredients_from_csv<P: AsRef<Path>>(path: P) -> Result<IngredientTable> {
        let file = File::open(path)?;
        Self::ingredients_from_reader(file)
    }

    /// Load and normalise an ingredient table from any CSV source
    ///
    /// Blank item and mass cells repeat the line above.
    pub fn ingredients_from_reader<R: Read>(reader: R) -> Result<IngredientTable> {
        let raw: Vec<RawIngredientRow> = Self::deserialize_rows(reader)?;
        IngredientTable::new(IngredientRow::forward_fill(raw)?)
    }

    fn deserialize_rows<R: Read, T: serde::de::DeserializeOwned>(reader: R) -> Result<Vec<T>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        csv_reader
            .deserialize()
            .enumerate()
            .map(|(record, row)| {
                row.map_err(|e| ForecastError::MalformedInput {
                    record,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

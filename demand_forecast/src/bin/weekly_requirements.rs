//! Weekly ingredient requirements from a sales log
//!
//! Loads transactions and the ingredient table, selects a model per item,
//! then writes the requirement rows as CSV and the score tables as JSON.

use chrono::NaiveDate;
use clap::Parser;
use demand_forecast::data::DataLoader;
use demand_forecast::{ForecastConfig, ModelVariant, OutlierFilter, Pipeline};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "weekly_requirements")]
#[command(about = "Forecast weekly item demand and project ingredient requirements", long_about = None)]
struct Cli {
    /// Sales log CSV (date, item_id, quantity, unit_price)
    #[arg(short, long)]
    sales: PathBuf,

    /// Ingredient table CSV (item_id, ingredient_name, mass_per_unit_grams)
    #[arg(short, long)]
    ingredients: PathBuf,

    /// JSON run configuration; command-line options override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First held-out week (YYYY-MM-DD); required without --config
    #[arg(long)]
    cutoff: Option<NaiveDate>,

    /// Number of held-out weeks to forecast
    #[arg(long)]
    horizon: Option<usize>,

    /// Season length in weeks
    #[arg(long)]
    seasonal_period: Option<usize>,

    /// Outlier filter (disabled, global, per_item)
    #[arg(long)]
    outlier_filter: Option<String>,

    /// Only run these variants (trend_seasonal, autoregressive, seasonal_autoregressive, feature_regression)
    #[arg(long, value_delimiter = ',')]
    variants: Vec<String>,

    /// Report items without a viable model instead of failing
    #[arg(long)]
    skip_unviable: bool,

    /// Requirement CSV output; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Score table JSON output
    #[arg(long)]
    scores: Option<PathBuf>,
}

/// Parse a snake_case enum value the way the JSON configuration spells it
fn parse_choice<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, Box<dyn std::error::Error>> {
    Ok(serde_json::from_value(serde_json::Value::String(value.to_string()))?)
}

fn build_config(cli: &Cli) -> Result<ForecastConfig, Box<dyn std::error::Error>> {
    let mut config = match (&cli.config, cli.cutoff) {
        (Some(path), _) => ForecastConfig::from_json_file(path)?,
        (None, Some(cutoff)) => ForecastConfig::new(cutoff),
        (None, None) => return Err("either --config or --cutoff is required".into()),
    };

    if let Some(cutoff) = cli.cutoff {
        config.cutoff_date = cutoff;
    }
    if let Some(horizon) = cli.horizon {
        config = config.with_horizon(horizon);
    }
    if let Some(period) = cli.seasonal_period {
        config = config.with_seasonal_period(period);
    }
    if let Some(filter) = &cli.outlier_filter {
        config = config.with_outlier_filter(parse_choice::<OutlierFilter>(filter)?);
    }
    if !cli.variants.is_empty() {
        let variants = cli
            .variants
            .iter()
            .map(|v| parse_choice::<ModelVariant>(v))
            .collect::<Result<Vec<_>, _>>()?;
        config = config.with_variants(variants);
    }
    if cli.skip_unviable {
        config = config.skipping_unviable_items();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weekly_requirements=info,demand_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let transactions = DataLoader::transactions_from_csv(&cli.sales)?;
    let ingredients = DataLoader::ingredients_from_csv(&cli.ingredients)?;
    info!(
        transactions = transactions.len(),
        ingredient_rows = ingredients.len(),
        "Loaded input"
    );

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run(&transactions, &ingredients)?;

    for (item, outcome) in &report.outcomes {
        info!(item = %item, winner = %outcome.winner, scores = %outcome.scores, "Item forecast");
    }

    match &cli.output {
        Some(path) => pipeline.projector().write_csv_file(&report.requirements, path)?,
        None => pipeline.projector().write_csv(&report.requirements, io::stdout().lock())?,
    }
    if let Some(path) = &cli.scores {
        report.write_scores_json(BufWriter::new(File::create(path)?))?;
    }

    let totals = pipeline.projector().totals_by_ingredient(&report.requirements);
    for (ingredient, mass) in totals.iter().take(10) {
        info!(ingredient = %ingredient, grams = mass, "Top ingredient");
    }

    Ok(())
}

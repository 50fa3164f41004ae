use chrono::{Duration, NaiveDate};
use demand_forecast::requirements::IngredientRow;
use demand_forecast::utils::generate_weekly_demand;
use demand_forecast::{ForecastConfig, IngredientTable, Pipeline, Transaction};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Demand Forecast: Basic Forecasting Example");
    println!("==========================================\n");

    // Two years and a bit of weekly demand for two items
    let start = NaiveDate::from_ymd_opt(2014, 1, 6).ok_or("invalid start date")?;
    let mut transactions = Vec::new();
    for (item, base, seed) in [("margherita", 120.0, 1), ("pepperoni", 80.0, 2)] {
        for (week, quantity) in generate_weekly_demand(start, 120, base, 0.2, 25.0, 6.0, seed)? {
            // Spread each week's demand over two sales days
            let half = (quantity / 2.0).floor();
            transactions.push(Transaction::new(week, item, half)?);
            transactions.push(Transaction::new(week + Duration::days(4), item, quantity - half)?);
        }
    }
    println!("Created {} synthetic transactions\n", transactions.len());

    let ingredients = IngredientTable::new(vec![
        IngredientRow {
            item_id: "margherita".to_string(),
            ingredient_name: "Mozzarella Cheese".to_string(),
            mass_per_unit_grams: 120.0,
        },
        IngredientRow {
            item_id: "margherita".to_string(),
            ingredient_name: "Tomato Sauce".to_string(),
            mass_per_unit_grams: 80.0,
        },
        IngredientRow {
            item_id: "pepperoni".to_string(),
            ingredient_name: "Pepperoni".to_string(),
            mass_per_unit_grams: 45.0,
        },
    ])?;

    let cutoff = start + Duration::weeks(112);
    let config = ForecastConfig::new(cutoff).with_horizon(4);
    println!("Training before {}, forecasting 4 weeks\n", cutoff);

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run_transactions(&transactions, &ingredients)?;

    for (item, outcome) in &report.outcomes {
        match outcome.score {
            Some(score) => println!("{}: selected {} (MAPE {:.2}%)", item, outcome.winner, score * 100.0),
            None => println!("{}: selected {} (no held-out demand)", item, outcome.winner),
        }
        println!("  scores: {}", outcome.scores);
        for (period, value) in outcome.forecast.iter() {
            println!("  week of {}: {:.1}", period, value);
        }
    }

    println!("\nIngredient totals over the horizon:");
    for (ingredient, grams) in pipeline.projector().totals_by_ingredient(&report.requirements) {
        println!("  {:<20} {:>10.0} g", ingredient, grams);
    }

    Ok(())
}

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use demand_forecast::data::DataLoader;
use demand_forecast::requirements::{ForecastRow, IngredientRow};
use demand_forecast::{ForecastError, IngredientTable, RequirementProjector};
use pretty_assertions::assert_eq;
use std::io::Read;

fn week(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 12, 7).unwrap() + Duration::weeks(n)
}

fn forecast(period: i64, item: &str, quantity: f64) -> ForecastRow {
    ForecastRow {
        period_start: week(period),
        item_id: item.to_string(),
        predicted_quantity: quantity,
    }
}

fn table() -> IngredientTable {
    let row = |item: &str, name: &str, mass: f64| IngredientRow {
        item_id: item.to_string(),
        ingredient_name: name.to_string(),
        mass_per_unit_grams: mass,
    };
    IngredientTable::new(vec![
        row("margherita_l", "Mozzarella Cheese", 40.0),
        row("margherita_l", "Tomatoes", 30.0),
        row("margherita_l", "Garlic", 5.0),
        row("hawaiian_m", "Mozzarella Cheese", 25.0),
        row("hawaiian_m", "Pineapple", 20.0),
    ])
    .unwrap()
}

#[test]
fn test_one_row_per_ingredient() {
    let projector = RequirementProjector::new();
    let requirements = projector.project(&[forecast(0, "margherita_l", 12.5)], &table());

    assert_eq!(requirements.len(), 3);
    let names: Vec<&str> = requirements.iter().map(|r| r.ingredient_name.as_str()).collect();
    assert_eq!(names, vec!["Mozzarella Cheese", "Tomatoes", "Garlic"]);

    let total: f64 = requirements.iter().map(|r| r.projected_total_mass).sum();
    assert_relative_eq!(total, 12.5 * (40.0 + 30.0 + 5.0));
    for req in &requirements {
        assert_relative_eq!(req.projected_total_mass, req.predicted_quantity * req.ingredient_mass_per_unit);
    }
}

#[test]
fn test_unmapped_item_contributes_nothing() {
    let projector = RequirementProjector::new();
    let requirements = projector.project(
        &[forecast(0, "bbq_ckn_s", 9.0), forecast(0, "hawaiian_m", 2.0)],
        &table(),
    );

    assert_eq!(requirements.len(), 2);
    assert!(requirements.iter().all(|r| r.item_id == "hawaiian_m"));
}

#[test]
fn test_totals() {
    let projector = RequirementProjector::new();
    let rows = vec![
        forecast(0, "margherita_l", 10.0),
        forecast(1, "margherita_l", 4.0),
        forecast(0, "hawaiian_m", 8.0),
    ];
    let requirements = projector.project(&rows, &table());

    let totals = projector.totals_by_ingredient(&requirements);
    assert_eq!(totals[0].0, "Mozzarella Cheese");
    assert_relative_eq!(totals[0].1, 14.0 * 40.0 + 8.0 * 25.0);
    assert!(totals.windows(2).all(|w| w[0].1 >= w[1].1));

    let by_period = projector.totals_by_period(&requirements);
    assert_relative_eq!(
        by_period[&(week(0), "Mozzarella Cheese".to_string())],
        10.0 * 40.0 + 8.0 * 25.0
    );
    assert_relative_eq!(by_period[&(week(1), "Tomatoes".to_string())], 4.0 * 30.0);
    assert!(!by_period.contains_key(&(week(1), "Pineapple".to_string())));
}

#[test]
fn test_csv_export() {
    let projector = RequirementProjector::new();
    let requirements = projector.project(&[forecast(0, "hawaiian_m", 2.0)], &table());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    projector.write_csv_file(&requirements, file.path()).unwrap();

    let mut written = String::new();
    file.read_to_string(&mut written).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines,
        vec![
            "period_start,item_id,predicted_quantity,ingredient_name,projected_total_mass",
            "2015-12-07,hawaiian_m,2.0,Mozzarella Cheese,50.0",
            "2015-12-07,hawaiian_m,2.0,Pineapple,40.0",
        ]
    );
}

#[test]
fn test_load_ingredients_with_source_headers() {
    let csv = "pizza_name_id,pizza_ingredients,Items_Qty_In_Grams\n\
               hawaiian_m,  Sliced  Ham ,30\n\
               hawaiian_m,Pineapple,20.5\n\
               cali_ckn_s,Chicken,45\n";
    let table = DataLoader::ingredients_from_reader(csv.as_bytes()).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.items().collect::<Vec<_>>(), vec!["cali_ckn_s", "hawaiian_m"]);
    let hawaiian = table.ingredients_for("hawaiian_m");
    assert_eq!(hawaiian[0].name, "Sliced Ham");
    assert_relative_eq!(hawaiian[1].mass_per_unit_grams, 20.5);
}

#[test]
fn test_continuation_lines_inherit_item_and_mass() {
    let csv = "pizza_name_id,pizza_ingredients,Items_Qty_In_Grams\n\
               bbq_ckn_l,Barbecued Chicken,60\n\
               ,Red Onions,20\n\
               ,Green Peppers,\n\
               hawaiian_m,Pineapple,20\n";
    let table = DataLoader::ingredients_from_reader(csv.as_bytes()).unwrap();

    assert_eq!(table.len(), 4);
    let bbq = table.ingredients_for("bbq_ckn_l");
    let names: Vec<&str> = bbq.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Barbecued Chicken", "Red Onions", "Green Peppers"]);
    assert_relative_eq!(bbq[1].mass_per_unit_grams, 20.0);
    assert_relative_eq!(bbq[2].mass_per_unit_grams, 20.0);
    assert_eq!(table.ingredients_for("hawaiian_m").len(), 1);
}

#[test]
fn test_blank_item_on_first_line_is_malformed() {
    let csv = "pizza_name_id,pizza_ingredients,Items_Qty_In_Grams\n,Chicken,60\n";
    let err = DataLoader::ingredients_from_reader(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, ForecastError::MalformedInput { record: 0, .. }));
}

#[test]
fn test_blank_ingredient_name_is_malformed() {
    let csv = "item_id,ingredient_name,mass_per_unit_grams\na,Cheese,10\na,   ,5\n";
    let err = DataLoader::ingredients_from_reader(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, ForecastError::MalformedInput { record: 1, .. }));
}

use chrono::{Duration, NaiveDate};
use demand_forecast::data::{DataLoader, RawTransaction, TimeSeriesDataset, Transaction};
use demand_forecast::{ForecastConfig, ForecastError, OutlierFilter};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn formats() -> Vec<String> {
    vec!["%Y-%m-%d".to_string(), "%d/%m/%Y".to_string()]
}

fn raw(date: Option<&str>, item: Option<&str>, quantity: Option<f64>) -> RawTransaction {
    RawTransaction {
        date: date.map(str::to_string),
        item_id: item.map(str::to_string),
        quantity,
        unit_price: None,
    }
}

#[test]
fn test_transaction_parse() {
    let tx = Transaction::parse(&raw(Some("05/01/2015"), Some(" hawaiian_m "), Some(2.0)), 0, &formats()).unwrap();
    assert_eq!(tx.date, ymd(2015, 1, 5));
    assert_eq!(tx.item_id, "hawaiian_m");
    assert_eq!(tx.quantity, 2.0);
}

#[rstest]
#[case(raw(None, Some("a"), Some(1.0)))]
#[case(raw(Some("not a date"), Some("a"), Some(1.0)))]
#[case(raw(Some("2015-01-05"), None, Some(1.0)))]
#[case(raw(Some("2015-01-05"), Some("   "), Some(1.0)))]
#[case(raw(Some("2015-01-05"), Some("a"), None))]
#[case(raw(Some("2015-01-05"), Some("a"), Some(-1.0)))]
fn test_malformed_rows_are_rejected(#[case] row: RawTransaction) {
    let err = Transaction::parse(&row, 7, &formats()).unwrap_err();
    assert!(matches!(err, ForecastError::MalformedInput { record: 7, .. }));
}

#[test]
fn test_malformed_row_index_is_reported_by_dataset() {
    let rows = vec![
        raw(Some("2015-01-05"), Some("a"), Some(1.0)),
        raw(Some("2015-01-06"), Some("a"), Some(1.0)),
        raw(Some("2015-13-45"), Some("a"), Some(1.0)),
    ];
    let err = TimeSeriesDataset::from_raw(&rows, &formats(), OutlierFilter::Disabled).unwrap_err();
    assert!(matches!(err, ForecastError::MalformedInput { record: 2, .. }));
}

#[rstest]
#[case(1, 1)]
#[case(5, 2)]
#[case(30, 4)]
fn test_grid_has_one_row_per_week_and_item(#[case] weeks: i64, #[case] items: usize) {
    let first = ymd(2015, 1, 7);
    let last = first + Duration::weeks(weeks - 1);
    let mut transactions = vec![Transaction::new(first, "item0", 1.0).unwrap()];
    // Remaining items appear once each, in the last week only
    for k in 0..items {
        transactions.push(Transaction::new(last, format!("item{}", k), 3.0).unwrap());
    }

    let dataset = TimeSeriesDataset::from_transactions(&transactions, OutlierFilter::Disabled).unwrap();
    assert_eq!(dataset.item_count(), items);
    assert_eq!(dataset.periods().len(), weeks as usize);
    assert_eq!(dataset.len(), weeks as usize * items);
    assert_eq!(dataset.records().len(), dataset.len());
    assert!(dataset
        .periods()
        .windows(2)
        .all(|w| w[1] - w[0] == Duration::weeks(1)));
}

#[test]
fn test_weekly_aggregation_fills_gaps_with_zero() {
    let transactions = vec![
        Transaction::new(ymd(2015, 1, 5), "a", 2.0).unwrap(),
        Transaction::new(ymd(2015, 1, 8), "a", 3.0).unwrap(),
        Transaction::new(ymd(2015, 1, 8), "a", 1.0).unwrap(),
        Transaction::new(ymd(2015, 1, 21), "b", 4.0).unwrap(),
    ];
    let dataset = TimeSeriesDataset::from_transactions(&transactions, OutlierFilter::Disabled).unwrap();

    assert_eq!(
        dataset.periods(),
        &[ymd(2015, 1, 5), ymd(2015, 1, 12), ymd(2015, 1, 19)]
    );
    assert_eq!(dataset.series("a").unwrap().values(), &[6.0, 0.0, 0.0]);
    assert_eq!(dataset.series("b").unwrap().values(), &[0.0, 0.0, 4.0]);
    assert!(dataset.series("c").is_none());
}

#[test]
fn test_split_at_cutoff() {
    let transactions: Vec<Transaction> = (0..6)
        .map(|w| Transaction::new(ymd(2015, 1, 5) + Duration::weeks(w), "a", w as f64).unwrap())
        .collect();
    let dataset = TimeSeriesDataset::from_transactions(&transactions, OutlierFilter::Disabled).unwrap();

    let (train, test) = dataset.split_at(ymd(2015, 1, 26));
    assert_eq!(train.periods().len(), 3);
    assert_eq!(test.periods().first(), Some(&ymd(2015, 1, 26)));
    assert_eq!(test.series("a").unwrap().values(), &[3.0, 4.0, 5.0]);
    assert_eq!(train.len() + test.len(), dataset.len());
}

#[rstest]
#[case(OutlierFilter::Disabled, 120.0)]
#[case(OutlierFilter::Global, 120.0)]
#[case(OutlierFilter::PerItem, 80.0)]
fn test_outlier_filter_scope(#[case] filter: OutlierFilter, #[case] expected_a: f64) {
    let start = ymd(2015, 1, 5);
    let mut transactions = Vec::new();
    for day in 0..8 {
        transactions.push(Transaction::new(start + Duration::days(day), "a", 10.0).unwrap());
        transactions.push(Transaction::new(start + Duration::days(day), "b", 50.0).unwrap());
    }
    transactions.push(Transaction::new(start + Duration::days(8), "a", 40.0).unwrap());

    let dataset = TimeSeriesDataset::from_transactions(&transactions, filter).unwrap();
    let total_a: f64 = dataset.series("a").unwrap().values().iter().sum();
    let total_b: f64 = dataset.series("b").unwrap().values().iter().sum();
    assert_eq!(total_a, expected_a);
    assert_eq!(total_b, 400.0);
}

#[test]
fn test_load_transactions_with_source_headers() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "pizza_id,order_id,pizza_name_id,quantity,order_date,unit_price,total_price").unwrap();
    writeln!(file, "1,1,hawaiian_m,1,2015-01-01,13.25,13.25").unwrap();
    writeln!(file, "2,2,classic_dlx_m,2,2015-01-01,16.00,32.00").unwrap();
    writeln!(file, "3,3,,1,2015-01-02,20.75,20.75").unwrap();
    file.flush().unwrap();

    let rows = DataLoader::transactions_from_csv(file.path()).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[1],
        RawTransaction {
            date: Some("2015-01-01".to_string()),
            item_id: Some("classic_dlx_m".to_string()),
            quantity: Some(2.0),
            unit_price: Some(16.0),
        }
    );
    assert_eq!(rows[2].item_id, None);
}

#[test]
fn test_unreadable_quantity_is_malformed() {
    let csv = "date,item_id,quantity\n2015-01-01,a,1\n2015-01-02,a,lots\n";
    let err = DataLoader::transactions_from_reader(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, ForecastError::MalformedInput { record: 1, .. }));
}

#[test]
fn test_us_dates_are_read_month_first_throughout() {
    let csv = "order_date,pizza_name_id,quantity\n\
               1/2/2015,hawaiian_m,1\n\
               1/13/2015,hawaiian_m,2\n\
               2/1/2015,hawaiian_m,4\n";
    let rows = DataLoader::transactions_from_reader(csv.as_bytes()).unwrap();
    let formats = ForecastConfig::new(ymd(2015, 3, 1)).date_formats;

    let dataset = TimeSeriesDataset::from_raw(&rows, &formats, OutlierFilter::Disabled).unwrap();
    assert_eq!(dataset.periods().first(), Some(&ymd(2014, 12, 29)));
    assert_eq!(dataset.periods().last(), Some(&ymd(2015, 1, 26)));
    assert_eq!(dataset.series("hawaiian_m").unwrap().values(), &[1.0, 0.0, 2.0, 0.0, 4.0]);
}

#[test]
fn test_day_first_log_is_read_consistently() {
    let rows = vec![
        raw(Some("02/01/2015"), Some("a"), Some(1.0)),
        raw(Some("13/01/2015"), Some("a"), Some(1.0)),
    ];
    let formats = ForecastConfig::new(ymd(2015, 3, 1)).date_formats;

    let dataset = TimeSeriesDataset::from_raw(&rows, &formats, OutlierFilter::Disabled).unwrap();
    // 2 January, not 1 February
    assert_eq!(dataset.periods(), &[ymd(2014, 12, 29), ymd(2015, 1, 5), ymd(2015, 1, 12)]);
}

use chrono::NaiveDate;
use demand_forecast::models::ModelVariant;
use demand_forecast::{ForecastConfig, ForecastError, OutlierFilter};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;

#[test]
fn test_minimal_json_uses_defaults() {
    let config = ForecastConfig::from_json_str(r#"{ "cutoff_date": "2015-12-01" }"#).unwrap();

    assert_eq!(config, ForecastConfig::new(NaiveDate::from_ymd_opt(2015, 12, 1).unwrap()));
    assert_eq!(config.seasonal_period, 52);
    assert_eq!(config.horizon, None);
    assert_eq!(config.outlier_filter, OutlierFilter::Disabled);
    assert_eq!(config.enabled_variants(), ModelVariant::all());
    assert_eq!(config.autoregressive.p, 5);
    assert_eq!(config.feature_regression.n_estimators, 100);
}

#[test]
fn test_json_overrides() {
    let json = r#"{
        "cutoff_date": "2015-12-01",
        "horizon": 4,
        "outlier_filter": "per_item",
        "skip_unviable_items": true,
        "variants": ["feature_regression", "autoregressive", "autoregressive"],
        "autoregressive": { "p": 2, "q": 1 },
        "feature_regression": { "max_depth": 3 }
    }"#;
    let config = ForecastConfig::from_json_str(json).unwrap();

    assert_eq!(config.horizon, Some(4));
    assert_eq!(config.outlier_filter, OutlierFilter::PerItem);
    assert!(config.skip_unviable_items);
    assert_eq!(
        config.enabled_variants(),
        vec![ModelVariant::Autoregressive, ModelVariant::FeatureRegression]
    );
    assert_eq!((config.autoregressive.p, config.autoregressive.d, config.autoregressive.q), (2, 1, 1));
    assert_eq!(config.feature_regression.max_depth, 3);
    assert_eq!(config.feature_regression.n_estimators, 100);
}

#[rstest]
#[case(r#"{ "cutoff_date": "2015-12-01", "horizon": 0 }"#)]
#[case(r#"{ "cutoff_date": "2015-12-01", "seasonal_period": 1 }"#)]
#[case(r#"{ "cutoff_date": "2015-12-01", "variants": [] }"#)]
#[case(r#"{ "cutoff_date": "2015-12-01", "date_formats": [] }"#)]
#[case(r#"{ "cutoff_date": "2015-12-01", "feature_regression": { "learning_rate": 0.0 } }"#)]
fn test_invalid_values_are_rejected(#[case] json: &str) {
    let err = ForecastConfig::from_json_str(json).unwrap_err();
    assert!(matches!(err, ForecastError::InvalidParameter(_)));
}

#[test]
fn test_unknown_variant_is_a_json_error() {
    let err = ForecastConfig::from_json_str(r#"{ "cutoff_date": "2015-12-01", "variants": ["prophet"] }"#)
        .unwrap_err();
    assert!(matches!(err, ForecastError::Json(_)));
}

#[test]
fn test_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "cutoff_date": "2016-01-04", "seasonal_period": 4 }}"#).unwrap();
    file.flush().unwrap();

    let config = ForecastConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.cutoff_date, NaiveDate::from_ymd_opt(2016, 1, 4).unwrap());
    assert_eq!(config.seasonal_period, 4);
}

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use demand_forecast::data::DemandSeries;
use demand_forecast::models::arima::ArimaModel;
use demand_forecast::models::feature_regression::FeatureRegressionModel;
use demand_forecast::models::sarima::{SeasonalArimaModel, SeasonalOrder};
use demand_forecast::models::trend_seasonal::{TrendSeasonalModel, TrendSeasonalParams};
use demand_forecast::models::{ForecastModel, ForecastResult, ModelVariant, TrainedForecastModel};
use demand_forecast::utils::generate_weekly_demand;
use demand_forecast::ForecastConfig;
use forecast_math::boosting::BoostingParams;
use rstest::rstest;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 5).unwrap()
}

fn weekly(values: &[f64]) -> DemandSeries {
    let periods = (0..values.len())
        .map(|i| start() + Duration::weeks(i as i64))
        .collect();
    DemandSeries::new("item", periods, values.to_vec()).unwrap()
}

fn short_series() -> DemandSeries {
    weekly(&[10.0, 12.0, 11.0, 13.0, 12.0, 14.0, 13.0, 15.0])
}

fn config() -> ForecastConfig {
    ForecastConfig::new(start() + Duration::weeks(8))
}

#[rstest]
#[case(ModelVariant::TrendSeasonal)]
#[case(ModelVariant::Autoregressive)]
#[case(ModelVariant::FeatureRegression)]
fn test_variants_forecast_short_series(#[case] variant: ModelVariant) {
    let series = short_series();
    let forecast = variant.fit_predict(&config(), &series, 1).unwrap();

    assert_eq!(forecast.horizon(), 1);
    assert_eq!(forecast.periods()[0], series.last_period().unwrap() + Duration::weeks(1));
    assert!(forecast.values()[0] >= 0.0);
    assert!(forecast.values()[0].is_finite());
}

#[test]
fn test_seasonal_variant_needs_a_full_season() {
    let err = ModelVariant::SeasonalAutoregressive
        .fit_predict(&config(), &short_series(), 1)
        .unwrap_err();
    assert!(err.to_string().contains("Need at least 58 observations"));
    assert!(err.is_variant_local());
}

#[test]
fn test_seasonal_variant_fits_long_history() {
    let history = generate_weekly_demand(start(), 120, 100.0, 0.1, 20.0, 3.0, 11).unwrap();
    let values: Vec<f64> = history.iter().map(|(_, v)| *v).collect();
    let model = SeasonalArimaModel::new(SeasonalOrder::default(), 52).unwrap();

    let trained = model.train(&weekly(&values)).unwrap();
    assert_eq!(trained.coefficients().len(), 4);
    assert!(trained.coefficients().iter().all(|c| c.abs() <= 1.0));

    let forecast = trained.forecast(6).unwrap();
    assert_eq!(forecast.horizon(), 6);
    assert!(forecast.values().iter().all(|v| *v >= 0.0));
}

#[test]
fn test_zero_horizon_is_rejected() {
    let model = ArimaModel::new(1, 1, 0);
    assert!(model.fit_predict(&short_series(), 0).is_err());
}

#[test]
fn test_arima_with_moving_average_terms() {
    let history = generate_weekly_demand(start(), 80, 60.0, 0.0, 0.0, 5.0, 3).unwrap();
    let values: Vec<f64> = history.iter().map(|(_, v)| *v).collect();
    let forecast = ArimaModel::new(1, 0, 1).fit_predict(&weekly(&values), 3).unwrap();
    for v in forecast.values() {
        assert!((*v - 60.0).abs() < 15.0);
    }
}

#[test]
fn test_model_names() {
    assert_eq!(ArimaModel::new(5, 1, 0).name(), "ARIMA(5,1,0)");
    assert_eq!(
        SeasonalArimaModel::new(SeasonalOrder::default(), 52).unwrap().name(),
        "SARIMA(1,1,1)(1,1,1,52)"
    );
    assert_eq!(
        FeatureRegressionModel::new(BoostingParams::default()).unwrap().name(),
        "GBT(n=100, depth=5, lr=0.1)"
    );
    assert_eq!(
        TrendSeasonalModel::new(TrendSeasonalParams::default()).unwrap().name(),
        "TrendSeasonal"
    );
}

#[test]
fn test_forecast_result_clips_and_validates() {
    let result = ForecastResult::continuing(start(), vec![-3.0, 4.5]).unwrap();
    assert_eq!(result.values(), &[0.0, 4.5]);
    assert_eq!(result.periods(), &[start() + Duration::weeks(1), start() + Duration::weeks(2)]);

    assert!(ForecastResult::continuing(start(), vec![f64::NAN]).is_err());
    assert!(ForecastResult::new(vec![start()], vec![1.0, 2.0]).is_err());
}

#[test]
fn test_variant_priority_and_serde_names() {
    let mut variants = vec![
        ModelVariant::FeatureRegression,
        ModelVariant::SeasonalAutoregressive,
        ModelVariant::TrendSeasonal,
        ModelVariant::Autoregressive,
    ];
    variants.sort();
    assert_eq!(variants, ModelVariant::all());

    assert_eq!(
        serde_json::to_string(&ModelVariant::SeasonalAutoregressive).unwrap(),
        "\"seasonal_autoregressive\""
    );
    assert_eq!(ModelVariant::TrendSeasonal.to_string(), "TrendSeasonalModel");
}

#[test]
fn test_trend_model_tolerates_missing_weeks() {
    // Weeks 3 and 4 absent from the series
    let periods: Vec<NaiveDate> = [0, 1, 2, 5, 6, 7]
        .iter()
        .map(|w| start() + Duration::weeks(*w))
        .collect();
    let values: Vec<f64> = [0.0, 1.0, 2.0, 5.0, 6.0, 7.0].iter().map(|w| 50.0 + 3.0 * w).collect();
    let series = DemandSeries::new("item", periods, values).unwrap();

    let params = TrendSeasonalParams {
        changepoint_count: 0,
        ..TrendSeasonalParams::default()
    };
    let forecast = TrendSeasonalModel::new(params).unwrap().fit_predict(&series, 1).unwrap();
    assert_relative_eq!(forecast.values()[0], 74.0, epsilon = 1e-4);
}

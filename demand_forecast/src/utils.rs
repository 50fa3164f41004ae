//! Utility functions for the demand_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Length of one forecasting period in days
pub const DAYS_PER_WEEK: i64 = 7;

/// Parsing of the raw date strings found in transaction logs
pub mod date_parser {
    use chrono::{NaiveDate, NaiveDateTime};

    /// Datetime layouts tried after the plain date formats
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d-%m-%Y %H:%M"];

    /// Parse `raw` with the first matching format
    ///
    /// Plain date formats are tried in order, then a few common datetime
    /// layouts whose time of day is dropped.
    pub fn parse(raw: &str, formats: &[String]) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                    .map(|datetime| datetime.date())
            })
    }

    /// The first format that reads every one of `samples`
    ///
    /// Keeps a whole file on one reading of ambiguous dates such as
    /// `01/02/2015`. Falls back to the full list when no single format
    /// covers every sample.
    pub fn resolve<'a>(samples: &[&str], formats: &'a [String]) -> &'a [String] {
        formats
            .iter()
            .position(|format| {
                samples
                    .iter()
                    .all(|raw| parse(raw, std::slice::from_ref(format)).is_some())
            })
            .map_or(formats, |i| &formats[i..=i])
    }
}

/// Monday that starts the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Every week start from `first` to `last`, inclusive
pub fn weekly_grid(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut periods = Vec::new();
    let mut current = week_start(first);
    let last = week_start(last);
    while current <= last {
        periods.push(current);
        current += Duration::days(DAYS_PER_WEEK);
    }
    periods
}

/// Create the `horizon` period keys that follow `last_period`
pub fn future_periods(last_period: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|k| last_period + Duration::days(DAYS_PER_WEEK * k))
        .collect()
}

/// Trim an ingredient name and collapse inner whitespace runs to one space
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Generate a reproducible synthetic weekly demand series
///
/// Demand follows a linear trend, a yearly sine cycle and Gaussian noise,
/// floored at zero.
pub fn generate_weekly_demand(
    start: NaiveDate,
    weeks: usize,
    base: f64,
    trend: f64,
    amplitude: f64,
    noise_sd: f64,
    seed: u64,
) -> Result<Vec<(NaiveDate, f64)>> {
    let noise = Normal::new(0.0, noise_sd).map_err(|e| {
        ForecastError::InvalidParameter(format!("Invalid noise standard deviation: {}", e))
    })?;
    let mut rng = StdRng::seed_from_u64(seed);
    let first = week_start(start);

    Ok((0..weeks)
        .map(|week| {
            let t = week as f64;
            let cycle = (2.0 * std::f64::consts::PI * t / 52.0).sin();
            let value = base + trend * t + amplitude * cycle + noise.sample(&mut rng);
            (
                first + Duration::days(DAYS_PER_WEEK * week as i64),
                value.max(0.0).round(),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2015-01-01 was a Thursday
        assert_eq!(week_start(ymd(2015, 1, 1)), ymd(2014, 12, 29));
        assert_eq!(week_start(ymd(2015, 1, 5)), ymd(2015, 1, 5));
        assert_eq!(week_start(ymd(2015, 1, 11)), ymd(2015, 1, 5));
    }

    #[test]
    fn test_date_parser_formats() {
        let formats = vec!["%Y-%m-%d".to_string(), "%d-%m-%Y".to_string()];
        assert_eq!(date_parser::parse("2015-03-04", &formats), Some(ymd(2015, 3, 4)));
        assert_eq!(date_parser::parse(" 04-03-2015 ", &formats), Some(ymd(2015, 3, 4)));
        assert_eq!(
            date_parser::parse("2015-03-04 18:30:00", &formats),
            Some(ymd(2015, 3, 4))
        );
        assert_eq!(date_parser::parse("yesterday", &formats), None);
        assert_eq!(date_parser::parse("", &formats), None);
    }

    #[test]
    fn test_weekly_grid_and_future_periods() {
        let grid = weekly_grid(ymd(2015, 1, 1), ymd(2015, 1, 20));
        assert_eq!(grid, vec![ymd(2014, 12, 29), ymd(2015, 1, 5), ymd(2015, 1, 12), ymd(2015, 1, 19)]);
        assert_eq!(
            future_periods(ymd(2015, 1, 19), 2),
            vec![ymd(2015, 1, 26), ymd(2015, 2, 2)]
        );
    }

    #[test]
    fn test_generate_weekly_demand_is_reproducible() {
        let a = generate_weekly_demand(ymd(2015, 1, 5), 20, 50.0, 0.5, 10.0, 3.0, 7).unwrap();
        let b = generate_weekly_demand(ymd(2015, 1, 5), 20, 50.0, 0.5, 10.0, 3.0, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert!(a.iter().all(|(_, v)| *v >= 0.0));
        assert!(generate_weekly_demand(ymd(2015, 1, 5), 5, 1.0, 0.0, 0.0, -1.0, 7).is_err());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Red   Peppers\t"), "Red Peppers");
    }
}

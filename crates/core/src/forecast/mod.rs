//! Demand forecasting.
//!
//! [`DemandForecaster`] is the seam: anything that maps a sales history and a
//! horizon to dated points with bounds can stand in. The default
//! [`TrendSeasonalForecaster`] fits an additive linear trend with optional
//! weekly and yearly Fourier seasonality.
//!
//! Missing days are treated as "no observation", never as zero sales. Callers
//! that want zero-filled inactive days must pad the history explicitly with
//! [`crate::domain::sales::fill_missing_days`].

pub mod interval;
mod regression;

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::config::{ForecastConfig, SeasonalityMode};
use crate::domain::forecast::{
    DegenerateHistoryWarning, Forecast, ForecastMethod, ForecastPoint, MAX_HORIZON_DAYS,
};
use crate::domain::sales::Observation;
use crate::errors::ForecastError;

use self::regression::{DesignSpec, FittedModel};

const WEEKLY_AUTO_MIN_SPAN_DAYS: i64 = 14;
const YEARLY_AUTO_MIN_SPAN_DAYS: i64 = 730;
const WEEKLY_FOURIER_ORDER: usize = 3;
const YEARLY_FOURIER_ORDER: usize = 6;

pub trait DemandForecaster: Send + Sync {
    /// Forecasts `periods` daily points after the last observed date.
    ///
    /// `history` must be ordered by date ascending. An empty history yields an
    /// empty forecast; a history with a single distinct date yields a flat
    /// forecast at the observed mean with zero-width bounds.
    fn fit_and_forecast(
        &self,
        history: &[Observation],
        periods: usize,
    ) -> Result<Forecast, ForecastError>;
}

impl<T: DemandForecaster + ?Sized> DemandForecaster for &T {
    fn fit_and_forecast(
        &self,
        history: &[Observation],
        periods: usize,
    ) -> Result<Forecast, ForecastError> {
        (**self).fit_and_forecast(history, periods)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrendSeasonalForecaster {
    interval_width: f64,
    weekly: SeasonalityMode,
    yearly: SeasonalityMode,
}

impl Default for TrendSeasonalForecaster {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default())
    }
}

impl TrendSeasonalForecaster {
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self {
            interval_width: config.interval_width,
            weekly: config.weekly_seasonality,
            yearly: config.yearly_seasonality,
        }
    }

    fn design_for(&self, first: NaiveDate, last: NaiveDate) -> DesignSpec {
        let span = (last - first).num_days();
        DesignSpec {
            origin: first,
            span_days: span as f64,
            weekly_order: seasonal_order(self.weekly, span, WEEKLY_AUTO_MIN_SPAN_DAYS, WEEKLY_FOURIER_ORDER),
            yearly_order: seasonal_order(self.yearly, span, YEARLY_AUTO_MIN_SPAN_DAYS, YEARLY_FOURIER_ORDER),
        }
    }
}

fn seasonal_order(mode: SeasonalityMode, span_days: i64, auto_min_span: i64, order: usize) -> usize {
    match mode {
        SeasonalityMode::Enabled => order,
        SeasonalityMode::Disabled => 0,
        SeasonalityMode::Auto if span_days >= auto_min_span => order,
        SeasonalityMode::Auto => 0,
    }
}

impl DemandForecaster for TrendSeasonalForecaster {
    fn fit_and_forecast(
        &self,
        history: &[Observation],
        periods: usize,
    ) -> Result<Forecast, ForecastError> {
        check_horizon(periods)?;
        validate_history(history)?;

        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Ok(Forecast::empty());
        };
        let future = future_dates(last.date, periods)?;

        let distinct_dates = history.iter().map(|o| o.date).collect::<BTreeSet<_>>().len();
        if distinct_dates < 2 {
            return Ok(mean_fallback(history, &future));
        }

        let design = self.design_for(first.date, last.date);
        let model = regression::fit(design.clone(), history)
            .or_else(|| regression::fit(design.without_seasonality(), history));
        let Some(model) = model else {
            return Ok(mean_fallback(history, &future));
        };

        Ok(Forecast {
            points: project(&model, &future, interval::z_score(self.interval_width)),
            method: ForecastMethod::TrendSeasonal,
            warning: None,
        })
    }
}

/// Rejects horizons outside `1..=MAX_HORIZON_DAYS` before any date is built.
pub fn check_horizon(periods: usize) -> Result<(), ForecastError> {
    if periods == 0 || periods > MAX_HORIZON_DAYS as usize {
        return Err(ForecastError::InvalidHorizon {
            requested: i64::try_from(periods).unwrap_or(i64::MAX),
        });
    }
    Ok(())
}

fn validate_history(history: &[Observation]) -> Result<(), ForecastError> {
    for (index, observation) in history.iter().enumerate() {
        if !observation.quantity.is_finite() {
            return Err(ForecastError::MalformedHistory(format!(
                "quantity on {} is not a finite number",
                observation.date
            )));
        }
        if observation.quantity < 0.0 {
            return Err(ForecastError::MalformedHistory(format!(
                "quantity on {} is negative ({})",
                observation.date, observation.quantity
            )));
        }
        if index > 0 && observation.date < history[index - 1].date {
            return Err(ForecastError::MalformedHistory(format!(
                "observations are not ordered by date ({} follows {})",
                observation.date,
                history[index - 1].date
            )));
        }
    }
    Ok(())
}

fn future_dates(last: NaiveDate, periods: usize) -> Result<Vec<NaiveDate>, ForecastError> {
    (1..=periods)
        .map(|step| {
            i64::try_from(step)
                .ok()
                .and_then(|days| last.checked_add_signed(Duration::days(days)))
                .ok_or_else(|| {
                    ForecastError::MalformedHistory(
                        "forecast horizon runs past the supported calendar range".to_string(),
                    )
                })
        })
        .collect()
}

fn mean_fallback(history: &[Observation], future: &[NaiveDate]) -> Forecast {
    let mean = history.iter().map(|o| o.quantity).sum::<f64>() / history.len() as f64;
    Forecast {
        points: future.iter().map(|date| ForecastPoint::exact(*date, mean)).collect(),
        method: ForecastMethod::MeanFallback,
        warning: Some(DegenerateHistoryWarning::SingleDate),
    }
}

fn project(model: &FittedModel, future: &[NaiveDate], z: f64) -> Vec<ForecastPoint> {
    let n = model.observations.max(1) as f64;
    future
        .iter()
        .enumerate()
        .map(|(index, date)| {
            let estimate = model.predict(*date);
            let horizon = (index + 1) as f64;
            let half_width = z * model.residual_std * (1.0 + horizon / n).sqrt();
            ForecastPoint::bracketed(*date, estimate, estimate - half_width, estimate + half_width)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::{DemandForecaster, TrendSeasonalForecaster};
    use crate::config::{ForecastConfig, SeasonalityMode};
    use crate::domain::forecast::{DegenerateHistoryWarning, ForecastMethod};
    use crate::domain::sales::Observation;
    use crate::errors::ForecastError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn noisy_history(days: i64) -> Vec<Observation> {
        let start = date(2024, 1, 1);
        (0..days)
            .map(|day| {
                let weekly = [0.0, 1.0, 2.0, 3.0, 8.0, 10.0, -4.0][(day % 7) as usize];
                let noise = ((day * 37) % 11) as f64 / 5.0 - 1.0;
                Observation::new(start + Duration::days(day), 20.0 + 0.2 * day as f64 + weekly + noise)
            })
            .collect()
    }

    #[test]
    fn zero_periods_is_rejected() {
        let forecaster = TrendSeasonalForecaster::default();
        let error = forecaster
            .fit_and_forecast(&[Observation::new(date(2024, 7, 1), 3.0)], 0)
            .expect_err("zero horizon should fail");

        assert_eq!(error, ForecastError::InvalidHorizon { requested: 0 });
    }

    #[test]
    fn horizon_beyond_ten_years_is_rejected_before_projecting() {
        let forecaster = TrendSeasonalForecaster::default();
        let history = noisy_history(30);

        let error = forecaster
            .fit_and_forecast(&history, u32::MAX as usize)
            .expect_err("oversized horizon should fail");
        assert_eq!(error, ForecastError::InvalidHorizon { requested: i64::from(u32::MAX) });

        let longest = forecaster.fit_and_forecast(&history, 3650).expect("ten-year horizon");
        assert_eq!(longest.points.len(), 3650);
    }

    #[test]
    fn empty_history_gives_empty_forecast_with_warning() {
        let forecast = TrendSeasonalForecaster::default().fit_and_forecast(&[], 7).expect("forecast");

        assert!(forecast.points.is_empty());
        assert_eq!(forecast.warning, Some(DegenerateHistoryWarning::EmptyHistory));
    }

    #[test]
    fn single_observation_falls_back_to_flat_mean() {
        let forecast = TrendSeasonalForecaster::default()
            .fit_and_forecast(&[Observation::new(date(2024, 7, 1), 8.0)], 3)
            .expect("forecast");

        assert_eq!(forecast.points.len(), 3);
        assert_eq!(forecast.method, ForecastMethod::MeanFallback);
        assert_eq!(forecast.warning, Some(DegenerateHistoryWarning::SingleDate));
        for point in &forecast.points {
            assert_eq!(point.point_estimate, 8.0);
            assert_eq!(point.lower_bound, 8.0);
            assert_eq!(point.upper_bound, 8.0);
        }
        assert_eq!(forecast.points[0].date, date(2024, 7, 2));
        assert_eq!(forecast.points[2].date, date(2024, 7, 4));
    }

    #[test]
    fn duplicate_single_date_uses_mean_of_all_rows() {
        let forecast = TrendSeasonalForecaster::default()
            .fit_and_forecast(
                &[Observation::new(date(2024, 7, 1), 6.0), Observation::new(date(2024, 7, 1), 10.0)],
                2,
            )
            .expect("forecast");

        assert!(forecast.points.iter().all(|point| point.point_estimate == 8.0));
    }

    #[test]
    fn two_observations_extend_the_linear_trend() {
        let forecast = TrendSeasonalForecaster::default()
            .fit_and_forecast(
                &[Observation::new(date(2024, 7, 1), 12.0), Observation::new(date(2024, 7, 2), 15.0)],
                7,
            )
            .expect("forecast");

        assert_eq!(forecast.points.len(), 7);
        assert_eq!(forecast.method, ForecastMethod::TrendSeasonal);
        assert!((forecast.points[0].point_estimate - 18.0).abs() < 1e-3);
        assert!((forecast.total_point_estimate() - 189.0).abs() < 1e-2);
    }

    #[test]
    fn points_are_daily_after_the_last_observation_and_bracketed() {
        let history = noisy_history(60);
        let last = history.last().map(|o| o.date).expect("non-empty");
        let forecast = TrendSeasonalForecaster::default().fit_and_forecast(&history, 14).expect("forecast");

        assert_eq!(forecast.points.len(), 14);
        let mut previous = last;
        for point in &forecast.points {
            assert_eq!(point.date, previous + Duration::days(1));
            assert!(point.lower_bound <= point.point_estimate);
            assert!(point.point_estimate <= point.upper_bound);
            previous = point.date;
        }
        assert!(forecast.points[0].upper_bound > forecast.points[0].lower_bound);
    }

    #[test]
    fn interval_widens_with_horizon() {
        let forecast =
            TrendSeasonalForecaster::default().fit_and_forecast(&noisy_history(60), 10).expect("forecast");
        let first = &forecast.points[0];
        let last = &forecast.points[9];

        assert!(last.upper_bound - last.point_estimate > first.upper_bound - first.point_estimate);
    }

    #[test]
    fn sparse_history_skips_missing_days_instead_of_reading_zeros() {
        let history = [
            Observation::new(date(2024, 7, 1), 10.0),
            Observation::new(date(2024, 7, 5), 10.0),
            Observation::new(date(2024, 7, 9), 10.0),
        ];
        let forecast = TrendSeasonalForecaster::default().fit_and_forecast(&history, 3).expect("forecast");

        for point in &forecast.points {
            assert!((point.point_estimate - 10.0).abs() < 1e-3);
        }
    }

    #[test]
    fn seasonality_can_be_forced_on_short_sparse_history() {
        let forecaster = TrendSeasonalForecaster::from_config(&ForecastConfig {
            weekly_seasonality: SeasonalityMode::Enabled,
            ..ForecastConfig::default()
        });
        let history = [
            Observation::new(date(2024, 7, 1), 4.0),
            Observation::new(date(2024, 7, 3), 9.0),
            Observation::new(date(2024, 7, 4), 5.0),
        ];

        let forecast = forecaster.fit_and_forecast(&history, 5).expect("forecast");
        assert_eq!(forecast.points.len(), 5);
        assert!(forecast.points.iter().all(|p| p.point_estimate.is_finite()));
    }

    #[test]
    fn malformed_quantities_are_rejected() {
        let forecaster = TrendSeasonalForecaster::default();
        let nan = [Observation::new(date(2024, 7, 1), f64::NAN), Observation::new(date(2024, 7, 2), 1.0)];
        let negative = [Observation::new(date(2024, 7, 1), -2.0)];

        assert!(matches!(
            forecaster.fit_and_forecast(&nan, 3),
            Err(ForecastError::MalformedHistory(_))
        ));
        assert!(matches!(
            forecaster.fit_and_forecast(&negative, 3),
            Err(ForecastError::MalformedHistory(_))
        ));
    }

    #[test]
    fn unordered_history_is_rejected() {
        let history =
            [Observation::new(date(2024, 7, 3), 1.0), Observation::new(date(2024, 7, 1), 2.0)];

        assert!(matches!(
            TrendSeasonalForecaster::default().fit_and_forecast(&history, 2),
            Err(ForecastError::MalformedHistory(_))
        ));
    }

    #[test]
    fn forecasting_does_not_touch_the_history() {
        let history = noisy_history(30);
        let snapshot = history.clone();
        let forecaster = TrendSeasonalForecaster::default();

        let first = forecaster.fit_and_forecast(&history, 7).expect("forecast");
        let second = forecaster.fit_and_forecast(&history, 7).expect("forecast");

        assert_eq!(history, snapshot);
        assert_eq!(first, second);
    }
}

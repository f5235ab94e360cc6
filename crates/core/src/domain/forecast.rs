use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Longest horizon, in days, any forecast or lead time may span.
pub const MAX_HORIZON_DAYS: u32 = 3650;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// Builds a point whose bounds always bracket the estimate, even when the
    /// model hands back crossed or non-finite bounds.
    pub fn bracketed(date: NaiveDate, point_estimate: f64, lower: f64, upper: f64) -> Self {
        let lower = if lower.is_finite() { lower.min(point_estimate) } else { point_estimate };
        let upper = if upper.is_finite() { upper.max(point_estimate) } else { point_estimate };
        Self { date, point_estimate, lower_bound: lower, upper_bound: upper }
    }

    pub fn exact(date: NaiveDate, value: f64) -> Self {
        Self { date, point_estimate: value, lower_bound: value, upper_bound: value }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    TrendSeasonal,
    MeanFallback,
    None,
}

/// Recorded when the history was too thin for the full model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateHistoryWarning {
    EmptyHistory,
    SingleDate,
}

impl DegenerateHistoryWarning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyHistory => "empty_history",
            Self::SingleDate => "single_date",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    pub method: ForecastMethod,
    pub warning: Option<DegenerateHistoryWarning>,
}

impl Forecast {
    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            method: ForecastMethod::None,
            warning: Some(DegenerateHistoryWarning::EmptyHistory),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_point_estimate(&self) -> f64 {
        self.points.iter().map(|point| point.point_estimate).sum()
    }
}

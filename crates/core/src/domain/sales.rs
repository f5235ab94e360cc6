use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// One recorded sales quantity for one product on one day.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub quantity: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, quantity: f64) -> Self {
        Self { date, quantity }
    }
}

/// Folds observations sharing a date into a single daily total, ascending.
///
/// The forecaster never does this on its own; callers that merge several
/// products' sales (the global forecast) use it before fitting.
pub fn aggregate_daily(history: &[Observation]) -> Vec<Observation> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for observation in history {
        *totals.entry(observation.date).or_insert(0.0) += observation.quantity;
    }
    totals.into_iter().map(|(date, quantity)| Observation { date, quantity }).collect()
}

/// Inserts zero-quantity observations for every day without sales between the
/// first and last observed dates.
///
/// Opt-in only: the forecaster treats a missing day as "no observation", and
/// padding with zeros pulls the fitted level down, often by a lot.
pub fn fill_missing_days(history: &[Observation]) -> Vec<Observation> {
    let Some(first) = history.first() else {
        return Vec::new();
    };

    let mut filled = Vec::with_capacity(history.len());
    let mut expected = first.date;
    for observation in history {
        while expected < observation.date {
            filled.push(Observation::new(expected, 0.0));
            expected += Duration::days(1);
        }
        filled.push(*observation);
        if observation.date >= expected {
            expected = observation.date + Duration::days(1);
        }
    }
    filled
}

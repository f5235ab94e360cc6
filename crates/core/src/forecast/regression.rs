//! Least-squares fit of the additive trend + seasonality model.
//!
//! The design row for a date is `[1, t, weekly fourier terms, yearly fourier
//! terms]` where `t` is the day offset from the first observation scaled by
//! the history span. Seasonal terms use the absolute day number so the phase
//! of a future date lines up with the history without extra bookkeeping.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

use crate::domain::sales::Observation;

const WEEK_DAYS: f64 = 7.0;
const YEAR_DAYS: f64 = 365.25;
/// Ridge penalty on intercept and trend; only there to keep pivots finite.
const TREND_RIDGE: f64 = 1e-9;
/// Ridge penalty on seasonal coefficients, shrinks them when data is sparse.
const SEASONAL_RIDGE: f64 = 1e-3;
const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DesignSpec {
    pub origin: NaiveDate,
    pub span_days: f64,
    pub weekly_order: usize,
    pub yearly_order: usize,
}

impl DesignSpec {
    pub fn width(&self) -> usize {
        2 + 2 * self.weekly_order + 2 * self.yearly_order
    }

    pub fn without_seasonality(&self) -> Self {
        Self { weekly_order: 0, yearly_order: 0, ..self.clone() }
    }

    pub fn row(&self, date: NaiveDate) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        let offset = (date - self.origin).num_days() as f64;
        row.push(1.0);
        row.push(offset / self.span_days.max(1.0));

        let day_number = f64::from(date.num_days_from_ce());
        push_fourier(&mut row, day_number, WEEK_DAYS, self.weekly_order);
        push_fourier(&mut row, day_number, YEAR_DAYS, self.yearly_order);
        row
    }

    fn ridge(&self, column: usize) -> f64 {
        if column < 2 {
            TREND_RIDGE
        } else {
            SEASONAL_RIDGE
        }
    }
}

fn push_fourier(row: &mut Vec<f64>, day_number: f64, period: f64, order: usize) {
    for k in 1..=order {
        let angle = 2.0 * PI * (k as f64) * day_number / period;
        row.push(angle.sin());
        row.push(angle.cos());
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FittedModel {
    pub spec: DesignSpec,
    pub coefficients: Vec<f64>,
    pub residual_std: f64,
    pub observations: usize,
}

impl FittedModel {
    pub fn predict(&self, date: NaiveDate) -> f64 {
        self.spec.row(date).iter().zip(&self.coefficients).map(|(x, beta)| x * beta).sum()
    }
}

/// Fits the model by solving the ridge-stabilised normal equations.
/// Returns `None` when the system is singular.
pub(crate) fn fit(spec: DesignSpec, history: &[Observation]) -> Option<FittedModel> {
    let width = spec.width();
    let mut gram = vec![vec![0.0; width]; width];
    let mut moment = vec![0.0; width];

    for observation in history {
        let row = spec.row(observation.date);
        for i in 0..width {
            moment[i] += row[i] * observation.quantity;
            for j in i..width {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..width {
        for j in 0..i {
            gram[i][j] = gram[j][i];
        }
        gram[i][i] += spec.ridge(i);
    }

    let coefficients = solve(gram, moment)?;
    let residual_sum: f64 = history
        .iter()
        .map(|observation| {
            let fitted: f64 =
                spec.row(observation.date).iter().zip(&coefficients).map(|(x, b)| x * b).sum();
            (observation.quantity - fitted).powi(2)
        })
        .sum();
    let degrees_of_freedom = history.len().saturating_sub(width).max(1) as f64;
    let residual_std = (residual_sum / degrees_of_freedom).sqrt();
    if !residual_std.is_finite() || coefficients.iter().any(|beta| !beta.is_finite()) {
        return None;
    }

    Some(FittedModel { spec, coefficients, residual_std, observations: history.len() })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot_row =
            (col..n).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot_row][col].abs() < PIVOT_EPSILON {
            return None;
        }
        matrix.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = matrix[row][col] / matrix[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }
    Some(solution)
}

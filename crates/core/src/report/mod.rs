//! Batch replenishment report.
//!
//! Every product is forecast over its own lead time and passed through the
//! recommendation engine. One product failing never aborts the batch: its row
//! carries zero demand and zero order quantity, and the failure is recorded.

use std::io::Write;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::product::{Product, ProductId};
use crate::domain::sales::{fill_missing_days, Observation};
use crate::errors::ForecastError;
use crate::forecast::DemandForecaster;
use crate::replenishment::RecommendationEngine;

/// One product and its sales history, or the reason the history could not
/// be read.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductInput {
    pub product: Product,
    pub history: Result<Vec<Observation>, String>,
}

impl ProductInput {
    pub fn new(product: Product, history: Vec<Observation>) -> Self {
        Self { product, history: Ok(history) }
    }

    pub fn unreadable(product: Product, reason: impl Into<String>) -> Self {
        Self { product, history: Err(reason.into()) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub current_stock: i64,
    pub forecast_demand: f64,
    pub recommended_qty: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFailure {
    pub product_id: ProductId,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub failures: Vec<ProductFailure>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv export produced invalid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("csv export could not flush: {0}")]
    Io(#[from] std::io::Error),
}

/// Column order of the export is fixed: identity, stock, demand, quantity.
#[derive(Serialize)]
struct CsvRow<'a> {
    product_id: &'a str,
    product_name: &'a str,
    current_stock: i64,
    forecast_demand: f64,
    recommended_qty: u64,
}

impl Report {
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(CsvRow {
                product_id: &row.product_id.0,
                product_name: &row.product_name,
                current_stock: row.current_stock,
                forecast_demand: round_one_decimal(row.forecast_demand),
                recommended_qty: row.recommended_qty,
            })?;
        }
        if self.rows.is_empty() {
            csv_writer.write_record([
                "product_id",
                "product_name",
                "current_stock",
                "forecast_demand",
                "recommended_qty",
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, ReportError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub struct AggregateReportBuilder<F, R> {
    forecaster: F,
    engine: R,
    parallel: bool,
    fill_missing_days: bool,
}

impl<F, R> AggregateReportBuilder<F, R>
where
    F: DemandForecaster,
    R: RecommendationEngine,
{
    pub fn new(forecaster: F, engine: R) -> Self {
        Self { forecaster, engine, parallel: false, fill_missing_days: false }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Pads each history with zero-sales days before fitting.
    pub fn fill_missing_days(mut self, fill: bool) -> Self {
        self.fill_missing_days = fill;
        self
    }

    pub fn build(&self, products: &[ProductInput]) -> Report {
        let outcomes: Vec<Result<ReportRow, ProductFailure>> = if self.parallel {
            products.par_iter().map(|input| self.evaluate(input)).collect()
        } else {
            products.iter().map(|input| self.evaluate(input)).collect()
        };

        let mut report = Report::default();
        for (input, outcome) in products.iter().zip(outcomes) {
            match outcome {
                Ok(row) => report.rows.push(row),
                Err(failure) => {
                    warn!(
                        event_name = "core.report.product_failed",
                        product_id = %failure.product_id,
                        reason = %failure.reason,
                        "product excluded from report computation"
                    );
                    report.rows.push(zero_row(&input.product));
                    report.failures.push(failure);
                }
            }
        }

        debug!(
            event_name = "core.report.built",
            products = products.len(),
            failures = report.failures.len(),
            "replenishment report assembled"
        );
        report
    }

    fn evaluate(&self, input: &ProductInput) -> Result<ReportRow, ProductFailure> {
        let product = &input.product;
        let history = input.history.as_deref().map_err(|reason| ProductFailure {
            product_id: product.id.clone(),
            reason: format!("sales history unreadable: {reason}"),
        })?;
        let lead_time = self.engine.lead_time_for(&product.profile);
        let padded;
        let history = if self.fill_missing_days {
            padded = fill_missing_days(history);
            padded.as_slice()
        } else {
            history
        };

        let periods = usize::try_from(lead_time).unwrap_or(usize::MAX);
        let forecast = self
            .forecaster
            .fit_and_forecast(history, periods)
            .map_err(|error: ForecastError| ProductFailure {
                product_id: product.id.clone(),
                reason: error.to_string(),
            })?;
        let recommendation = self.engine.recommend(&forecast.points, &product.profile);

        Ok(ReportRow {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            current_stock: product.profile.current_stock,
            forecast_demand: recommendation.forecast_demand_over_lead_time,
            recommended_qty: recommendation.recommended_order_qty,
        })
    }
}

fn zero_row(product: &Product) -> ReportRow {
    ReportRow {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        current_stock: product.profile.current_stock,
        forecast_demand: 0.0,
        recommended_qty: 0,
    }
}

//! Request-scoped orchestration over an injected inventory store.
//!
//! Each call reads what it needs through [`InventoryStore`], runs the pure
//! forecasting and recommendation code, and returns plain values. Nothing is
//! cached between calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::domain::forecast::Forecast;
use crate::domain::product::{Product, ProductId};
use crate::domain::recommendation::ProductRecommendation;
use crate::domain::sales::{aggregate_daily, fill_missing_days, Observation};
use crate::errors::ApplicationError;
use crate::forecast::{check_horizon, DemandForecaster, TrendSeasonalForecaster};
use crate::replenishment::{DeterministicRecommendationEngine, RecommendationEngine};
use crate::report::{AggregateReportBuilder, ProductInput, Report};

/// Read side of the product and sales data the service works on.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Sales of one product, ascending by date.
    async fn fetch_observations(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Observation>, ApplicationError>;

    async fn fetch_profile(&self, product_id: &ProductId)
        -> Result<Option<Product>, ApplicationError>;

    async fn fetch_all_products(&self) -> Result<Vec<Product>, ApplicationError>;

    /// Sales of every product, ascending by date. Dates may repeat.
    async fn fetch_all_observations(&self) -> Result<Vec<Observation>, ApplicationError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStatus {
    Modeled,
    Degenerate,
    NoData,
}

impl ForecastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modeled => "modeled",
            Self::Degenerate => "degenerate",
            Self::NoData => "no_data",
        }
    }

    fn of(history: &[Observation], forecast: &Forecast) -> Self {
        if history.is_empty() {
            Self::NoData
        } else if forecast.warning.is_some() {
            Self::Degenerate
        } else {
            Self::Modeled
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductForecast {
    pub product_id: ProductId,
    pub product_name: String,
    pub status: ForecastStatus,
    pub history: Vec<Observation>,
    pub forecast: Forecast,
}

/// Forecast of all products' sales folded per day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateForecast {
    pub status: ForecastStatus,
    pub observed_days: usize,
    pub forecast: Forecast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceOptions {
    pub default_periods: u32,
    pub report_parallel: bool,
    pub fill_missing_days: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self { default_periods: 30, report_parallel: true, fill_missing_days: false }
    }
}

pub struct ReplenishmentService<
    S,
    F = TrendSeasonalForecaster,
    R = DeterministicRecommendationEngine,
> {
    store: S,
    forecaster: F,
    engine: R,
    options: ServiceOptions,
}

impl<S: InventoryStore> ReplenishmentService<S> {
    pub fn from_config(store: S, config: &AppConfig) -> Self {
        Self {
            store,
            forecaster: TrendSeasonalForecaster::from_config(&config.forecast),
            engine: DeterministicRecommendationEngine::new(
                config.recommendation.default_lead_time_days,
            ),
            options: ServiceOptions {
                default_periods: config.forecast.default_periods,
                report_parallel: config.report.parallel,
                fill_missing_days: config.report.fill_missing_days,
            },
        }
    }
}

impl<S, F, R> ReplenishmentService<S, F, R>
where
    S: InventoryStore,
    F: DemandForecaster,
    R: RecommendationEngine,
{
    pub fn with_components(store: S, forecaster: F, engine: R, options: ServiceOptions) -> Self {
        Self { store, forecaster, engine, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn default_periods(&self) -> u32 {
        self.options.default_periods
    }

    /// Forecasts one product. `periods` falls back to the configured default.
    pub async fn forecast_product(
        &self,
        product_id: &ProductId,
        periods: Option<u32>,
    ) -> Result<ProductForecast, ApplicationError> {
        let periods = periods.unwrap_or(self.options.default_periods);
        check_horizon(periods as usize)?;
        let product = self.require_product(product_id).await?;
        let history = self.store.fetch_observations(product_id).await?;

        let forecast = self.forecaster.fit_and_forecast(&history, periods as usize)?;
        let status = ForecastStatus::of(&history, &forecast);

        info!(
            event_name = "core.service.product_forecast",
            product_id = %product_id,
            periods,
            observations = history.len(),
            status = status.as_str(),
            "product forecast computed"
        );

        Ok(ProductForecast {
            product_id: product.id,
            product_name: product.name,
            status,
            history,
            forecast,
        })
    }

    /// Forecasts total demand across every product.
    pub async fn forecast_all(
        &self,
        periods: Option<u32>,
    ) -> Result<AggregateForecast, ApplicationError> {
        let periods = periods.unwrap_or(self.options.default_periods);
        check_horizon(periods as usize)?;
        let daily = aggregate_daily(&self.store.fetch_all_observations().await?);

        let forecast = self.forecaster.fit_and_forecast(&daily, periods as usize)?;
        let status = ForecastStatus::of(&daily, &forecast);

        info!(
            event_name = "core.service.aggregate_forecast",
            periods,
            observed_days = daily.len(),
            status = status.as_str(),
            "aggregate forecast computed"
        );

        Ok(AggregateForecast { status, observed_days: daily.len(), forecast })
    }

    /// Forecasts one product over its lead time and recommends an order.
    pub async fn recommend_product(
        &self,
        product_id: &ProductId,
    ) -> Result<ProductRecommendation, ApplicationError> {
        let product = self.require_product(product_id).await?;
        let history = self.prepare_history(self.store.fetch_observations(product_id).await?);

        let lead_time = self.engine.lead_time_for(&product.profile);
        let forecast = self.forecaster.fit_and_forecast(&history, lead_time as usize)?;
        let recommendation = self.engine.recommend(&forecast.points, &product.profile);

        info!(
            event_name = "core.service.recommendation",
            product_id = %product_id,
            lead_time_days = recommendation.lead_time_days,
            forecast_demand = recommendation.forecast_demand_over_lead_time,
            recommended_order_qty = recommendation.recommended_order_qty,
            window_truncated = recommendation.window_truncated,
            clamped_inputs = recommendation.clamped_inputs.len(),
            "replenishment recommendation computed"
        );

        Ok(ProductRecommendation {
            product_id: product.id,
            product_name: product.name,
            profile: product.profile,
            recommendation,
        })
    }

    /// Builds the replenishment report for every product in the store. Only a
    /// failure to list the products fails the request; a product whose sales
    /// cannot be read gets a zero row and a recorded failure.
    pub async fn build_report(&self) -> Result<Report, ApplicationError> {
        let products = self.store.fetch_all_products().await?;
        let mut inputs = Vec::with_capacity(products.len());
        for product in products {
            let input = match self.store.fetch_observations(&product.id).await {
                Ok(history) => ProductInput::new(product, history),
                Err(error) => ProductInput::unreadable(product, error.to_string()),
            };
            inputs.push(input);
        }
        debug!(
            event_name = "core.service.report_inputs_loaded",
            products = inputs.len(),
            "report inputs loaded"
        );

        let builder = AggregateReportBuilder::new(&self.forecaster, &self.engine)
            .parallel(self.options.report_parallel)
            .fill_missing_days(self.options.fill_missing_days);
        Ok(builder.build(&inputs))
    }

    async fn require_product(&self, product_id: &ProductId) -> Result<Product, ApplicationError> {
        self.store
            .fetch_profile(product_id)
            .await?
            .ok_or_else(|| ApplicationError::ProductNotFound(product_id.clone()))
    }

    fn prepare_history(&self, history: Vec<Observation>) -> Vec<Observation> {
        if self.options.fill_missing_days {
            fill_missing_days(&history)
        } else {
            history
        }
    }
}

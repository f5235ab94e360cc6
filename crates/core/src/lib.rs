pub mod config;
pub mod domain;
pub mod errors;
pub mod forecast;
pub mod plot;
pub mod replenishment;
pub mod report;
pub mod service;

pub use domain::forecast::{DegenerateHistoryWarning, Forecast, ForecastMethod, ForecastPoint};
pub use domain::product::{InventoryProfile, Product, ProductId, DEFAULT_LEAD_TIME_DAYS};
pub use domain::recommendation::{ProductRecommendation, Recommendation};
pub use domain::sales::Observation;
pub use errors::{ApplicationError, DomainError, ForecastError, InterfaceError};
pub use forecast::{DemandForecaster, TrendSeasonalForecaster};
pub use plot::{PlotError, PlotRenderer};
pub use replenishment::{DeterministicRecommendationEngine, RecommendationEngine};
pub use report::{AggregateReportBuilder, ProductFailure, ProductInput, Report, ReportRow};
pub use service::{
    AggregateForecast, ForecastStatus, InventoryStore, ProductForecast, ReplenishmentService,
    ServiceOptions,
};

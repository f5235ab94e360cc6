use restock_core::config::{AppConfig, LoadOptions};
use restock_core::domain::product::ProductId;
use restock_core::service::ForecastStatus;

use crate::commands::{load_config, with_service, CommandResult};

/// Forecasts one product, or total demand across every product when
/// `product` is `None`.
pub fn run(options: LoadOptions, product: Option<String>, periods: Option<u32>) -> CommandResult {
    let config = match load_config("forecast", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    match product {
        Some(product) => product_forecast(&config, ProductId(product), periods),
        None => aggregate_forecast(&config, periods),
    }
}

fn product_forecast(
    config: &AppConfig,
    product_id: ProductId,
    periods: Option<u32>,
) -> CommandResult {
    let forecast = match with_service("forecast", config, |service| async move {
        service.forecast_product(&product_id, periods).await
    }) {
        Ok(forecast) => forecast,
        Err(result) => return result,
    };

    let summary = format!(
        "{} forecast points for `{}`",
        forecast.forecast.points.len(),
        forecast.product_name
    );
    match forecast.status {
        ForecastStatus::NoData => CommandResult::no_data(
            "forecast",
            "No data is available for this product.",
            Some(&forecast),
        ),
        ForecastStatus::Degenerate => {
            let warning = forecast.forecast.warning.map(|warning| warning.as_str());
            CommandResult::success_with_data(
                "forecast",
                format!("{summary} (flat fallback: {})", warning.unwrap_or("degenerate history")),
                &forecast,
            )
        }
        ForecastStatus::Modeled => {
            CommandResult::success_with_data("forecast", summary, &forecast)
        }
    }
}

fn aggregate_forecast(config: &AppConfig, periods: Option<u32>) -> CommandResult {
    let forecast = match with_service("forecast", config, |service| async move {
        service.forecast_all(periods).await
    }) {
        Ok(forecast) => forecast,
        Err(result) => return result,
    };

    if forecast.status == ForecastStatus::NoData {
        let message = "No sales have been recorded yet.";
        return CommandResult::no_data("forecast", message, Some(&forecast));
    }
    CommandResult::success_with_data(
        "forecast",
        format!(
            "{} forecast points from {} observed days across all products",
            forecast.forecast.points.len(),
            forecast.observed_days
        ),
        &forecast,
    )
}

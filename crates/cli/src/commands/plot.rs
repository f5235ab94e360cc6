use std::path::PathBuf;

use restock_core::config::LoadOptions;
use restock_core::domain::product::ProductId;
use restock_core::plot::PlotRenderer;
use restock_core::service::ForecastStatus;
use serde::Serialize;

use crate::commands::{load_config, with_service, CommandResult};

#[derive(Debug, Serialize)]
struct PlotOutput {
    product_id: String,
    status: ForecastStatus,
    path: String,
}

/// Forecasts one product and writes its SVG chart into `output_dir`, or the
/// configured plot directory.
pub fn run(
    options: LoadOptions,
    product: String,
    periods: Option<u32>,
    output_dir: Option<PathBuf>,
) -> CommandResult {
    let config = match load_config("plot", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let output_dir = output_dir.unwrap_or_else(|| config.plot.output_dir.clone());

    let product_id = ProductId(product);
    let outcome = with_service("plot", &config, |service| async move {
        service.forecast_product(&product_id, periods).await
    });
    let forecast = match outcome {
        Ok(forecast) => forecast,
        Err(result) => return result,
    };

    if forecast.status == ForecastStatus::NoData {
        return CommandResult::no_data::<PlotOutput>(
            "plot",
            "No data is available for this product.",
            None,
        );
    }

    let renderer = match PlotRenderer::new() {
        Ok(renderer) => renderer,
        Err(error) => return CommandResult::failure("plot", "render", error.to_string(), 3),
    };
    let written = renderer.render_to_dir(
        &output_dir,
        &forecast.product_id,
        &forecast.product_name,
        &forecast.history,
        &forecast.forecast.points,
    );

    match written {
        Ok(path) => {
            let output = PlotOutput {
                product_id: forecast.product_id.0.clone(),
                status: forecast.status,
                path: path.display().to_string(),
            };
            CommandResult::success_with_data(
                "plot",
                format!("wrote forecast chart to {}", output.path),
                &output,
            )
        }
        Err(error) => CommandResult::failure("plot", "render", error.to_string(), 3),
    }
}

use restock_core::config::LoadOptions;
use restock_core::domain::product::ProductId;

use crate::commands::{load_config, with_service, CommandResult};

pub fn run(options: LoadOptions, product: String) -> CommandResult {
    let config = match load_config("recommend", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let product_id = ProductId(product);
    let outcome = with_service("recommend", &config, |service| async move {
        service.recommend_product(&product_id).await
    });
    let recommendation = match outcome {
        Ok(recommendation) => recommendation,
        Err(result) => return result,
    };

    let details = &recommendation.recommendation;
    let mut message = format!(
        "order {} units of `{}` (forecast demand {:.2} over {} days, stock {})",
        details.recommended_order_qty,
        recommendation.product_name,
        details.forecast_demand_over_lead_time,
        details.lead_time_days,
        recommendation.profile.current_stock
    );
    if details.window_truncated {
        message.push_str("; forecast covered fewer days than the lead time");
    }
    CommandResult::success_with_data("recommend", message, &recommendation)
}

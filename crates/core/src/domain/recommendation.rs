use serde::{Deserialize, Serialize};

use crate::domain::product::{InventoryProfile, ProductId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampedField {
    CurrentStock,
    Capacity,
}

/// An input value that was outside its valid range and was replaced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampedInput {
    pub field: ClampedField,
    pub original: i64,
    pub applied: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub forecast_demand_over_lead_time: f64,
    pub recommended_order_qty: u64,
    pub lead_time_days: u32,
    /// Set when the forecast held fewer points than the lead time.
    pub window_truncated: bool,
    pub clamped_inputs: Vec<ClampedInput>,
}

impl Recommendation {
    pub fn zero(lead_time_days: u32) -> Self {
        Self {
            forecast_demand_over_lead_time: 0.0,
            recommended_order_qty: 0,
            lead_time_days,
            window_truncated: false,
            clamped_inputs: Vec::new(),
        }
    }
}

/// Recommendation joined with the profile it was computed from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecommendation {
    pub product_id: ProductId,
    pub product_name: String,
    pub profile: InventoryProfile,
    pub recommendation: Recommendation,
}

use crate::domain::forecast::ForecastPoint;
use crate::domain::product::{InventoryProfile, DEFAULT_LEAD_TIME_DAYS};
use crate::domain::recommendation::{ClampedField, ClampedInput, Recommendation};

pub trait RecommendationEngine: Send + Sync {
    fn recommend(&self, forecast: &[ForecastPoint], profile: &InventoryProfile) -> Recommendation;

    /// Forecast horizon the engine needs for `profile`.
    fn lead_time_for(&self, profile: &InventoryProfile) -> u32 {
        profile.effective_lead_time(DEFAULT_LEAD_TIME_DAYS)
    }
}

impl<T: RecommendationEngine + ?Sized> RecommendationEngine for &T {
    fn recommend(&self, forecast: &[ForecastPoint], profile: &InventoryProfile) -> Recommendation {
        (**self).recommend(forecast, profile)
    }

    fn lead_time_for(&self, profile: &InventoryProfile) -> u32 {
        (**self).lead_time_for(profile)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeterministicRecommendationEngine {
    default_lead_time_days: u32,
}

impl Default for DeterministicRecommendationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_TIME_DAYS)
    }
}

impl DeterministicRecommendationEngine {
    pub fn new(default_lead_time_days: u32) -> Self {
        Self { default_lead_time_days: default_lead_time_days.max(1) }
    }
}

impl RecommendationEngine for DeterministicRecommendationEngine {
    fn recommend(&self, forecast: &[ForecastPoint], profile: &InventoryProfile) -> Recommendation {
        recommend_order(forecast, profile, self.default_lead_time_days)
    }

    fn lead_time_for(&self, profile: &InventoryProfile) -> u32 {
        profile.effective_lead_time(self.default_lead_time_days)
    }
}

/// Order quantity covering forecast demand over the lead time, capped by the
/// free storage when a capacity is declared.
///
/// When the forecast is shorter than the lead time every available point is
/// used and `window_truncated` is set; the shortfall is not extrapolated.
pub fn recommend_order(
    forecast: &[ForecastPoint],
    profile: &InventoryProfile,
    default_lead_time_days: u32,
) -> Recommendation {
    let lead_time = profile.effective_lead_time(default_lead_time_days);
    if forecast.is_empty() {
        return Recommendation::zero(lead_time);
    }

    let mut clamped_inputs = Vec::new();
    let current_stock =
        clamp_non_negative(ClampedField::CurrentStock, profile.current_stock, &mut clamped_inputs);
    let capacity = profile
        .capacity
        .map(|capacity| clamp_non_negative(ClampedField::Capacity, capacity, &mut clamped_inputs));

    let window = usize::try_from(lead_time).unwrap_or(usize::MAX);
    let window_truncated = forecast.len() < window;
    let selected = &forecast[forecast.len().saturating_sub(window)..];
    let forecast_demand = selected.iter().map(|point| point.point_estimate).sum::<f64>().max(0.0);

    let stock = current_stock as f64;
    let max_orderable = match capacity {
        Some(capacity) if capacity > 0 => (capacity as f64 - stock).max(0.0),
        _ => forecast_demand - stock,
    };
    let raw_need = (forecast_demand - stock).max(0.0);
    let quantity = max_orderable.min(raw_need).floor().max(0.0);

    Recommendation {
        forecast_demand_over_lead_time: forecast_demand,
        recommended_order_qty: quantity as u64,
        lead_time_days: lead_time,
        window_truncated,
        clamped_inputs,
    }
}

fn clamp_non_negative(field: ClampedField, value: i64, clamped: &mut Vec<ClampedInput>) -> i64 {
    if value < 0 {
        clamped.push(ClampedInput { field, original: value, applied: 0 });
        0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::{DeterministicRecommendationEngine, RecommendationEngine};
    use crate::domain::forecast::ForecastPoint;
    use crate::domain::product::InventoryProfile;
    use crate::domain::recommendation::ClampedField;

    fn flat_forecast(days: usize, value: f64) -> Vec<ForecastPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 7, 3).expect("valid date");
        (0..days)
            .map(|day| ForecastPoint::exact(start + Duration::days(day as i64), value))
            .collect()
    }

    fn engine() -> DeterministicRecommendationEngine {
        DeterministicRecommendationEngine::default()
    }

    #[test]
    fn empty_forecast_recommends_nothing() {
        let recommendation = engine().recommend(&[], &InventoryProfile::new(0, Some(100), Some(7)));

        assert_eq!(recommendation.forecast_demand_over_lead_time, 0.0);
        assert_eq!(recommendation.recommended_order_qty, 0);
    }

    #[test]
    fn capacity_headroom_caps_the_order() {
        // demand 7 * 27 = 189, need 159, headroom 70
        let recommendation =
            engine().recommend(&flat_forecast(7, 27.0), &InventoryProfile::new(30, Some(100), Some(7)));

        assert_eq!(recommendation.forecast_demand_over_lead_time, 189.0);
        assert_eq!(recommendation.recommended_order_qty, 70);
        assert!(30 + recommendation.recommended_order_qty <= 100);
    }

    #[test]
    fn shortfall_is_ordered_when_it_fits_under_capacity() {
        let recommendation =
            engine().recommend(&flat_forecast(7, 5.5), &InventoryProfile::new(10, Some(100), Some(7)));

        // 38.5 - 10 = 28.5, floored
        assert_eq!(recommendation.recommended_order_qty, 28);
    }

    #[test]
    fn unset_capacity_orders_the_projected_shortfall() {
        let recommendation =
            engine().recommend(&flat_forecast(7, 10.0), &InventoryProfile::new(20, None, Some(7)));

        assert_eq!(recommendation.recommended_order_qty, 50);
    }

    #[test]
    fn overstocked_product_without_capacity_orders_nothing() {
        // capacity 0 means unset; 50 demand against 150 in stock
        let forecast = flat_forecast(5, 10.0);
        let recommendation = engine().recommend(&forecast, &InventoryProfile::new(150, Some(0), Some(5)));

        assert_eq!(recommendation.forecast_demand_over_lead_time, 50.0);
        assert_eq!(recommendation.recommended_order_qty, 0);
    }

    #[test]
    fn only_the_last_lead_time_points_are_summed() {
        let mut forecast = flat_forecast(10, 1.0);
        for point in forecast.iter_mut().skip(7) {
            point.point_estimate = 100.0;
        }

        let recommendation = engine().recommend(&forecast, &InventoryProfile::new(0, None, Some(3)));

        assert_eq!(recommendation.forecast_demand_over_lead_time, 300.0);
        assert!(!recommendation.window_truncated);
    }

    #[test]
    fn short_forecast_uses_every_point_and_flags_truncation() {
        let recommendation =
            engine().recommend(&flat_forecast(3, 4.0), &InventoryProfile::new(0, None, Some(7)));

        assert_eq!(recommendation.forecast_demand_over_lead_time, 12.0);
        assert!(recommendation.window_truncated);
        assert_eq!(recommendation.lead_time_days, 7);
    }

    #[test]
    fn missing_lead_time_defaults_to_seven_days() {
        let recommendation = engine().recommend(&flat_forecast(10, 1.0), &InventoryProfile::new(0, None, None));

        assert_eq!(recommendation.lead_time_days, 7);
        assert_eq!(recommendation.forecast_demand_over_lead_time, 7.0);
    }

    #[test]
    fn negative_inputs_are_clamped_and_reported() {
        let recommendation =
            engine().recommend(&flat_forecast(7, 2.0), &InventoryProfile::new(-5, Some(-1), Some(7)));

        assert_eq!(recommendation.recommended_order_qty, 14);
        let fields = recommendation.clamped_inputs.iter().map(|c| c.field).collect::<Vec<_>>();
        assert_eq!(fields, vec![ClampedField::CurrentStock, ClampedField::Capacity]);
    }

    #[test]
    fn negative_forecast_demand_floors_at_zero() {
        let recommendation =
            engine().recommend(&flat_forecast(7, -3.0), &InventoryProfile::new(0, None, Some(7)));

        assert_eq!(recommendation.forecast_demand_over_lead_time, 0.0);
        assert_eq!(recommendation.recommended_order_qty, 0);
    }

    #[test]
    fn recommendation_is_never_negative_and_respects_capacity() {
        for stock in [0_i64, 10, 50, 99, 100, 250] {
            for capacity in [None, Some(0), Some(60), Some(100)] {
                for value in [0.0, 0.4, 3.0, 12.5, 40.0] {
                    let profile = InventoryProfile::new(stock, capacity, Some(7));
                    let recommendation = engine().recommend(&flat_forecast(7, value), &profile);
                    if let Some(capacity) = capacity.filter(|c| *c > 0 && stock <= *c) {
                        assert!(stock as u64 + recommendation.recommended_order_qty <= capacity as u64);
                    }
                    assert!(recommendation.forecast_demand_over_lead_time >= 0.0);
                }
            }
        }
    }

    #[test]
    fn recommending_twice_gives_identical_output() {
        let forecast = flat_forecast(7, 9.3);
        let profile = InventoryProfile::new(12, Some(80), Some(7));

        assert_eq!(engine().recommend(&forecast, &profile), engine().recommend(&forecast, &profile));
    }
}

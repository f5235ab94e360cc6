use serde::{Deserialize, Serialize};

use crate::domain::forecast::MAX_HORIZON_DAYS;
use crate::errors::DomainError;

pub const DEFAULT_LEAD_TIME_DAYS: u32 = 7;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stock position of a single product as read from the store.
///
/// Fields keep the raw signed values so the recommendation engine can clamp
/// and report invalid inputs instead of having them disappear in a cast.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryProfile {
    pub current_stock: i64,
    /// Maximum storage quantity. `None` or `Some(0)` means unconstrained.
    pub capacity: Option<i64>,
    pub lead_time_days: Option<i64>,
}

impl InventoryProfile {
    pub fn new(current_stock: i64, capacity: Option<i64>, lead_time_days: Option<i64>) -> Self {
        Self { current_stock, capacity, lead_time_days }
    }

    /// Lead time used for decisions, falling back to `default_days` when the
    /// profile carries no positive value.
    pub fn effective_lead_time(&self, default_days: u32) -> u32 {
        match self.lead_time_days {
            Some(days) if days > 0 => u32::try_from(days).unwrap_or(u32::MAX),
            _ => default_days.max(1),
        }
    }

    /// Capacity ceiling, if one is declared.
    pub fn declared_capacity(&self) -> Option<i64> {
        self.capacity.filter(|capacity| *capacity > 0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub profile: InventoryProfile,
}

impl Product {
    /// Checks a product about to be registered. Stored rows may still carry
    /// out-of-range values; the recommendation engine clamps those.
    pub fn validate_new(&self) -> Result<(), DomainError> {
        let invalid = |message: &str| Err(DomainError::InvalidRequest(message.to_string()));

        if self.id.0.trim().is_empty() {
            return invalid("product id must not be empty");
        }
        if self.name.trim().is_empty() {
            return invalid("product name must not be empty");
        }
        if self.profile.current_stock < 0 {
            return invalid("current stock must not be negative");
        }
        if self.profile.capacity.is_some_and(|capacity| capacity < 0) {
            return invalid("capacity must not be negative");
        }
        match self.profile.lead_time_days {
            Some(days) if days <= 0 => invalid("lead time must be at least one day"),
            Some(days) if days > i64::from(MAX_HORIZON_DAYS) => {
                invalid("lead time must not exceed 3650 days")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InventoryProfile, Product, ProductId, DEFAULT_LEAD_TIME_DAYS};
    use crate::errors::DomainError;

    fn registered(lead_time_days: Option<i64>) -> Product {
        Product {
            id: ProductId("prod-c".to_string()),
            name: "Produit C".to_string(),
            profile: InventoryProfile::new(12, Some(40), lead_time_days),
        }
    }

    #[test]
    fn new_product_lead_time_is_bounded() {
        assert_eq!(registered(None).validate_new(), Ok(()));
        assert_eq!(registered(Some(3650)).validate_new(), Ok(()));
        assert!(matches!(
            registered(Some(3651)).validate_new(),
            Err(DomainError::InvalidRequest(ref message)) if message.contains("3650")
        ));
        assert!(registered(Some(0)).validate_new().is_err());
    }

    #[test]
    fn lead_time_defaults_when_missing_or_non_positive() {
        assert_eq!(InventoryProfile::new(0, None, None).effective_lead_time(7), 7);
        assert_eq!(InventoryProfile::new(0, None, Some(0)).effective_lead_time(7), 7);
        assert_eq!(InventoryProfile::new(0, None, Some(-3)).effective_lead_time(7), 7);
        assert_eq!(
            InventoryProfile::new(0, None, Some(5)).effective_lead_time(DEFAULT_LEAD_TIME_DAYS),
            5
        );
    }

    #[test]
    fn zero_capacity_counts_as_unconstrained() {
        assert_eq!(InventoryProfile::new(10, Some(0), None).declared_capacity(), None);
        assert_eq!(InventoryProfile::new(10, None, None).declared_capacity(), None);
        assert_eq!(InventoryProfile::new(10, Some(80), None).declared_capacity(), Some(80));
    }
}

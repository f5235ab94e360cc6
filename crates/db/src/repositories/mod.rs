use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use restock_core::domain::product::{Product, ProductId};
use restock_core::domain::sales::Observation;

pub mod memory;
pub mod product;
pub mod sales;

pub use memory::{InMemoryProductRepository, InMemorySalesRepository};
pub use product::SqlProductRepository;
pub use sales::SqlSalesRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Maps constraint violations to `Conflict`, everything else to `Database`.
    pub(crate) fn from_write(error: sqlx::Error, context: &str) -> Self {
        match &error {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                Self::Conflict(format!("{context}: {}", db.message()))
            }
            _ => Self::Database(error),
        }
    }
}

/// One stored sale, tied to the product it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub product_id: ProductId,
    pub observation: Observation,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError>;
    /// All products in creation order.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SalesRepository: Send + Sync {
    /// Sales of one product ordered by date ascending.
    async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Observation>, RepositoryError>;

    /// Every sale ordered by date ascending.
    async fn list_all(&self) -> Result<Vec<SaleRecord>, RepositoryError>;

    async fn append(&self, records: Vec<SaleRecord>) -> Result<usize, RepositoryError>;

    /// Deletes every stored sale and inserts `records` in one transaction.
    async fn replace_all(&self, records: Vec<SaleRecord>) -> Result<usize, RepositoryError>;
}

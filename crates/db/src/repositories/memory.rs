use tokio::sync::RwLock;

use restock_core::domain::product::{Product, ProductId};
use restock_core::domain::sales::Observation;

use super::{ProductRepository, RepositoryError, SaleRecord, SalesRepository};

/// Products kept in insertion order.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<Vec<Product>>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.iter().find(|product| &product.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.iter().find(|product| product.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products.read().await.clone())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        let name_taken = products
            .iter()
            .any(|existing| existing.name == product.name && existing.id != product.id);
        if name_taken {
            return Err(RepositoryError::Conflict(format!(
                "product `{}`: name already exists",
                product.name
            )));
        }
        match products.iter_mut().find(|existing| existing.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
        Ok(())
    }
}

/// Sales kept in insertion order; reads sort by date.
#[derive(Default)]
pub struct InMemorySalesRepository {
    records: RwLock<Vec<SaleRecord>>,
}

#[async_trait::async_trait]
impl SalesRepository for InMemorySalesRepository {
    async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Observation>, RepositoryError> {
        let records = self.records.read().await;
        let mut history: Vec<Observation> = records
            .iter()
            .filter(|record| &record.product_id == product_id)
            .map(|record| record.observation)
            .collect();
        history.sort_by_key(|observation| observation.date);
        Ok(history)
    }

    async fn list_all(&self) -> Result<Vec<SaleRecord>, RepositoryError> {
        let mut records = self.records.read().await.clone();
        records.sort_by_key(|record| record.observation.date);
        Ok(records)
    }

    async fn append(&self, records: Vec<SaleRecord>) -> Result<usize, RepositoryError> {
        let inserted = records.len();
        self.records.write().await.extend(records);
        Ok(inserted)
    }

    async fn replace_all(&self, records: Vec<SaleRecord>) -> Result<usize, RepositoryError> {
        let inserted = records.len();
        *self.records.write().await = records;
        Ok(inserted)
    }
}

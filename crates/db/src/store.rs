use async_trait::async_trait;

use restock_core::domain::product::{Product, ProductId};
use restock_core::domain::sales::Observation;
use restock_core::errors::ApplicationError;
use restock_core::service::InventoryStore;

use crate::repositories::{
    ProductRepository, RepositoryError, SalesRepository, SqlProductRepository, SqlSalesRepository,
};
use crate::DbPool;

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Serves the core service from a product and a sales repository.
pub struct RepositoryInventoryStore<P, S> {
    products: P,
    sales: S,
}

impl<P, S> RepositoryInventoryStore<P, S> {
    pub fn new(products: P, sales: S) -> Self {
        Self { products, sales }
    }

    pub fn products(&self) -> &P {
        &self.products
    }

    pub fn sales(&self) -> &S {
        &self.sales
    }
}

pub type SqlInventoryStore = RepositoryInventoryStore<SqlProductRepository, SqlSalesRepository>;

impl SqlInventoryStore {
    pub fn from_pool(pool: DbPool) -> Self {
        Self::new(SqlProductRepository::new(pool.clone()), SqlSalesRepository::new(pool))
    }
}

#[async_trait]
impl<P, S> InventoryStore for RepositoryInventoryStore<P, S>
where
    P: ProductRepository,
    S: SalesRepository,
{
    async fn fetch_observations(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Observation>, ApplicationError> {
        Ok(self.sales.list_for_product(product_id).await?)
    }

    async fn fetch_profile(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Product>, ApplicationError> {
        Ok(self.products.find_by_id(product_id).await?)
    }

    async fn fetch_all_products(&self) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.products.list().await?)
    }

    async fn fetch_all_observations(&self) -> Result<Vec<Observation>, ApplicationError> {
        let records = self.sales.list_all().await?;
        Ok(records.into_iter().map(|record| record.observation).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use restock_core::config::AppConfig;
    use restock_core::domain::product::{InventoryProfile, Product, ProductId};
    use restock_core::domain::sales::Observation;
    use restock_core::errors::ApplicationError;
    use restock_core::service::{ForecastStatus, InventoryStore, ReplenishmentService};

    use super::{RepositoryInventoryStore, SqlInventoryStore};
    use crate::fixtures::DemoSeedDataset;
    use crate::repositories::{
        InMemoryProductRepository, InMemorySalesRepository, ProductRepository, SaleRecord,
        SalesRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn seeded_store() -> SqlInventoryStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoSeedDataset::load(&pool).await.expect("seed");
        SqlInventoryStore::from_pool(pool)
    }

    #[tokio::test]
    async fn store_reads_products_and_sales_from_sqlite() {
        let store = seeded_store().await;

        let products = store.fetch_all_products().await.expect("products");
        let history =
            store.fetch_observations(&ProductId("prod-a".to_owned())).await.expect("history");
        let all = store.fetch_all_observations().await.expect("all sales");

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Produit A");
        assert_eq!(history.len(), 2);
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn service_over_sqlite_matches_demo_scenarios() {
        let service = ReplenishmentService::from_config(seeded_store().await, &AppConfig::default());

        let report = service.build_report().await.expect("report");
        let quantities: Vec<u64> = report.rows.iter().map(|row| row.recommended_qty).collect();
        assert_eq!(quantities, vec![70, 50]);

        let forecast =
            service.forecast_product(&ProductId("prod-b".to_owned()), Some(7)).await.expect("b");
        assert_eq!(forecast.status, ForecastStatus::Modeled);

        let missing = service.recommend_product(&ProductId("prod-z".to_owned())).await;
        assert!(matches!(missing, Err(ApplicationError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn malformed_sale_date_fails_only_its_product_in_the_report() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoSeedDataset::load(&pool).await.expect("seed");
        sqlx::query("INSERT INTO sale (product_id, sale_date, quantity) VALUES ('prod-b', 'garbage', 3.0)")
            .execute(&pool)
            .await
            .expect("raw insert");
        let service =
            ReplenishmentService::from_config(SqlInventoryStore::from_pool(pool), &AppConfig::default());

        let report = service.build_report().await.expect("report survives one bad product");

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].product_id, ProductId("prod-a".to_owned()));
        assert_eq!(report.rows[0].recommended_qty, 70);
        assert_eq!(report.rows[1].product_id, ProductId("prod-b".to_owned()));
        assert_eq!(report.rows[1].current_stock, 150);
        assert_eq!(report.rows[1].recommended_qty, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].product_id, ProductId("prod-b".to_owned()));
        assert!(report.failures[0].reason.contains("garbage"));
    }

    #[tokio::test]
    async fn in_memory_repositories_serve_the_same_recommendations() {
        let products = InMemoryProductRepository::default();
        let sales = InMemorySalesRepository::default();
        for (id, name, stock, capacity, lead) in
            [("prod-a", "Produit A", 30, 100, 5), ("prod-b", "Produit B", 150, 200, 7)]
        {
            products
                .save(Product {
                    id: ProductId(id.to_owned()),
                    name: name.to_owned(),
                    profile: InventoryProfile::new(stock, Some(capacity), Some(lead)),
                })
                .await
                .expect("save product");
        }
        let day = |d| NaiveDate::from_ymd_opt(2024, 7, d).expect("valid date");
        let records = [("prod-a", 1, 12.0), ("prod-a", 2, 15.0), ("prod-b", 1, 8.0), ("prod-b", 2, 13.0)]
            .into_iter()
            .map(|(id, d, quantity)| SaleRecord {
                product_id: ProductId(id.to_owned()),
                observation: Observation::new(day(d), quantity),
            })
            .collect();
        sales.append(records).await.expect("append sales");

        let store = RepositoryInventoryStore::new(products, sales);
        let service = ReplenishmentService::from_config(store, &AppConfig::default());

        let report = service.build_report().await.expect("report");
        let quantities: Vec<u64> = report.rows.iter().map(|row| row.recommended_qty).collect();
        assert_eq!(quantities, vec![70, 50]);

        let aggregate = service.forecast_all(Some(3)).await.expect("aggregate");
        assert_eq!(aggregate.observed_days, 2);
    }

    #[tokio::test]
    async fn closed_pool_surfaces_as_persistence_error() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool.close().await;
        let store = SqlInventoryStore::from_pool(pool);

        let error = store.fetch_all_products().await.expect_err("closed pool");

        assert!(matches!(error, ApplicationError::Persistence(_)));
    }
}

use chrono::Utc;
use sqlx::Row;

use restock_core::domain::product::{InventoryProfile, Product, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, name, current_stock, capacity, lead_time_days";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_stock: i64 = row
        .try_get("current_stock")
        .map_err(|e| RepositoryError::Decode(format!("product `{id}` current_stock: {e}")))?;
    let capacity: Option<i64> = row
        .try_get("capacity")
        .map_err(|e| RepositoryError::Decode(format!("product `{id}` capacity: {e}")))?;
    let lead_time_days: Option<i64> = row
        .try_get("lead_time_days")
        .map_err(|e| RepositoryError::Decode(format!("product `{id}` lead_time_days: {e}")))?;

    Ok(Product {
        id: ProductId(id),
        name,
        profile: InventoryProfile::new(current_stock, capacity, lead_time_days),
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (id, name, current_stock, capacity, lead_time_days, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 current_stock = excluded.current_stock,
                 capacity = excluded.capacity,
                 lead_time_days = excluded.lead_time_days",
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(product.profile.current_stock)
        .bind(product.profile.capacity)
        .bind(product.profile.lead_time_days)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, &format!("product `{}`", product.name)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use restock_core::domain::product::{InventoryProfile, Product, ProductId};

    use super::SqlProductRepository;
    use crate::repositories::{ProductRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlProductRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlProductRepository::new(pool)
    }

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: ProductId(id.to_owned()),
            name: name.to_owned(),
            profile: InventoryProfile::new(30, Some(100), Some(5)),
        }
    }

    #[tokio::test]
    async fn save_then_find_by_id_and_name() {
        let repo = repository().await;
        repo.save(product("prod-a", "Produit A")).await.expect("save");

        let by_id = repo.find_by_id(&ProductId("prod-a".to_owned())).await.expect("by id");
        let by_name = repo.find_by_name("Produit A").await.expect("by name");

        assert_eq!(by_id, Some(product("prod-a", "Produit A")));
        assert_eq!(by_name, by_id);
        assert_eq!(repo.find_by_name("Produit Z").await.expect("missing"), None);
    }

    #[tokio::test]
    async fn save_updates_existing_product() {
        let repo = repository().await;
        repo.save(product("prod-a", "Produit A")).await.expect("save");

        let mut updated = product("prod-a", "Produit A");
        updated.profile = InventoryProfile::new(12, None, None);
        repo.save(updated.clone()).await.expect("update");

        let listed = repo.list().await.expect("list");
        assert_eq!(listed, vec![updated]);
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let repo = repository().await;
        repo.save(product("prod-a", "Produit A")).await.expect("save");

        let error = repo.save(product("prod-b", "Produit A")).await.expect_err("duplicate");

        assert!(matches!(error, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn non_numeric_stock_is_a_decode_error() {
        let repo = repository().await;
        sqlx::query(
            "INSERT INTO product (id, name, current_stock, created_at)
             VALUES ('prod-x', 'Broken', 'lots', '2024-07-01T00:00:00+00:00')",
        )
        .execute(&repo.pool)
        .await
        .expect("raw insert");

        let error =
            repo.find_by_id(&ProductId("prod-x".to_owned())).await.expect_err("decode failure");

        assert!(matches!(error, RepositoryError::Decode(_)));
    }
}

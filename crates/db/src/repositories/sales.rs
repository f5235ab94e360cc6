use chrono::NaiveDate;
use sqlx::Row;

use restock_core::domain::product::ProductId;
use restock_core::domain::sales::Observation;

use super::{RepositoryError, SaleRecord, SalesRepository};
use crate::DbPool;

pub const SALE_DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlSalesRepository {
    pool: DbPool,
}

impl SqlSalesRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_observation(row: &sqlx::sqlite::SqliteRow) -> Result<Observation, RepositoryError> {
    let sale_date: String =
        row.try_get("sale_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let date = NaiveDate::parse_from_str(&sale_date, SALE_DATE_FORMAT)
        .map_err(|e| RepositoryError::Decode(format!("sale_date `{sale_date}`: {e}")))?;
    let quantity: f64 = row
        .try_get("quantity")
        .map_err(|e| RepositoryError::Decode(format!("quantity on {sale_date}: {e}")))?;

    Ok(Observation::new(date, quantity))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<SaleRecord, RepositoryError> {
    let product_id: String =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    Ok(SaleRecord { product_id: ProductId(product_id), observation: row_to_observation(row)? })
}

async fn insert_records(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    records: &[SaleRecord],
) -> Result<usize, RepositoryError> {
    for record in records {
        sqlx::query("INSERT INTO sale (product_id, sale_date, quantity) VALUES (?, ?, ?)")
            .bind(&record.product_id.0)
            .bind(record.observation.date.format(SALE_DATE_FORMAT).to_string())
            .bind(record.observation.quantity)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                RepositoryError::from_write(e, &format!("sale for `{}`", record.product_id))
            })?;
    }
    Ok(records.len())
}

#[async_trait::async_trait]
impl SalesRepository for SqlSalesRepository {
    async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Observation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sale_date, quantity FROM sale WHERE product_id = ? ORDER BY sale_date, id",
        )
        .bind(&product_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_observation).collect()
    }

    async fn list_all(&self) -> Result<Vec<SaleRecord>, RepositoryError> {
        let rows =
            sqlx::query("SELECT product_id, sale_date, quantity FROM sale ORDER BY sale_date, id")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn append(&self, records: Vec<SaleRecord>) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_records(&mut tx, &records).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn replace_all(&self, records: Vec<SaleRecord>) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sale").execute(&mut *tx).await?;
        let inserted = insert_records(&mut tx, &records).await?;
        tx.commit().await?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use restock_core::domain::product::{InventoryProfile, Product, ProductId};
    use restock_core::domain::sales::Observation;

    use super::SqlSalesRepository;
    use crate::repositories::{
        ProductRepository, RepositoryError, SaleRecord, SalesRepository, SqlProductRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).expect("valid date")
    }

    fn sale(product: &str, d: u32, quantity: f64) -> SaleRecord {
        SaleRecord {
            product_id: ProductId(product.to_owned()),
            observation: Observation::new(day(d), quantity),
        }
    }

    async fn pool_with_products(ids: &[&str]) -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let products = SqlProductRepository::new(pool.clone());
        for id in ids {
            products
                .save(Product {
                    id: ProductId((*id).to_owned()),
                    name: format!("Name {id}"),
                    profile: InventoryProfile::default(),
                })
                .await
                .expect("save product");
        }
        pool
    }

    #[tokio::test]
    async fn list_for_product_is_date_ascending() {
        let repo = SqlSalesRepository::new(pool_with_products(&["prod-a", "prod-b"]).await);
        repo.append(vec![sale("prod-a", 3, 7.0), sale("prod-b", 1, 8.0), sale("prod-a", 1, 12.0)])
            .await
            .expect("append");

        let history =
            repo.list_for_product(&ProductId("prod-a".to_owned())).await.expect("history");

        assert_eq!(history, vec![Observation::new(day(1), 12.0), Observation::new(day(3), 7.0)]);
    }

    #[tokio::test]
    async fn replace_all_discards_previous_sales() {
        let repo = SqlSalesRepository::new(pool_with_products(&["prod-a"]).await);
        repo.append(vec![sale("prod-a", 1, 12.0), sale("prod-a", 2, 15.0)]).await.expect("append");

        let inserted = repo.replace_all(vec![sale("prod-a", 5, 4.0)]).await.expect("replace");

        assert_eq!(inserted, 1);
        assert_eq!(repo.list_all().await.expect("all"), vec![sale("prod-a", 5, 4.0)]);
    }

    #[tokio::test]
    async fn replace_all_rolls_back_on_unknown_product() {
        let repo = SqlSalesRepository::new(pool_with_products(&["prod-a"]).await);
        repo.append(vec![sale("prod-a", 1, 12.0)]).await.expect("append");

        let error = repo
            .replace_all(vec![sale("prod-a", 2, 1.0), sale("ghost", 2, 1.0)])
            .await
            .expect_err("unknown product");

        assert!(matches!(error, RepositoryError::Conflict(_)));
        assert_eq!(repo.list_all().await.expect("all"), vec![sale("prod-a", 1, 12.0)]);
    }

    #[tokio::test]
    async fn malformed_sale_date_is_a_decode_error() {
        let pool = pool_with_products(&["prod-a"]).await;
        sqlx::query(
            "INSERT INTO sale (product_id, sale_date, quantity) VALUES ('prod-a', '07/01/2024', 3.0)",
        )
        .execute(&pool)
        .await
        .expect("raw insert");
        let repo = SqlSalesRepository::new(pool);

        let error =
            repo.list_for_product(&ProductId("prod-a".to_owned())).await.expect_err("decode");

        assert!(matches!(error, RepositoryError::Decode(_)));
    }
}

use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo products and their sales, mirrored by `demo_seed_contract.json`.
const SEED_PRODUCTS: &[SeedProductContract] = &[
    SeedProductContract {
        id: "prod-a",
        name: "Produit A",
        current_stock: 30,
        capacity: 100,
        lead_time_days: 5,
        expected_sale_count: 2,
        expected_total_quantity: 27.0,
    },
    SeedProductContract {
        id: "prod-b",
        name: "Produit B",
        current_stock: 150,
        capacity: 200,
        lead_time_days: 7,
        expected_sale_count: 2,
        expected_total_quantity: 21.0,
    },
];

const SEED_SALE_IDS: &[i64] = &[1, 2, 3, 4];

/// Deterministic demo inventory: two products with two days of sales each.
///
/// Loading is idempotent; rows that already exist are left as they are.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let products_seeded = SEED_PRODUCTS
            .iter()
            .map(|product| ProductSeedInfo { id: product.id, name: product.name })
            .collect::<Vec<_>>();

        Ok(SeedResult { products_seeded, sales_seeded: SEED_SALE_IDS.len() })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for product in SEED_PRODUCTS {
            let profile_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM product
                   WHERE id = ?1 AND name = ?2 AND current_stock = ?3
                     AND capacity = ?4 AND lead_time_days = ?5)",
            )
            .bind(product.id)
            .bind(product.name)
            .bind(product.current_stock)
            .bind(product.capacity)
            .bind(product.lead_time_days)
            .fetch_one(pool)
            .await?;
            checks.push((product.profile_label(), profile_ok == 1));

            let (sale_count, total): (i64, Option<f64>) = sqlx::query_as(
                "SELECT COUNT(1), SUM(quantity) FROM sale WHERE product_id = ?1",
            )
            .bind(product.id)
            .fetch_one(pool)
            .await?;
            let totals_match = sale_count == product.expected_sale_count
                && total.is_some_and(|sum| (sum - product.expected_total_quantity).abs() < 1e-9);
            checks.push((product.sales_label(), totals_match));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for product in SEED_PRODUCTS {
            sqlx::query("DELETE FROM sale WHERE product_id = ?1")
                .bind(product.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM product WHERE id = ?1")
                .bind(product.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedProductContract {
    id: &'static str,
    name: &'static str,
    current_stock: i64,
    capacity: i64,
    lead_time_days: i64,
    expected_sale_count: i64,
    expected_total_quantity: f64,
}

impl SeedProductContract {
    fn profile_label(&self) -> &'static str {
        match self.id {
            "prod-a" => "product-a-profile",
            _ => "product-b-profile",
        }
    }

    fn sales_label(&self) -> &'static str {
        match self.id {
            "prod-a" => "product-a-sales",
            _ => "product-b-sales",
        }
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_seeded: Vec<ProductSeedInfo>,
    pub sales_seeded: usize,
}

#[derive(Debug)]
pub struct ProductSeedInfo {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

use restock_core::config::LoadOptions;
use restock_core::domain::product::{InventoryProfile, Product, ProductId};
use restock_db::repositories::{ProductRepository, RepositoryError, SqlProductRepository};
use tracing::info;
use uuid::Uuid;

use crate::commands::{build_runtime, load_config, open_database, CommandResult, Failure};

#[derive(Clone, Debug, Default)]
pub struct NewProduct {
    pub name: String,
    pub id: Option<String>,
    pub current_stock: i64,
    pub capacity: Option<i64>,
    pub lead_time_days: Option<i64>,
}

impl NewProduct {
    fn into_product(self) -> Result<Product, Failure> {
        let id = self
            .id
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|| format!("prod-{}", Uuid::new_v4().simple()));
        let product = Product {
            id: ProductId(id),
            name: self.name.trim().to_string(),
            profile: InventoryProfile::new(self.current_stock, self.capacity, self.lead_time_days),
        };

        product
            .validate_new()
            .map_err(|error| ("bad_request", error.to_string(), 7))?;
        Ok(product)
    }
}

pub fn add(options: LoadOptions, new_product: NewProduct) -> CommandResult {
    let config = match load_config("product_add", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("product_add") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let product = new_product.into_product()?;
        let pool = open_database(&config).await?;
        let repository = SqlProductRepository::new(pool.clone());

        let outcome = save_new(&repository, product).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(product) => CommandResult::success_with_data(
            "product_add",
            format!("added product `{}` ({})", product.name, product.id),
            &product,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("product_add", error_class, message, exit_code)
        }
    }
}

async fn save_new(repository: &SqlProductRepository, product: Product) -> Result<Product, Failure> {
    let existing = repository.find_by_id(&product.id).await.map_err(storage_failure)?;
    if existing.is_some() {
        return Err(("conflict", format!("product id `{}` already exists", product.id), 7));
    }
    repository.save(product.clone()).await.map_err(storage_failure)?;

    info!(
        event_name = "cli.product.added",
        product_id = %product.id,
        current_stock = product.profile.current_stock,
        "product added"
    );
    Ok(product)
}

pub fn list(options: LoadOptions) -> CommandResult {
    let config = match load_config("product_list", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("product_list") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let repository = SqlProductRepository::new(pool.clone());
        let products = repository.list().await.map_err(storage_failure);
        pool.close().await;
        products
    });

    match result {
        Ok(products) => CommandResult::success_with_data(
            "product_list",
            format!("{} products", products.len()),
            &products,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("product_list", error_class, message, exit_code)
        }
    }
}

fn storage_failure(error: RepositoryError) -> Failure {
    match error {
        RepositoryError::Conflict(message) => ("conflict", message, 7),
        other => ("persistence", other.to_string(), 4),
    }
}

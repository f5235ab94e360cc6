use restock_core::config::LoadOptions;
use restock_db::{DemoSeedDataset, ProductSeedInfo};

use crate::commands::{build_runtime, load_config, open_database, CommandResult, Failure};

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedOutput, Failure> = if !verification.all_present {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err((
                "seed_verification",
                format!("seed verification failed for checks: {}", failed_checks.join(", ")),
                6u8,
            ))
        } else {
            Ok(SeedOutput {
                products: seed_result.products_seeded,
                sales: seed_result.sales_seeded,
            })
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(output) => {
            let products: Vec<String> = output
                .products
                .iter()
                .map(|product| format!("  - {}: {}", product.id, product.name))
                .collect();
            let message = format!(
                "loaded demo inventory: {} products, {} sales\n{}",
                output.products.len(),
                output.sales,
                products.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

struct SeedOutput {
    products: Vec<ProductSeedInfo>,
    sales: usize,
}

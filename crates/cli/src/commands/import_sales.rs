use std::fs::File;
use std::path::Path;

use restock_core::config::LoadOptions;
use restock_db::repositories::{SqlProductRepository, SqlSalesRepository};
use restock_db::{import_sales, parse_sales_csv, ImportError, ImportSummary};
use serde::Serialize;

use crate::commands::{build_runtime, load_config, open_database, CommandResult, Failure};

#[derive(Debug, Serialize)]
struct ImportOutput {
    path: String,
    rows_imported: usize,
    products_touched: usize,
}

pub fn run(options: LoadOptions, path: &Path) -> CommandResult {
    let config = match load_config("import_sales", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let rows = match File::open(path) {
        Ok(file) => match parse_sales_csv(file) {
            Ok(rows) => rows,
            Err(error) => {
                let (error_class, message, exit_code) = import_failure(error);
                return CommandResult::failure("import_sales", error_class, message, exit_code);
            }
        },
        Err(error) => {
            return CommandResult::failure(
                "import_sales",
                "input_file",
                format!("could not open `{}`: {error}", path.display()),
                7,
            );
        }
    };

    let runtime = match build_runtime("import_sales") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let products = SqlProductRepository::new(pool.clone());
        let sales = SqlSalesRepository::new(pool.clone());

        let summary = import_sales(&products, &sales, rows).await.map_err(import_failure);
        pool.close().await;
        summary
    });

    match result {
        Ok(ImportSummary { rows_imported, products_touched }) => {
            let output =
                ImportOutput { path: path.display().to_string(), rows_imported, products_touched };
            CommandResult::success_with_data(
                "import_sales",
                format!("replaced sales history with {rows_imported} rows"),
                &output,
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("import_sales", error_class, message, exit_code)
        }
    }
}

fn import_failure(error: ImportError) -> Failure {
    match error {
        ImportError::Csv(_) | ImportError::InvalidRow { .. } => {
            ("invalid_input", error.to_string(), 7)
        }
        ImportError::UnknownProduct { .. } => ("unknown_product", error.to_string(), 7),
        ImportError::Repository(_) => ("persistence", error.to_string(), 4),
    }
}

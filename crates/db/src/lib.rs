pub mod connection;
pub mod fixtures;
pub mod import;
pub mod migrations;
pub mod repositories;
pub mod store;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use fixtures::{DemoSeedDataset, ProductSeedInfo, SeedResult, VerificationResult};
pub use import::{import_sales, parse_sales_csv, ImportError, ImportSummary, ParsedSale};
pub use store::{RepositoryInventoryStore, SqlInventoryStore};

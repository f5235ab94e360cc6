//! Sales CSV import.
//!
//! The file carries one sale per row with the columns `ds` (YYYY-MM-DD), `y`
//! (quantity) and `product_id`. An import replaces every stored sale; rows
//! are validated up front so a bad file leaves the database untouched.

use std::collections::BTreeSet;
use std::io::Read;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use restock_core::domain::product::ProductId;
use restock_core::domain::sales::Observation;

use crate::repositories::sales::SALE_DATE_FORMAT;
use crate::repositories::{ProductRepository, RepositoryError, SaleRecord, SalesRepository};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    InvalidRow { line: usize, message: String },
    #[error("line {line}: unknown product `{product_id}`")]
    UnknownProduct { line: usize, product_id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_imported: usize,
    pub products_touched: usize,
}

#[derive(Debug, Deserialize)]
struct CsvSaleRow {
    ds: String,
    y: String,
    product_id: String,
}

/// A parsed row and the file line it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSale {
    pub line: usize,
    pub record: SaleRecord,
}

pub fn parse_sales_csv<R: Read>(reader: R) -> Result<Vec<ParsedSale>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut parsed = Vec::new();
    for (index, result) in csv_reader.deserialize::<CsvSaleRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = result?;

        let date = NaiveDate::parse_from_str(&row.ds, SALE_DATE_FORMAT).map_err(|e| {
            ImportError::InvalidRow { line, message: format!("invalid date `{}`: {e}", row.ds) }
        })?;
        let quantity: f64 = row.y.parse().map_err(|_| ImportError::InvalidRow {
            line,
            message: format!("quantity `{}` is not a number", row.y),
        })?;
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(ImportError::InvalidRow {
                line,
                message: format!("quantity `{}` must be a non-negative number", row.y),
            });
        }
        if row.product_id.is_empty() {
            return Err(ImportError::InvalidRow { line, message: "product_id is empty".into() });
        }

        parsed.push(ParsedSale {
            line,
            record: SaleRecord {
                product_id: ProductId(row.product_id),
                observation: Observation::new(date, quantity),
            },
        });
    }
    Ok(parsed)
}

/// Validates every row against the product catalog, then replaces all stored
/// sales with the file's content.
pub async fn import_sales<P, S>(
    products: &P,
    sales: &S,
    rows: Vec<ParsedSale>,
) -> Result<ImportSummary, ImportError>
where
    P: ProductRepository + ?Sized,
    S: SalesRepository + ?Sized,
{
    let mut known = BTreeSet::new();
    for row in &rows {
        if known.contains(&row.record.product_id) {
            continue;
        }
        if products.find_by_id(&row.record.product_id).await?.is_none() {
            return Err(ImportError::UnknownProduct {
                line: row.line,
                product_id: row.record.product_id.0.clone(),
            });
        }
        known.insert(row.record.product_id.clone());
    }

    let records: Vec<SaleRecord> = rows.into_iter().map(|row| row.record).collect();
    let rows_imported = sales.replace_all(records).await?;

    info!(
        event_name = "db.import.sales_replaced",
        rows_imported,
        products_touched = known.len(),
        "sales history replaced from csv"
    );
    Ok(ImportSummary { rows_imported, products_touched: known.len() })
}

#[cfg(test)]
mod tests {
    use restock_core::domain::product::{InventoryProfile, Product, ProductId};

    use super::{import_sales, parse_sales_csv, ImportError};
    use crate::repositories::{
        InMemoryProductRepository, InMemorySalesRepository, ProductRepository, SalesRepository,
    };

    const DEMO_CSV: &str = "\
ds,y,product_id
2024-07-01,12,prod-a
2024-07-02,15,prod-a
2024-07-01,8,prod-b
2024-07-02,13.5,prod-b
";

    async fn catalog() -> InMemoryProductRepository {
        let products = InMemoryProductRepository::default();
        for (id, name) in [("prod-a", "Produit A"), ("prod-b", "Produit B")] {
            products
                .save(Product {
                    id: ProductId(id.to_owned()),
                    name: name.to_owned(),
                    profile: InventoryProfile::default(),
                })
                .await
                .expect("save product");
        }
        products
    }

    #[test]
    fn parses_rows_with_numeric_coercion() {
        let parsed = parse_sales_csv(DEMO_CSV.as_bytes()).expect("parse");

        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0].line, 2);
        assert_eq!(parsed[0].record.observation.quantity, 12.0);
        assert_eq!(parsed[3].record.observation.quantity, 13.5);
        assert_eq!(parsed[3].record.product_id, ProductId("prod-b".to_owned()));
    }

    #[test]
    fn rejects_bad_dates_and_quantities_with_line_numbers() {
        let bad_date = "ds,y,product_id\n2024-07-01,1,prod-a\n07/02/2024,1,prod-a\n";
        let negative = "ds,y,product_id\n2024-07-01,-4,prod-a\n";
        let text = "ds,y,product_id\n2024-07-01,lots,prod-a\n";

        assert!(matches!(
            parse_sales_csv(bad_date.as_bytes()),
            Err(ImportError::InvalidRow { line: 3, .. })
        ));
        assert!(matches!(
            parse_sales_csv(negative.as_bytes()),
            Err(ImportError::InvalidRow { line: 2, .. })
        ));
        assert!(matches!(
            parse_sales_csv(text.as_bytes()),
            Err(ImportError::InvalidRow { line: 2, .. })
        ));
    }

    #[test]
    fn missing_column_is_a_csv_error() {
        let result = parse_sales_csv("ds,y\n2024-07-01,3\n".as_bytes());

        assert!(matches!(result, Err(ImportError::Csv(_))));
    }

    #[tokio::test]
    async fn import_replaces_existing_sales() {
        let products = catalog().await;
        let sales = InMemorySalesRepository::default();
        let first = parse_sales_csv(DEMO_CSV.as_bytes()).expect("parse");
        import_sales(&products, &sales, first).await.expect("first import");

        let second = parse_sales_csv("ds,y,product_id\n2024-07-03,5,prod-a\n".as_bytes())
            .expect("parse");
        let summary = import_sales(&products, &sales, second).await.expect("second import");

        assert_eq!(summary.rows_imported, 1);
        assert_eq!(summary.products_touched, 1);
        assert_eq!(sales.list_all().await.expect("all").len(), 1);
    }

    #[tokio::test]
    async fn unknown_product_leaves_sales_untouched() {
        let products = catalog().await;
        let sales = InMemorySalesRepository::default();
        import_sales(&products, &sales, parse_sales_csv(DEMO_CSV.as_bytes()).expect("parse"))
            .await
            .expect("seed import");

        let rows = parse_sales_csv("ds,y,product_id\n2024-07-03,5,prod-z\n".as_bytes())
            .expect("parse");
        let error = import_sales(&products, &sales, rows).await.expect_err("unknown product");

        assert!(matches!(error, ImportError::UnknownProduct { line: 2, .. }));
        assert_eq!(sales.list_all().await.expect("all").len(), 4);
    }
}

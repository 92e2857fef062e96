//! # Catalog Repository
//!
//! Products and stock levels in `products.csv`.
//!
//! ## Read vs Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get / list / search      no lock: the file is only ever replaced     │
//! │                           by rename, so a read sees one whole version  │
//! │                                                                         │
//! │  upsert / delete /        lock ─► load snapshot ─► change ─► replace   │
//! │  reserve_stock                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows with only three columns (no stock) are read with stock 0.
//!
//! Rows that fail to parse are left out of the catalog but not out of the
//! file: a rewrite puts them back where they were, so a hand-edit gone wrong
//! can still be repaired.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use tracing::{debug, info, warn};

use till_core::validation::{validate_barcode, validate_search_query};
use till_core::{Catalog, Money, Operation, Product};

use crate::codec::{expect_columns, field, header_line, read_table_lines, write_table, TableLine};
use crate::error::{StoreError, StoreResult};
use crate::fsio;
use crate::session::Session;
use crate::store::StoreShared;

pub const PRODUCTS_HEADER: [&str; 4] = ["barcode", "name", "price", "stock"];

fn product_fields(p: &Product) -> Vec<String> {
    vec![
        p.barcode.clone(),
        p.name.clone(),
        p.price.to_string(),
        p.stock.to_string(),
    ]
}

fn parse_product(record: &StringRecord) -> Result<Product, String> {
    expect_columns(record, &[3, 4])?;
    let price = field(record, 2, "price")?
        .parse::<Money>()
        .map_err(|e| e.to_string())?;
    let stock = match record.len() {
        3 => 0,
        _ => field(record, 3, "stock")?
            .parse::<i64>()
            .map_err(|e| format!("stock: {e}"))?,
    };
    Product::new(field(record, 0, "barcode")?, field(record, 1, "name")?, price, stock)
        .validated()
        .map_err(|e| e.to_string())
}

/// One data line of `products.csv`, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Product(String),
    Unparsed(String),
}

/// The parsed catalog plus the line layout it was read from.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogSnapshot {
    pub catalog: Catalog,
    layout: Vec<Slot>,
}

impl CatalogSnapshot {
    pub fn decode(path: &Path, bytes: &[u8]) -> Self {
        let mut products = Vec::new();
        let mut layout = Vec::new();
        for line in read_table_lines(path, bytes, parse_product) {
            match line {
                TableLine::Parsed(product) => {
                    layout.push(Slot::Product(product.barcode.clone()));
                    products.push(product);
                }
                TableLine::Skipped(raw) => layout.push(Slot::Unparsed(raw)),
            }
        }
        CatalogSnapshot {
            catalog: Catalog::from_products(products),
            layout,
        }
    }

    /// Lines kept verbatim because they did not parse.
    pub fn unparsed_rows(&self) -> usize {
        self.layout
            .iter()
            .filter(|slot| matches!(slot, Slot::Unparsed(_)))
            .count()
    }

    /// Encodes the catalog over the original layout.
    ///
    /// Unparsed lines are copied unchanged. New products go at the end.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut out = header_line(&PRODUCTS_HEADER)?;
        let mut written: HashSet<&str> = HashSet::new();

        for slot in &self.layout {
            match slot {
                Slot::Product(barcode) => {
                    if let Some(product) = self.catalog.get(barcode) {
                        if written.insert(product.barcode.as_str()) {
                            out.extend(write_table(None, std::slice::from_ref(product), product_fields)?);
                        }
                    }
                }
                Slot::Unparsed(raw) => {
                    out.extend_from_slice(raw.as_bytes());
                    out.push(b'\n');
                }
            }
        }

        let rest: Vec<Product> = self
            .catalog
            .products()
            .iter()
            .filter(|p| !written.contains(p.barcode.as_str()))
            .cloned()
            .collect();
        out.extend(write_table(None, &rest, product_fields)?);
        Ok(out)
    }
}

/// Repository for products.
///
/// ## Usage
/// ```rust,ignore
/// let repo = store.catalog();
/// repo.upsert_product(&admin, Product::new("0001", "Soap", Money::from_cents(500), 10)).await?;
/// let soap = repo.get_product(&cashier, "0001").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    shared: Arc<StoreShared>,
}

impl CatalogRepository {
    pub(crate) fn new(shared: Arc<StoreShared>) -> Self {
        CatalogRepository { shared }
    }

    /// Reads `products.csv`, returning its exact text and the parsed snapshot.
    pub(crate) async fn load_raw(&self) -> StoreResult<(Option<String>, CatalogSnapshot)> {
        let path = &self.shared.paths.products;
        let bytes = fsio::read_optional(path)
            .await
            .map_err(|e| StoreError::storage("reading products", e))?;
        match bytes {
            None => Ok((None, CatalogSnapshot::default())),
            Some(bytes) => {
                let snapshot = CatalogSnapshot::decode(path, &bytes);
                let text = String::from_utf8(bytes)
                    .map_err(|e| StoreError::corrupt(path, format!("not UTF-8: {e}")))?;
                Ok((Some(text), snapshot))
            }
        }
    }

    pub(crate) async fn load(&self) -> StoreResult<CatalogSnapshot> {
        Ok(self.load_raw().await?.1)
    }

    /// Replaces `products.csv` with `snapshot`. Caller holds the lock.
    pub(crate) async fn write(&self, snapshot: &CatalogSnapshot) -> StoreResult<()> {
        let unparsed = snapshot.unparsed_rows();
        if unparsed > 0 {
            warn!(rows = unparsed, "Keeping unparsed rows in products.csv");
        }
        let bytes = snapshot
            .encode()
            .map_err(|e| StoreError::storage("encoding products", e))?;
        fsio::write_atomic(&self.shared.paths.products, &bytes)
            .await
            .map_err(|e| StoreError::storage("writing products", e))
    }

    /// Looks up one product.
    pub async fn get_product(&self, session: &Session, barcode: &str) -> StoreResult<Product> {
        self.shared.sessions.authorize(session, Operation::ReadProduct)?;
        let barcode = barcode.trim();
        self.load()
            .await?
            .catalog
            .get(barcode)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Product", barcode))
    }

    /// Every product in file order.
    pub async fn list_products(&self, session: &Session) -> StoreResult<Vec<Product>> {
        self.shared.sessions.authorize(session, Operation::ReadProduct)?;
        Ok(self.load().await?.catalog.into_products())
    }

    /// Case-insensitive substring search over barcode and name.
    pub async fn search_products(
        &self,
        session: &Session,
        term: &str,
        limit: usize,
    ) -> StoreResult<Vec<Product>> {
        self.shared.sessions.authorize(session, Operation::ReadProduct)?;
        let term = validate_search_query(term)?;

        debug!(query = %term, limit = limit, "Searching products");
        let catalog = self.load().await?.catalog;
        let products: Vec<Product> = catalog.search(&term, limit).into_iter().cloned().collect();
        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Inserts a new product or replaces an existing one in place.
    pub async fn upsert_product(&self, session: &Session, product: Product) -> StoreResult<()> {
        let actor = self.shared.sessions.authorize(session, Operation::ManageProducts)?;
        let product = product.validated()?;

        let _guard = self.shared.lock.lock().await;
        let mut snapshot = self.load().await?;
        let barcode = product.barcode.clone();
        let is_new = snapshot.catalog.upsert(product);
        self.write(&snapshot).await?;

        info!(barcode = %barcode, new = is_new, by = %actor.username, "Product saved");
        Ok(())
    }

    /// Removes a product.
    pub async fn delete_product(&self, session: &Session, barcode: &str) -> StoreResult<()> {
        let actor = self.shared.sessions.authorize(session, Operation::ManageProducts)?;
        let barcode = validate_barcode(barcode)?;

        let _guard = self.shared.lock.lock().await;
        let mut snapshot = self.load().await?;
        if snapshot.catalog.remove(&barcode).is_none() {
            return Err(StoreError::not_found("Product", barcode));
        }
        self.write(&snapshot).await?;

        info!(barcode = %barcode, by = %actor.username, "Product deleted");
        Ok(())
    }

    /// Takes units out of stock outside of a sale.
    ///
    /// ## Errors
    /// - `InsufficientStock` - fewer units on hand than requested
    /// - `NotFound` - unknown barcode
    pub async fn reserve_stock(
        &self,
        session: &Session,
        barcode: &str,
        quantity: i64,
    ) -> StoreResult<()> {
        let actor = self
            .shared
            .sessions
            .authorize(session, Operation::AdjustStockViaSale)?;
        let barcode = validate_barcode(barcode)?;

        let _guard = self.shared.lock.lock().await;
        let mut snapshot = self.load().await?;
        snapshot.catalog.reserve_stock(&barcode, quantity)?;
        self.write(&snapshot).await?;

        debug!(barcode = %barcode, quantity = quantity, by = %actor.username, "Stock reserved");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> CatalogSnapshot {
        CatalogSnapshot::decode(Path::new("products.csv"), bytes)
    }

    #[test]
    fn test_products_encode_then_decode() {
        let products = vec![
            Product::new("0001", "Soap, lavender", Money::from_cents(500), 10),
            Product::new("0002", "Rice \"extra\"", Money::from_cents(1250), 0),
        ];
        let snapshot = CatalogSnapshot {
            catalog: Catalog::from_products(products.clone()),
            layout: Vec::new(),
        };
        let bytes = snapshot.encode().unwrap();

        assert!(bytes.starts_with(b"barcode,name,price,stock\n0001,\"Soap, lavender\",5.00,10\n"));
        assert_eq!(decode(&bytes).catalog.into_products(), products);
    }

    #[test]
    fn test_decode_three_column_rows_default_stock() {
        let catalog = decode(b"barcode,name,price,inventario\n0001,Soap,5.00\n0002,Rice,12.5,4\n").catalog;
        assert_eq!(catalog.get("0001").unwrap().stock, 0);
        assert_eq!(catalog.get("0002").unwrap().price, Money::from_cents(1250));
    }

    #[test]
    fn test_decode_skips_malformed_rows() {
        let snapshot = decode(
            b"barcode,name,price,stock\n\
              0001,Soap,abc,1\n\
              0002,Rice,1.00,-3\n\
              0003,,1.00,1\n\
              0004,Salt,0.90,2\n",
        );
        assert_eq!(snapshot.catalog.len(), 1);
        assert_eq!(snapshot.catalog.products()[0].barcode, "0004");
        assert_eq!(snapshot.unparsed_rows(), 3);
    }

    #[test]
    fn test_rewrite_keeps_unparsed_rows_in_place() {
        let mut snapshot = decode(
            b"barcode,name,price,stock\n\
              0001,Soap,5.00,10\n\
              0002,Rice,1.255,4\n\
              0003,Salt,0.90,2\n\
              0004,Sugar,2.00,1\n",
        );
        snapshot.catalog.reserve_stock("0001", 3).unwrap();
        snapshot.catalog.remove("0003");
        snapshot
            .catalog
            .upsert(Product::new("0005", "Tea", Money::from_cents(300), 6));

        let text = String::from_utf8(snapshot.encode().unwrap()).unwrap();
        assert_eq!(
            text,
            "barcode,name,price,stock\n\
             0001,Soap,5.00,7\n\
             0002,Rice,1.255,4\n\
             0004,Sugar,2.00,1\n\
             0005,Tea,3.00,6\n"
        );
    }

    #[test]
    fn test_torn_tail_is_kept_on_rewrite() {
        let snapshot = decode(b"barcode,name,price,stock\n0001,Soap,5.00,10\n0002,Ri");
        assert_eq!(snapshot.unparsed_rows(), 1);

        let text = String::from_utf8(snapshot.encode().unwrap()).unwrap();
        assert_eq!(text, "barcode,name,price,stock\n0001,Soap,5.00,10\n0002,Ri\n");
    }
}

//! # Catalog
//!
//! In-memory product catalog: the set of products in file order, keyed by
//! barcode.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.csv ──load──► Catalog (snapshot) ──mutate──► products.csv     │
//! │                              │                                          │
//! │                              ├── upsert / remove   (manage-products)    │
//! │                              └── reserve_stock     (sales only)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Catalog` value is a snapshot. The store loads one under the directory
//! lock, mutates it, and writes it back; a failed operation simply drops it.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Product;
use crate::validation::validate_quantity;

/// Products in file order. Barcodes are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Builds a catalog from rows in file order.
    ///
    /// A repeated barcode keeps the position of its first row and the
    /// values of its last.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Catalog::new();
        for product in products {
            catalog.upsert(product);
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products in file order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn into_products(self) -> Vec<Product> {
        self.products
    }

    fn position(&self, barcode: &str) -> Option<usize> {
        self.products.iter().position(|p| p.barcode == barcode)
    }

    /// Looks up a product by barcode.
    pub fn get(&self, barcode: &str) -> Option<&Product> {
        self.position(barcode).map(|idx| &self.products[idx])
    }

    /// Looks up a product, failing with `UnknownProduct`.
    pub fn require(&self, barcode: &str) -> CoreResult<&Product> {
        self.get(barcode)
            .ok_or_else(|| CoreError::UnknownProduct(barcode.to_string()))
    }

    /// Inserts or replaces a product.
    ///
    /// An existing barcode is replaced in place; a new one is appended.
    /// Returns `true` when the product was new.
    pub fn upsert(&mut self, product: Product) -> bool {
        match self.position(&product.barcode) {
            Some(idx) => {
                self.products[idx] = product;
                false
            }
            None => {
                self.products.push(product);
                true
            }
        }
    }

    /// Removes a product, returning it if it existed.
    pub fn remove(&mut self, barcode: &str) -> Option<Product> {
        self.position(barcode).map(|idx| self.products.remove(idx))
    }

    /// Takes `quantity` units of a product out of stock.
    ///
    /// This is the only way stock goes down. The check and the decrement
    /// happen together; on error the catalog is unchanged.
    pub fn reserve_stock(&mut self, barcode: &str, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let idx = self
            .position(barcode)
            .ok_or_else(|| CoreError::UnknownProduct(barcode.to_string()))?;
        let product = &mut self.products[idx];

        if !product.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                barcode: product.barcode.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        product.stock -= quantity;
        Ok(())
    }

    /// Case-insensitive substring search over barcode and name.
    ///
    /// An empty term matches everything. Results keep file order.
    pub fn search(&self, term: &str, limit: usize) -> Vec<&Product> {
        let needle = term.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.barcode.to_lowercase().contains(&needle)
                    || p.name.to_lowercase().contains(&needle)
            })
            .take(limit)
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn sample() -> Catalog {
        Catalog::from_products(vec![
            Product::new("0001", "Soap", Money::from_cents(500), 10),
            Product::new("0002", "Rice 1kg", Money::from_cents(1250), 3),
            Product::new("0003", "Brown Rice", Money::from_cents(1400), 0),
        ])
    }

    #[test]
    fn test_upsert_preserves_position() {
        let mut catalog = sample();
        let is_new = catalog.upsert(Product::new("0002", "Rice 2kg", Money::from_cents(2300), 8));
        assert!(!is_new);
        assert_eq!(catalog.products()[1].name, "Rice 2kg");
        assert_eq!(catalog.len(), 3);

        assert!(catalog.upsert(Product::new("0004", "Salt", Money::from_cents(90), 1)));
        assert_eq!(catalog.products()[3].barcode, "0004");
    }

    #[test]
    fn test_from_products_last_row_wins() {
        let catalog = Catalog::from_products(vec![
            Product::new("0001", "Old", Money::from_cents(100), 1),
            Product::new("0002", "Other", Money::from_cents(100), 1),
            Product::new("0001", "New", Money::from_cents(200), 2),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.products()[0].name, "New");
    }

    #[test]
    fn test_remove() {
        let mut catalog = sample();
        assert_eq!(catalog.remove("0002").map(|p| p.name), Some("Rice 1kg".to_string()));
        assert!(catalog.remove("0002").is_none());
        assert!(catalog.get("0002").is_none());
    }

    #[test]
    fn test_reserve_stock() {
        let mut catalog = sample();
        catalog.reserve_stock("0001", 3).unwrap();
        assert_eq!(catalog.get("0001").unwrap().stock, 7);

        catalog.reserve_stock("0001", 7).unwrap();
        assert_eq!(catalog.get("0001").unwrap().stock, 0);
    }

    #[test]
    fn test_reserve_stock_insufficient_leaves_catalog_unchanged() {
        let mut catalog = sample();
        let before = catalog.clone();
        let err = catalog.reserve_stock("0002", 4).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                barcode: "0002".to_string(),
                available: 3,
                requested: 4,
            }
        );
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_reserve_stock_rejects_unknown_and_non_positive() {
        let mut catalog = sample();
        assert!(matches!(
            catalog.reserve_stock("9999", 1),
            Err(CoreError::UnknownProduct(_))
        ));
        assert!(matches!(
            catalog.reserve_stock("0001", 0),
            Err(CoreError::Validation(_))
        ));
        assert!(catalog.reserve_stock("0001", -2).is_err());
        assert_eq!(catalog.get("0001").unwrap().stock, 10);
    }

    #[test]
    fn test_search() {
        let catalog = sample();
        let hits: Vec<_> = catalog.search("rice", 10).iter().map(|p| p.barcode.as_str()).collect();
        assert_eq!(hits, vec!["0002", "0003"]);
        assert_eq!(catalog.search("RICE", 1).len(), 1);
        assert_eq!(catalog.search("0003", 10)[0].name, "Brown Rice");
        assert_eq!(catalog.search("", 10).len(), 3);
        assert!(catalog.search("milk", 10).is_empty());
    }
}

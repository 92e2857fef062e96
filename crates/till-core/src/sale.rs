//! # Sale Pricing
//!
//! Turns a requested list of `(barcode, quantity)` lines into priced lines
//! against a catalog snapshot.
//!
//! ## Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  [LineItem]                                                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  merge_lines ──── empty? ───────────────► EmptySale                     │
//! │      │        └── bad barcode / qty? ───► Validation                    │
//! │      ▼                                                                  │
//! │  resolve every line ── any unknown? ────► UnknownProduct                │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  check every line ──── any short? ──────► InsufficientStock             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  price every line ──── overflow? ───────► AmountOverflow                │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  reserve_stock every line (cannot fail now)                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  PricedSale { lines, total }                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every check runs before the first reservation, so a failing later line
//! never leaves an earlier line's stock decremented.

use crate::catalog::Catalog;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{LineItem, ReceiptLine};
use crate::validation::{validate_barcode, validate_quantity};

/// A sale that passed every check and has been reserved on the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedSale {
    pub lines: Vec<ReceiptLine>,
    pub total: Money,
}

/// Validates lines and merges repeated barcodes.
///
/// Quantities of a repeated barcode are summed; the merged line keeps the
/// position of the first occurrence.
///
/// ## Example
/// ```rust
/// use till_core::sale::merge_lines;
/// use till_core::types::LineItem;
///
/// let merged = merge_lines(&[
///     LineItem::new("A", 1),
///     LineItem::new("B", 2),
///     LineItem::new("A", 3),
/// ])
/// .unwrap();
/// assert_eq!(merged, vec![LineItem::new("A", 4), LineItem::new("B", 2)]);
/// ```
pub fn merge_lines(items: &[LineItem]) -> CoreResult<Vec<LineItem>> {
    if items.is_empty() {
        return Err(CoreError::EmptySale);
    }

    let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
    for item in items {
        let barcode = validate_barcode(&item.barcode)?;
        validate_quantity(item.quantity)?;

        match merged.iter_mut().find(|line| line.barcode == barcode) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| {
                    CoreError::AmountOverflow {
                        context: format!("quantity of {barcode}"),
                    }
                })?;
            }
            None => merged.push(LineItem {
                barcode,
                quantity: item.quantity,
            }),
        }
    }

    Ok(merged)
}

/// Prices a sale and reserves its stock on `catalog`.
///
/// On error `catalog` is untouched.
pub fn price_sale(catalog: &mut Catalog, items: &[LineItem]) -> CoreResult<PricedSale> {
    let merged = merge_lines(items)?;

    // Resolve everything first so an unknown barcode wins over a stock
    // shortage on an earlier line.
    let products = merged
        .iter()
        .map(|line| catalog.require(&line.barcode))
        .collect::<CoreResult<Vec<_>>>()?;

    for (line, product) in merged.iter().zip(&products) {
        if !product.can_sell(line.quantity) {
            return Err(CoreError::InsufficientStock {
                barcode: product.barcode.clone(),
                available: product.stock,
                requested: line.quantity,
            });
        }
    }

    let mut lines = Vec::with_capacity(merged.len());
    let mut total = Money::zero();
    for (line, product) in merged.iter().zip(&products) {
        let line_total = product
            .price
            .checked_mul_quantity(line.quantity)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: format!("line total of {}", line.barcode),
            })?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: "sale total".to_string(),
            })?;
        lines.push(ReceiptLine {
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            quantity: line.quantity,
            unit_price: product.price,
            line_total,
        });
    }

    for line in &lines {
        catalog.reserve_stock(&line.barcode, line.quantity)?;
    }

    Ok(PricedSale { lines, total })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Product;

    fn catalog() -> Catalog {
        Catalog::from_products(vec![
            Product::new("0001", "Soap", Money::from_cents(500), 10),
            Product::new("0002", "Rice", Money::from_cents(1250), 2),
        ])
    }

    #[test]
    fn test_price_single_line() {
        let mut catalog = catalog();
        let sale = price_sale(&mut catalog, &[LineItem::new("0001", 3)]).unwrap();

        assert_eq!(sale.total, Money::from_cents(1500));
        assert_eq!(sale.lines.len(), 1);
        assert_eq!(sale.lines[0].line_total, Money::from_cents(1500));
        assert_eq!(sale.lines[0].name, "Soap");
        assert_eq!(catalog.get("0001").unwrap().stock, 7);
    }

    #[test]
    fn test_price_multi_line_with_duplicates() {
        let mut catalog = catalog();
        let sale = price_sale(
            &mut catalog,
            &[
                LineItem::new("0001", 1),
                LineItem::new("0002", 2),
                LineItem::new("0001", 4),
            ],
        )
        .unwrap();

        assert_eq!(sale.lines.len(), 2);
        assert_eq!(sale.lines[0].barcode, "0001");
        assert_eq!(sale.lines[0].quantity, 5);
        assert_eq!(sale.total, Money::from_cents(2500 + 2500));
        assert_eq!(catalog.get("0001").unwrap().stock, 5);
        assert_eq!(catalog.get("0002").unwrap().stock, 0);
    }

    #[test]
    fn test_merged_quantity_checked_against_stock() {
        let mut catalog = catalog();
        let before = catalog.clone();
        let err = price_sale(
            &mut catalog,
            &[LineItem::new("0002", 1), LineItem::new("0002", 2)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                barcode: "0002".to_string(),
                available: 2,
                requested: 3,
            }
        );
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_later_line_failure_reserves_nothing() {
        let mut catalog = catalog();
        let before = catalog.clone();
        assert!(price_sale(
            &mut catalog,
            &[LineItem::new("0001", 3), LineItem::new("0002", 20)],
        )
        .is_err());
        assert_eq!(catalog, before);

        assert!(matches!(
            price_sale(
                &mut catalog,
                &[LineItem::new("0001", 3), LineItem::new("9999", 1)],
            ),
            Err(CoreError::UnknownProduct(code)) if code == "9999"
        ));
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_rejects_empty_and_bad_quantities() {
        let mut catalog = catalog();
        assert_eq!(price_sale(&mut catalog, &[]), Err(CoreError::EmptySale));
        assert!(matches!(
            price_sale(&mut catalog, &[LineItem::new("0001", 0)]),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            price_sale(&mut catalog, &[LineItem::new("0001", -1)]),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut catalog = Catalog::from_products(vec![Product::new(
            "BIG",
            "Gold bar",
            Money::from_cents(i64::MAX / 2),
            10,
        )]);
        assert!(matches!(
            price_sale(&mut catalog, &[LineItem::new("BIG", 3)]),
            Err(CoreError::AmountOverflow { .. })
        ));
        assert_eq!(catalog.get("BIG").unwrap().stock, 10);
    }
}

//! # Domain Types
//!
//! Core domain types used throughout the till.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   SalesRecord   │   │ CashFlowRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  barcode (key)  │   │  timestamp      │   │  timestamp      │       │
//! │  │  name           │   │  barcode, name  │   │  kind           │       │
//! │  │  price          │   │  quantity       │   │  amount         │       │
//! │  │  stock          │   │  line_total     │   │  concept        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │  SaleReceipt    │   │  CashFlowKind   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  barcode        │   │  sale_id (UUID) │   │  SaleIncome     │       │
//! │  │  quantity       │   │  lines, total   │   │  ManualIn       │       │
//! │  └─────────────────┘   └─────────────────┘   │  ManualOut      │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! A product is identified by its barcode alone. Renaming or re-pricing a
//! product never changes which row it is.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::policy::Role;
use crate::validation::{
    validate_barcode, validate_price, validate_product_name, validate_settings_field,
    validate_stock, ValidationResult,
};

// =============================================================================
// Timestamps
// =============================================================================

/// Formats a timestamp the way every ledger row stores it.
///
/// UTC, RFC 3339, exactly six fractional digits and a `Z` suffix, so that
/// rows sort lexically in time order.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use till_core::types::format_timestamp;
///
/// let ts = Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 30).unwrap();
/// assert_eq!(format_timestamp(ts), "2026-10-19T08:15:30.000000Z");
/// ```
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Drops sub-microsecond precision so an in-memory timestamp equals what a
/// ledger row reads back as.
pub fn ledger_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Barcode - the stable business identity.
    pub barcode: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Unit price.
    pub price: Money,

    /// Units on hand. Never negative.
    pub stock: i64,
}

impl Product {
    /// Creates a product without validation.
    pub fn new(
        barcode: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        stock: i64,
    ) -> Self {
        Product {
            barcode: barcode.into(),
            name: name.into(),
            price,
            stock,
        }
    }

    /// Returns the product with trimmed fields after checking every rule.
    pub fn validated(self) -> ValidationResult<Product> {
        let barcode = validate_barcode(&self.barcode)?;
        let name = validate_product_name(&self.name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)?;
        Ok(Product {
            barcode,
            name,
            price: self.price,
            stock: self.stock,
        })
    }

    /// Checks if `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }
}

// =============================================================================
// Cash Flow Kind
// =============================================================================

/// The type column of a cash-flow row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CashFlowKind {
    /// Written by a completed sale, one per sale.
    SaleIncome,
    /// Cash put into the drawer by hand.
    ManualIn,
    /// Cash taken out of the drawer by hand.
    ManualOut,
}

impl CashFlowKind {
    /// The on-disk spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CashFlowKind::SaleIncome => "sale-income",
            CashFlowKind::ManualIn => "manual-in",
            CashFlowKind::ManualOut => "manual-out",
        }
    }

    /// Whether this kind can be recorded by hand.
    pub const fn is_manual(&self) -> bool {
        matches!(self, CashFlowKind::ManualIn | CashFlowKind::ManualOut)
    }
}

impl fmt::Display for CashFlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CashFlowKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sale-income" => Ok(CashFlowKind::SaleIncome),
            "manual-in" => Ok(CashFlowKind::ManualIn),
            "manual-out" => Ok(CashFlowKind::ManualOut),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec![
                    "sale-income".to_string(),
                    "manual-in".to_string(),
                    "manual-out".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Ledger Records
// =============================================================================

/// One line of one completed sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub timestamp: DateTime<Utc>,
    pub barcode: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// One movement of cash in or out of the drawer. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: CashFlowKind,
    pub amount: Money,
    pub concept: String,
}

// =============================================================================
// Sale Request & Receipt
// =============================================================================

/// A requested sale line: which barcode and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub barcode: String,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(barcode: impl Into<String>, quantity: i64) -> Self {
        LineItem {
            barcode: barcode.into(),
            quantity,
        }
    }
}

/// A priced sale line, as it appears on the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub barcode: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// The result of a completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    /// Identifier of this sale; also appears in the cash-flow concept.
    pub sale_id: Uuid,

    /// Username of the cashier whose session processed the sale.
    pub cashier: String,

    /// Lines in request order, duplicates merged.
    pub lines: Vec<ReceiptLine>,

    /// Sum of all line totals.
    pub total: Money,

    /// Commit timestamp shared by every row the sale wrote.
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Users
// =============================================================================

/// Username and role, without any credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
}

// =============================================================================
// Store Settings
// =============================================================================

/// The store profile printed on receipts and shown in the header.
///
/// Keys missing from `settings.json` fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub business_name: String,
    pub address: String,
    pub phone: String,
    pub cashier_name: String,
    pub logo_path: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            business_name: "My Business".to_string(),
            address: "123 Main St".to_string(),
            phone: "555-0123".to_string(),
            cashier_name: "Cashier".to_string(),
            logo_path: None,
        }
    }
}

impl StoreSettings {
    /// Returns the settings with trimmed fields after checking every rule.
    ///
    /// An empty logo path is stored as no logo.
    pub fn validated(self) -> ValidationResult<StoreSettings> {
        let logo_path = match self.logo_path {
            Some(path) => {
                let path = validate_settings_field("logo_path", &path, false)?;
                (!path.is_empty()).then_some(path)
            }
            None => None,
        };

        Ok(StoreSettings {
            business_name: validate_settings_field("business_name", &self.business_name, true)?,
            address: validate_settings_field("address", &self.address, false)?,
            phone: validate_settings_field("phone", &self.phone, false)?,
            cashier_name: validate_settings_field("cashier_name", &self.cashier_name, false)?,
            logo_path,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_is_fixed_width_and_parses_back() {
        let ts = Utc
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(42))
            .unwrap();
        let formatted = format_timestamp(ts);
        assert_eq!(formatted, "2026-01-02T03:04:05.000042Z");
        assert_eq!(parse_timestamp(&formatted), Some(ts));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_ledger_precision_matches_stored_form() {
        let ts = Utc::now();
        let truncated = ledger_precision(ts);
        assert_eq!(
            parse_timestamp(&format_timestamp(truncated)),
            Some(truncated)
        );
    }

    #[test]
    fn test_product_validated_trims() {
        let product = Product::new(" 0001 ", " Soap ", Money::from_cents(500), 10)
            .validated()
            .unwrap();
        assert_eq!(product.barcode, "0001");
        assert_eq!(product.name, "Soap");
    }

    #[test]
    fn test_product_validated_rejects_negative_values() {
        assert!(Product::new("0001", "Soap", Money::from_cents(-1), 10)
            .validated()
            .is_err());
        assert!(Product::new("0001", "Soap", Money::zero(), -1)
            .validated()
            .is_err());
    }

    #[test]
    fn test_can_sell() {
        let product = Product::new("0001", "Soap", Money::from_cents(500), 10);
        assert!(product.can_sell(10));
        assert!(!product.can_sell(11));
    }

    #[test]
    fn test_cash_flow_kind_spelling() {
        assert_eq!(CashFlowKind::SaleIncome.to_string(), "sale-income");
        assert_eq!(
            "manual-out".parse::<CashFlowKind>().unwrap(),
            CashFlowKind::ManualOut
        );
        assert!("entries".parse::<CashFlowKind>().is_err());
        assert_eq!(
            serde_json::to_string(&CashFlowKind::ManualIn).unwrap(),
            "\"manual-in\""
        );
        assert!(!CashFlowKind::SaleIncome.is_manual());
    }

    #[test]
    fn test_settings_defaults_fill_missing_keys() {
        let settings: StoreSettings =
            serde_json::from_str(r#"{"business_name": "Corner Shop"}"#).unwrap();
        assert_eq!(settings.business_name, "Corner Shop");
        assert_eq!(settings.address, "123 Main St");
        assert_eq!(settings.cashier_name, "Cashier");
        assert_eq!(settings.logo_path, None);
    }

    #[test]
    fn test_settings_validated() {
        let settings = StoreSettings {
            logo_path: Some("  ".to_string()),
            ..StoreSettings::default()
        }
        .validated()
        .unwrap();
        assert_eq!(settings.logo_path, None);

        let empty_name = StoreSettings {
            business_name: " ".to_string(),
            ..StoreSettings::default()
        };
        assert!(empty_name.validated().is_err());
    }
}

//! # till-core: Pure Business Logic for the Till
//!
//! This crate holds the rules of the till as pure functions with zero I/O
//! dependencies: money, roles and permissions, the product catalog, sale
//! pricing and input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Screens / reports (external)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ in-process calls                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                till-store (flat-file persistence)               │   │
//! │  │   sessions, repositories, sale coordinator, journal             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐  │   │
//! │  │   │  money  │ │ policy  │ │ catalog │ │  sale   │ │validation│  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO FILES • NO CLOCK READS • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, SalesRecord, CashFlowRecord, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`policy`] - Roles, operations and the permission table
//! - [`catalog`] - In-memory catalog with stock reservation
//! - [`sale`] - Sale line merging and pricing
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{price_sale, Catalog, LineItem, Money, Product};
//!
//! let mut catalog = Catalog::from_products(vec![
//!     Product::new("0001", "Soap", Money::from_cents(500), 10),
//! ]);
//!
//! let sale = price_sale(&mut catalog, &[LineItem::new("0001", 3)]).unwrap();
//!
//! assert_eq!(sale.total.to_string(), "15.00");
//! assert_eq!(catalog.get("0001").unwrap().stock, 7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod money;
pub mod policy;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use till_core::Money` instead of
// `use till_core::money::Money`

pub use catalog::Catalog;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use policy::{authorize, Operation, Role};
pub use sale::{merge_lines, price_sale, PricedSale};
pub use types::*;

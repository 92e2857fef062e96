//! # Repository Module
//!
//! One repository per data file.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Presentation layer                                                    │
//! │       │                                                                 │
//! │       │  store.catalog().get_product(&session, "0001")                 │
//! │       ▼                                                                 │
//! │  CatalogRepository                                                     │
//! │  ├── authorize the session (one call site)                             │
//! │  ├── validate input                                                    │
//! │  ├── lock ─► read ─► change ─► write (mutations only)                  │
//! │  └── CSV layout of its table                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  products.csv                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CredentialRepository`](credentials::CredentialRepository) - users and password hashes
//! - [`CatalogRepository`](catalog::CatalogRepository) - products and stock
//! - [`LedgerRepository`](ledger::LedgerRepository) - sales and cash-flow logs
//! - [`SettingsRepository`](settings::SettingsRepository) - store profile

pub mod catalog;
pub mod credentials;
pub mod ledger;
pub mod settings;

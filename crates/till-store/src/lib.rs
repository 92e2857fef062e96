//! # till-store: Flat-File Storage Layer for the Till
//!
//! Persistent state of a single-till point of sale: users, products, the
//! sales and cash-flow ledgers and the store profile, all kept as plain
//! files in one data directory.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Data Flow                                 │
//! │                                                                         │
//! │  Screen / command (checkout, user admin, reports)                      │
//! │       │  &Session                                                       │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    till-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌────────────────┐   ┌────────────────┐   │   │
//! │  │   │    Store     │   │  Repositories  │   │ SaleCoordinator│   │   │
//! │  │   │  (store.rs)  │   │ credentials    │   │   (sale.rs)    │   │   │
//! │  │   │ dir lock     │◄──│ catalog        │◄──│ journal commit │   │   │
//! │  │   │ sessions     │   │ ledger         │   │                │   │   │
//! │  │   │ hasher       │   │ settings       │   │                │   │   │
//! │  │   └──────────────┘   └────────────────┘   └────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  credentials.csv  products.csv  sales.csv  cash_flow.csv        │   │
//! │  │  settings.json    sale.journal (only while a sale commits)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Configuration, data paths and the store handle
//! - [`session`] - Login, logout and the authorization gate
//! - [`repository`] - One repository per data file
//! - [`sale`] - The sale transaction
//! - [`error`] - Store error types
//! - [`codec`] / [`fsio`] - CSV tables and durable file primitives
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_store::{Store, StoreConfig};
//! use till_store::till_core::LineItem;
//!
//! let store = Store::open(StoreConfig::from_env()).await?;
//! let session = store.sessions().login("admin", "change-me").await?;
//!
//! let receipt = store
//!     .sales()
//!     .process_sale(&session, &[LineItem::new("0001", 3)])
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codec;
pub mod error;
pub mod fsio;
mod journal;
mod password;
pub mod repository;
pub mod sale;
pub mod session;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{AuthError, ErrorCode, PolicyError, StoreError, StoreResult};
pub use sale::SaleCoordinator;
pub use session::{Identity, Session, SessionManager};
pub use store::{BootstrapAdmin, DataPaths, Store, StoreConfig, DEFAULT_DATA_DIR};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::credentials::CredentialRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::settings::SettingsRepository;

pub use till_core;

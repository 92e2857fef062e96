//! # Sale Journal
//!
//! A rollback journal that makes one sale all-or-nothing across three files.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (lock held)                                                            │
//! │                                                                         │
//! │  1. write sale.journal (atomic)   ← nothing live has changed yet        │
//! │  2. replace products.csv (atomic)                                       │
//! │  3. append sales.csv rows                                               │
//! │  4. append cash_flow.csv row                                            │
//! │  5. remove sale.journal + fsync   ← COMMIT POINT                        │
//! │                                                                         │
//! │  Failure in 2-5:  roll back now (restore products, truncate ledgers)   │
//! │  Crash in 2-5:    Store::open finds the journal and rolls back         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The journal carries the exact bytes of `products.csv` before the sale and
//! the lengths of both ledgers before their appends, so a rollback restores
//! all three files byte for byte.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use till_core::{CashFlowRecord, Product, SalesRecord};

use crate::error::{StoreError, StoreResult};
use crate::fsio;
use crate::store::DataPaths;

/// Everything needed to undo one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SaleJournal {
    pub sale_id: Uuid,

    /// `products.csv` exactly as it was; `None` if it did not exist.
    pub catalog_before: Option<String>,

    /// The catalog the sale writes.
    pub catalog_after: Vec<Product>,

    /// Ledger lengths before the appends.
    pub sales_len: u64,
    pub cash_flow_len: u64,

    /// Rows the sale appends.
    pub sales_rows: Vec<SalesRecord>,
    pub cash_flow_row: CashFlowRecord,
}

/// What `read` found on disk.
#[derive(Debug)]
pub(crate) enum JournalState {
    Absent,
    Pending(Box<SaleJournal>),
    Unreadable(String),
}

impl SaleJournal {
    /// Durably records the journal. Until this returns nothing live changed.
    pub async fn write(&self, paths: &DataPaths) -> StoreResult<()> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| StoreError::storage("encoding the sale journal", e.into()))?;
        fsio::write_atomic(&paths.journal, &bytes)
            .await
            .map_err(|e| StoreError::storage("writing the sale journal", e))
    }

    pub async fn read(paths: &DataPaths) -> StoreResult<JournalState> {
        let bytes = fsio::read_optional(&paths.journal)
            .await
            .map_err(|e| StoreError::storage("reading the sale journal", e))?;
        Ok(match bytes {
            None => JournalState::Absent,
            Some(bytes) => match serde_json::from_slice::<SaleJournal>(&bytes) {
                Ok(journal) => JournalState::Pending(Box::new(journal)),
                Err(err) => JournalState::Unreadable(err.to_string()),
            },
        })
    }

    /// Removes the journal and makes the removal durable.
    pub async fn clear(paths: &DataPaths) -> StoreResult<()> {
        fsio::remove_if_exists(&paths.journal)
            .await
            .map_err(|e| StoreError::storage("removing the sale journal", e))?;
        fsio::sync_dir(&paths.dir)
            .await
            .map_err(|e| StoreError::storage("syncing the data directory", e))
    }

    /// Undoes every effect of the sale, then removes the journal.
    ///
    /// Each step runs even if an earlier one failed; the journal is only
    /// removed when all of them succeeded, and the first error is returned.
    pub async fn roll_back(&self, paths: &DataPaths) -> StoreResult<()> {
        let mut first_error: Option<StoreError> = None;

        let restore = match &self.catalog_before {
            Some(contents) => fsio::write_atomic(&paths.products, contents.as_bytes()).await,
            None => fsio::remove_if_exists(&paths.products).await.map(|_| ()),
        };
        if let Err(e) = restore {
            first_error.get_or_insert(StoreError::storage("restoring products.csv", e));
        }

        if let Err(e) = fsio::truncate_to(&paths.sales, self.sales_len).await {
            first_error.get_or_insert(StoreError::storage("truncating sales.csv", e));
        }

        if let Err(e) = fsio::truncate_to(&paths.cash_flow, self.cash_flow_len).await {
            first_error.get_or_insert(StoreError::storage("truncating cash_flow.csv", e));
        }

        match first_error {
            Some(err) => Err(err),
            None => SaleJournal::clear(paths).await,
        }
    }
}

/// Rolls back a sale interrupted by a crash. Runs under the directory lock
/// before the store is handed out.
pub(crate) async fn recover(paths: &DataPaths) -> StoreResult<()> {
    match SaleJournal::read(paths).await? {
        JournalState::Absent => Ok(()),
        JournalState::Unreadable(reason) => {
            // The journal is replaced atomically, so an unreadable one was
            // never fully written and nothing live changed after it.
            warn!(reason = %reason, "Discarding unreadable sale journal");
            SaleJournal::clear(paths).await
        }
        JournalState::Pending(journal) => {
            warn!(sale_id = %journal.sale_id, "Found unfinished sale, rolling back");
            journal.roll_back(paths).await?;
            info!(sale_id = %journal.sale_id, "Unfinished sale rolled back");
            Ok(())
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

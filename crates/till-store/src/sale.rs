//! # Sale Coordinator
//!
//! Runs one sale as a single all-or-nothing change to the catalog and both
//! ledgers.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  process_sale(session, lines)                                          │
//! │       │                                                                 │
//! │       ├── authorize process-sale + adjust-stock-via-sale               │
//! │       ├── merge + validate lines                                       │
//! │       ├── lock                                                         │
//! │       ├── snapshot products.csv                                        │
//! │       ├── price_sale: resolve, check stock, total, reserve (in memory) │
//! │       │        └── any failure here: nothing on disk changed           │
//! │       ├── write sale.journal                                           │
//! │       ├── replace products.csv, append sales + cash flow               │
//! │       │        └── any failure here: roll back from the journal        │
//! │       └── clear sale.journal ─► receipt                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use till_core::{
    ledger_precision, merge_lines, price_sale, CashFlowKind, CashFlowRecord, LineItem, Operation,
    SaleReceipt, SalesRecord,
};

use crate::error::{StoreError, StoreResult};
use crate::fsio;
use crate::journal::SaleJournal;
use crate::repository::catalog::CatalogRepository;
use crate::repository::ledger::LedgerRepository;
use crate::session::Session;
use crate::store::StoreShared;

/// Commit steps, in order. Used to report how far a failed commit got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Catalog,
    Sales,
    CashFlow,
    Journal,
}

/// Coordinates sales against the catalog and the ledgers.
#[derive(Debug, Clone)]
pub struct SaleCoordinator {
    shared: Arc<StoreShared>,
}

impl SaleCoordinator {
    pub(crate) fn new(shared: Arc<StoreShared>) -> Self {
        SaleCoordinator { shared }
    }

    /// Processes a sale.
    ///
    /// Duplicate barcodes are merged into one line. Every row the sale
    /// writes carries the same timestamp.
    ///
    /// ## Returns
    /// * `Ok(SaleReceipt)` - The sale is durable in all three files
    /// * `Err(NotFound)` - A barcode is not in the catalog
    /// * `Err(InsufficientStock)` - A line asks for more than is on hand
    /// * `Err(Storage)` - The commit failed; the sale did not happen
    ///
    /// ## Example
    /// ```rust,ignore
    /// let receipt = store
    ///     .sales()
    ///     .process_sale(&session, &[LineItem::new("0001", 3)])
    ///     .await?;
    /// println!("Total: {}", receipt.total);
    /// ```
    pub async fn process_sale(
        &self,
        session: &Session,
        items: &[LineItem],
    ) -> StoreResult<SaleReceipt> {
        self.shared.sessions.authorize(session, Operation::ProcessSale)?;
        let cashier = self
            .shared
            .sessions
            .authorize(session, Operation::AdjustStockViaSale)?;
        let items = merge_lines(items)?;

        let catalog_repo = CatalogRepository::new(self.shared.clone());
        let ledger = LedgerRepository::new(self.shared.clone());

        let _guard = self.shared.lock.lock().await;

        let (catalog_before, mut snapshot) = catalog_repo.load_raw().await?;
        let priced = price_sale(&mut snapshot.catalog, &items)?;

        let sale_id = Uuid::new_v4();
        let timestamp = ledger_precision(Utc::now());
        let sales_rows: Vec<SalesRecord> = priced
            .lines
            .iter()
            .map(|line| SalesRecord {
                timestamp,
                barcode: line.barcode.clone(),
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total,
            })
            .collect();
        let cash_flow_row = CashFlowRecord {
            timestamp,
            kind: CashFlowKind::SaleIncome,
            amount: priced.total,
            concept: format!("sale {sale_id}"),
        };

        let paths = &self.shared.paths;
        let journal = SaleJournal {
            sale_id,
            catalog_before,
            catalog_after: snapshot.catalog.products().to_vec(),
            sales_len: fsio::file_len(&paths.sales)
                .await
                .map_err(|e| StoreError::storage("measuring sales.csv", e))?,
            cash_flow_len: fsio::file_len(&paths.cash_flow)
                .await
                .map_err(|e| StoreError::storage("measuring cash_flow.csv", e))?,
            sales_rows,
            cash_flow_row,
        };
        journal.write(paths).await?;

        let mut done: Vec<Step> = Vec::with_capacity(4);
        let committed = async {
            catalog_repo.write(&snapshot).await?;
            done.push(Step::Catalog);
            ledger.append_sale(&journal.sales_rows).await?;
            done.push(Step::Sales);
            ledger.append_cash_flow(&journal.cash_flow_row).await?;
            done.push(Step::CashFlow);
            SaleJournal::clear(paths).await?;
            done.push(Step::Journal);
            Ok::<(), StoreError>(())
        }
        .await;

        if let Err(err) = committed {
            error!(sale_id = %sale_id, completed = ?done, error = %err, "Sale commit failed");
            match journal.roll_back(paths).await {
                Ok(()) => warn!(sale_id = %sale_id, "Sale rolled back"),
                Err(rollback) => error!(
                    sale_id = %sale_id,
                    error = %rollback,
                    "Sale rollback failed, the journal stays for the next open"
                ),
            }
            return Err(err);
        }

        info!(
            sale_id = %sale_id,
            cashier = %cashier.username,
            lines = priced.lines.len(),
            total = %priced.total,
            "Sale completed"
        );

        Ok(SaleReceipt {
            sale_id,
            cashier: cashier.username,
            lines: priced.lines,
            total: priced.total,
            timestamp,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Ledger Repository
//!
//! The two append-only logs: `sales.csv` and `cash_flow.csv`.
//!
//! ## Rules
//! - Rows are only ever appended, in call order, and synced before the
//!   append returns.
//! - A failed append cuts the file back to its previous length.
//! - Malformed rows are skipped on read with a warning. They are never
//!   repaired or removed.
//!
//! ## File Layout
//! ```text
//! sales.csv
//! timestamp,barcode,name,quantity,unit_price,line_total
//! 2026-10-19T08:15:30.000042Z,0001,Soap,3,5.00,15.00
//!
//! cash_flow.csv
//! timestamp,type,amount,concept
//! 2026-10-19T08:15:30.000042Z,sale-income,15.00,sale 6f1c...
//! 2026-10-19T09:00:00.000000Z,manual-out,20.00,Supplier payment
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use csv::StringRecord;
use tracing::info;

use till_core::types::{format_timestamp, ledger_precision, parse_timestamp};
use till_core::validation::{validate_cash_amount, validate_concept};
use till_core::{CashFlowKind, CashFlowRecord, Money, Operation, SalesRecord, ValidationError};

use crate::codec::{expect_columns, field, header_line, read_table, write_table};
use crate::error::{StoreError, StoreResult};
use crate::fsio;
use crate::session::Session;
use crate::store::StoreShared;

pub const SALES_HEADER: [&str; 6] = [
    "timestamp",
    "barcode",
    "name",
    "quantity",
    "unit_price",
    "line_total",
];

pub const CASH_FLOW_HEADER: [&str; 4] = ["timestamp", "type", "amount", "concept"];

// =============================================================================
// Codecs
// =============================================================================

pub(crate) fn encode_sales(rows: &[SalesRecord]) -> io::Result<Vec<u8>> {
    write_table(None, rows, |r| {
        vec![
            format_timestamp(r.timestamp),
            r.barcode.clone(),
            r.name.clone(),
            r.quantity.to_string(),
            r.unit_price.to_string(),
            r.line_total.to_string(),
        ]
    })
}

pub(crate) fn encode_cash_flow(rows: &[CashFlowRecord]) -> io::Result<Vec<u8>> {
    write_table(None, rows, |r| {
        vec![
            format_timestamp(r.timestamp),
            r.kind.to_string(),
            r.amount.to_string(),
            r.concept.clone(),
        ]
    })
}

fn timestamp(record: &StringRecord) -> Result<DateTime<Utc>, String> {
    let raw = field(record, 0, "timestamp")?;
    parse_timestamp(raw).ok_or_else(|| format!("bad timestamp {raw:?}"))
}

fn money(record: &StringRecord, idx: usize, name: &str) -> Result<Money, String> {
    field(record, idx, name)?
        .parse::<Money>()
        .map_err(|e| format!("{name}: {e}"))
}

fn parse_sale(record: &StringRecord) -> Result<SalesRecord, String> {
    expect_columns(record, &[6])?;
    let quantity = field(record, 3, "quantity")?
        .parse::<i64>()
        .map_err(|e| format!("quantity: {e}"))?;
    let unit_price = money(record, 4, "unit_price")?;
    let line_total = money(record, 5, "line_total")?;

    if quantity <= 0 {
        return Err("quantity must be positive".to_string());
    }
    if unit_price.checked_mul_quantity(quantity) != Some(line_total) {
        return Err("line_total does not match unit_price x quantity".to_string());
    }

    Ok(SalesRecord {
        timestamp: timestamp(record)?,
        barcode: field(record, 1, "barcode")?.to_string(),
        name: field(record, 2, "name")?.to_string(),
        quantity,
        unit_price,
        line_total,
    })
}

fn parse_cash_flow(record: &StringRecord) -> Result<CashFlowRecord, String> {
    expect_columns(record, &[4])?;
    let kind = field(record, 1, "type")?
        .parse::<CashFlowKind>()
        .map_err(|e| e.to_string())?;
    let amount = money(record, 2, "amount")?;
    if amount.is_negative() {
        return Err("negative amount".to_string());
    }

    Ok(CashFlowRecord {
        timestamp: timestamp(record)?,
        kind,
        amount,
        concept: field(record, 3, "concept")?.to_string(),
    })
}

pub(crate) fn decode_sales(path: &Path, bytes: &[u8]) -> Vec<SalesRecord> {
    read_table(path, bytes, parse_sale)
}

pub(crate) fn decode_cash_flow(path: &Path, bytes: &[u8]) -> Vec<CashFlowRecord> {
    read_table(path, bytes, parse_cash_flow)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the sales and cash-flow ledgers.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    shared: Arc<StoreShared>,
}

impl LedgerRepository {
    pub(crate) fn new(shared: Arc<StoreShared>) -> Self {
        LedgerRepository { shared }
    }

    /// Appends the lines of one sale. Caller holds the lock.
    pub(crate) async fn append_sale(&self, rows: &[SalesRecord]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let header =
            header_line(&SALES_HEADER).map_err(|e| StoreError::storage("encoding sales", e))?;
        let bytes = encode_sales(rows).map_err(|e| StoreError::storage("encoding sales", e))?;
        fsio::append(&self.shared.paths.sales, &header, &bytes)
            .await
            .map_err(|e| StoreError::storage("appending to sales.csv", e))?;
        Ok(())
    }

    /// Appends one cash movement. Caller holds the lock.
    pub(crate) async fn append_cash_flow(&self, row: &CashFlowRecord) -> StoreResult<()> {
        let header = header_line(&CASH_FLOW_HEADER)
            .map_err(|e| StoreError::storage("encoding cash flow", e))?;
        let bytes = encode_cash_flow(std::slice::from_ref(row))
            .map_err(|e| StoreError::storage("encoding cash flow", e))?;
        fsio::append(&self.shared.paths.cash_flow, &header, &bytes)
            .await
            .map_err(|e| StoreError::storage("appending to cash_flow.csv", e))?;
        Ok(())
    }

    /// Records cash put into or taken out of the drawer by hand.
    ///
    /// ## Errors
    /// - `ValidationError` - `kind` is `sale-income`, the amount is not
    ///   positive, or the concept is empty
    ///
    /// ## Example
    /// ```rust,ignore
    /// store
    ///     .ledger()
    ///     .record_cash_movement(&session, CashFlowKind::ManualOut, "20.00".parse()?, "Supplier")
    ///     .await?;
    /// ```
    pub async fn record_cash_movement(
        &self,
        session: &Session,
        kind: CashFlowKind,
        amount: Money,
        concept: &str,
    ) -> StoreResult<CashFlowRecord> {
        let actor = self
            .shared
            .sessions
            .authorize(session, Operation::RecordCashMovement)?;
        if !kind.is_manual() {
            return Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec![
                    CashFlowKind::ManualIn.to_string(),
                    CashFlowKind::ManualOut.to_string(),
                ],
            }
            .into());
        }
        validate_cash_amount(amount)?;
        let concept = validate_concept(concept)?;

        let _guard = self.shared.lock.lock().await;
        let row = CashFlowRecord {
            timestamp: ledger_precision(Utc::now()),
            kind,
            amount,
            concept,
        };
        self.append_cash_flow(&row).await?;

        info!(kind = %kind, amount = %amount, by = %actor.username, "Cash movement recorded");
        Ok(row)
    }

    async fn read_sales(&self) -> StoreResult<Vec<SalesRecord>> {
        let path = &self.shared.paths.sales;
        let bytes = fsio::read_optional(path)
            .await
            .map_err(|e| StoreError::storage("reading sales.csv", e))?;
        Ok(bytes.map(|b| decode_sales(path, &b)).unwrap_or_default())
    }

    async fn read_cash_flow(&self) -> StoreResult<Vec<CashFlowRecord>> {
        let path = &self.shared.paths.cash_flow;
        let bytes = fsio::read_optional(path)
            .await
            .map_err(|e| StoreError::storage("reading cash_flow.csv", e))?;
        Ok(bytes.map(|b| decode_cash_flow(path, &b)).unwrap_or_default())
    }

    /// Every readable sales row in append order.
    pub async fn sales_records(&self, session: &Session) -> StoreResult<Vec<SalesRecord>> {
        self.shared.sessions.authorize(session, Operation::ViewReports)?;
        self.read_sales().await
    }

    /// Every readable cash-flow row in append order.
    pub async fn cash_flow_records(&self, session: &Session) -> StoreResult<Vec<CashFlowRecord>> {
        self.shared.sessions.authorize(session, Operation::ViewReports)?;
        self.read_cash_flow().await
    }

    /// Sales rows stamped within `from..=to`.
    pub async fn sales_between(
        &self,
        session: &Session,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<SalesRecord>> {
        self.shared.sessions.authorize(session, Operation::ViewReports)?;
        let mut rows = self.read_sales().await?;
        rows.retain(|r| r.timestamp >= from && r.timestamp <= to);
        Ok(rows)
    }

    /// Cash-flow rows stamped within `from..=to`.
    pub async fn cash_flow_between(
        &self,
        session: &Session,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<CashFlowRecord>> {
        self.shared.sessions.authorize(session, Operation::ViewReports)?;
        let mut rows = self.read_cash_flow().await?;
        rows.retain(|r| r.timestamp >= from && r.timestamp <= to);
        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

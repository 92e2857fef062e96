//! # Authorization Policy
//!
//! The role → operation permission table.
//!
//! ## Permission Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation                 │  Cashier  │  Admin                         │
//! │  ──────────────────────────┼───────────┼─────────                       │
//! │  process-sale              │     ✔     │    ✔                           │
//! │  read-product              │     ✔     │    ✔                           │
//! │  adjust-stock-via-sale     │     ✔     │    ✔                           │
//! │  record-cash-movement      │     ✔     │    ✔                           │
//! │  manage-products           │           │    ✔                           │
//! │  manage-users              │           │    ✔                           │
//! │  view-reports              │           │    ✔                           │
//! │  edit-settings             │           │    ✔                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `authorize` is a pure lookup. Turning a denial into an error happens in
//! exactly one place, the session manager in till-store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Role
// =============================================================================

/// A user's role. Closed set: there is no third role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Cashier,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
        }
    }

    /// Every operation this role may perform, in table order.
    pub fn permissions(&self) -> Vec<Operation> {
        Operation::ALL
            .iter()
            .copied()
            .filter(|op| authorize(*self, *op))
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "cashier" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".to_string(), "cashier".to_string()],
            }),
        }
    }
}

// =============================================================================
// Operation
// =============================================================================

/// Something a session may ask the store to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    ProcessSale,
    ReadProduct,
    AdjustStockViaSale,
    RecordCashMovement,
    ManageProducts,
    ManageUsers,
    ViewReports,
    EditSettings,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::ProcessSale,
        Operation::ReadProduct,
        Operation::AdjustStockViaSale,
        Operation::RecordCashMovement,
        Operation::ManageProducts,
        Operation::ManageUsers,
        Operation::ViewReports,
        Operation::EditSettings,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::ProcessSale => "process-sale",
            Operation::ReadProduct => "read-product",
            Operation::AdjustStockViaSale => "adjust-stock-via-sale",
            Operation::RecordCashMovement => "record-cash-movement",
            Operation::ManageProducts => "manage-products",
            Operation::ManageUsers => "manage-users",
            Operation::ViewReports => "view-reports",
            Operation::EditSettings => "edit-settings",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Returns whether `role` may perform `operation`.
///
/// - No IO
/// - No panics
///
/// ## Example
/// ```rust
/// use till_core::policy::{authorize, Operation, Role};
///
/// assert!(authorize(Role::Cashier, Operation::ProcessSale));
/// assert!(!authorize(Role::Cashier, Operation::ManageUsers));
/// assert!(authorize(Role::Admin, Operation::ManageUsers));
/// ```
pub const fn authorize(role: Role, operation: Operation) -> bool {
    match role {
        Role::Admin => true,
        Role::Cashier => matches!(
            operation,
            Operation::ProcessSale
                | Operation::ReadProduct
                | Operation::AdjustStockViaSale
                | Operation::RecordCashMovement
        ),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cashier_table() {
        let allowed = Role::Cashier.permissions();
        assert_eq!(
            allowed,
            vec![
                Operation::ProcessSale,
                Operation::ReadProduct,
                Operation::AdjustStockViaSale,
                Operation::RecordCashMovement,
            ]
        );
        for op in [
            Operation::ManageProducts,
            Operation::ManageUsers,
            Operation::ViewReports,
            Operation::EditSettings,
        ] {
            assert!(!authorize(Role::Cashier, op), "cashier must not {op}");
        }
    }

    #[test]
    fn test_admin_is_superset_of_cashier() {
        for op in Operation::ALL {
            if authorize(Role::Cashier, op) {
                assert!(authorize(Role::Admin, op));
            }
        }
        assert_eq!(Role::Admin.permissions().len(), Operation::ALL.len());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" cashier ".parse::<Role>().unwrap(), Role::Cashier);
        assert!(matches!(
            "owner".parse::<Role>(),
            Err(ValidationError::NotAllowed { .. })
        ));
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::AdjustStockViaSale.to_string(), "adjust-stock-via-sale");
        assert_eq!(
            serde_json::to_string(&Operation::EditSettings).unwrap(),
            "\"edit-settings\""
        );
    }
}

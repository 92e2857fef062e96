//! # Store Error Types
//!
//! The error taxonomy every till-store operation returns.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  io::Error / csv::Error / argon2 error                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CoreError (till-core) ──From──┐                                       │
//! │                                ▼                                        │
//! │  StoreError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorCode ← stable code for the presentation layer                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use till_core::{CoreError, Operation, Role, ValidationError};

// =============================================================================
// Store Error
// =============================================================================

/// Errors returned to the caller of any store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad credentials, or a session that is no longer active.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The session's role may not perform the operation.
    ///
    /// ## When This Occurs
    /// - A cashier opens product management, user management,
    ///   reports or settings
    #[error("Role {role} is not permitted to {operation}")]
    PermissionDenied { role: Role, operation: Operation },

    /// Malformed input.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown barcode or username.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Last-admin or self-deletion guard.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// A sale line asked for more than is on hand.
    #[error("Insufficient stock for {barcode}: available {available}, requested {requested}")]
    InsufficientStock {
        barcode: String,
        available: i64,
        requested: i64,
    },

    /// An amount left the representable range.
    #[error("Amount overflow while computing {0}")]
    Overflow(String),

    /// Reading or writing a file failed.
    ///
    /// ## When This Occurs
    /// - Disk full, permissions, file replaced by a directory
    /// - Any failure while committing a sale (the sale is not completed)
    #[error("Storage error while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A file exists but cannot be understood.
    #[error("Corrupt file {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// Deriving or checking a password hash failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// The store cannot be opened with the given configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Authentication failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The session was logged out, revoked, or never existed.
    #[error("Session is not active")]
    SessionNotActive,
}

/// Guards that protect the user set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Deleting this user would leave no admin.
    #[error("Cannot delete {0}: it is the last admin")]
    LastAdmin(String),

    /// A session tried to delete its own user.
    #[error("Cannot delete {0}: it is the user of the current session")]
    SelfDeletion(String),
}

impl StoreError {
    /// Wraps an I/O error with what the store was doing.
    pub fn storage(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Storage {
            context: context.into(),
            source,
        }
    }

    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Corrupt error for a file.
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable code for the presentation layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Auth(AuthError::InvalidCredentials) => ErrorCode::InvalidCredentials,
            StoreError::Auth(AuthError::SessionNotActive) => ErrorCode::SessionNotActive,
            StoreError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            StoreError::Validation(_) => ErrorCode::ValidationError,
            StoreError::NotFound { .. } => ErrorCode::NotFound,
            StoreError::Policy(_) => ErrorCode::PolicyViolation,
            StoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            StoreError::Overflow(_) => ErrorCode::ValidationError,
            StoreError::Storage { .. } | StoreError::Hashing(_) => ErrorCode::StorageError,
            StoreError::Corrupt { .. } => ErrorCode::CorruptData,
            StoreError::Config(_) => ErrorCode::ConfigError,
        }
    }
}

/// Maps domain failures into the store taxonomy.
///
/// ## Error Mapping
/// ```text
/// CoreError::UnknownProduct     → StoreError::NotFound { entity: "Product" }
/// CoreError::InsufficientStock  → StoreError::InsufficientStock
/// CoreError::EmptySale          → StoreError::Validation(Required "line items")
/// CoreError::AmountOverflow     → StoreError::Overflow
/// CoreError::Validation         → StoreError::Validation
/// ```
impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownProduct(barcode) => StoreError::not_found("Product", barcode),
            CoreError::InsufficientStock {
                barcode,
                available,
                requested,
            } => StoreError::InsufficientStock {
                barcode,
                available,
                requested,
            },
            CoreError::EmptySale => StoreError::Validation(ValidationError::Required {
                field: "line items".to_string(),
            }),
            CoreError::AmountOverflow { context } => StoreError::Overflow(context),
            CoreError::Validation(err) => StoreError::Validation(err),
        }
    }
}

// =============================================================================
// Error Code
// =============================================================================

/// Error codes for the presentation layer.
///
/// ## Serialization
/// ```json
/// "PERMISSION_DENIED"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidCredentials,
    SessionNotActive,
    PermissionDenied,
    ValidationError,
    NotFound,
    PolicyViolation,
    InsufficientStock,
    StorageError,
    CorruptData,
    ConfigError,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

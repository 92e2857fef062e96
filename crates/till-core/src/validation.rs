//! # Validation Module
//!
//! Input validation for every value that ends up in a data file.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Screens (external)                                           │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: till-store operation                                         │
//! │  ├── Permission check                                                  │
//! │  └── THIS MODULE: field rules, before any lock is taken                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Under the directory lock                                     │
//! │  ├── Uniqueness (username)                                             │
//! │  ├── Existence (barcode, username)                                     │
//! │  └── Stock sufficiency                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! String validators return the trimmed value that should be stored.
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_barcode, validate_quantity};
//!
//! assert_eq!(validate_barcode(" 0001 ").unwrap(), "0001");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum barcode length.
pub const MAX_BARCODE_LEN: usize = 64;

/// Maximum product name length.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 32;

/// Password length bounds.
pub const MIN_PASSWORD_LEN: usize = 4;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Maximum length of a cash-flow concept or a settings field.
pub const MAX_TEXT_LEN: usize = 200;

/// Maximum search term length.
pub const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// Helpers
// =============================================================================

fn required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

fn single_line(field: &str, value: &str) -> ValidationResult<()> {
    if value.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain line breaks or control characters".to_string(),
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a barcode and returns it trimmed.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Only ASCII letters, digits, `-`, `_` and `.`
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_barcode;
///
/// assert!(validate_barcode("7501055300075").is_ok());
/// assert!(validate_barcode("").is_err());
/// assert!(validate_barcode("12 34").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<String> {
    let barcode = required("barcode", barcode)?;
    max_len("barcode", &barcode, MAX_BARCODE_LEN)?;

    if !barcode
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, numbers, '-', '_' and '.'".to_string(),
        });
    }

    Ok(barcode)
}

/// Validates a product name and returns it trimmed.
///
/// Ledger rows are one physical line each, so names are single-line.
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    let name = required("name", name)?;
    max_len("name", &name, MAX_NAME_LEN)?;
    single_line("name", &name)?;
    Ok(name)
}

/// Validates a unit price. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(1099)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-100)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a stock level. Zero is allowed, negative never.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a sale line quantity.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sale: scan line                                                        │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → line accepted, stock checked under the lock             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a search term and returns it trimmed. Empty is allowed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    max_len("query", query, MAX_QUERY_LEN)?;
    Ok(query.to_string())
}

// =============================================================================
// Credential Validators
// =============================================================================

/// Validates a username and returns it trimmed.
///
/// ## Rules
/// - 1 to 32 characters
/// - ASCII letters, digits, `.`, `_` and `-`
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = required("username", username)?;
    max_len("username", &username, MAX_USERNAME_LEN)?;

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, '.', '_' and '-'".to_string(),
        });
    }

    Ok(username)
}

/// Validates a new password. Not trimmed: whitespace is significant.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();
    if len == 0 {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    max_len("password", password, MAX_PASSWORD_LEN)
}

// =============================================================================
// Ledger Validators
// =============================================================================

/// Validates a manual cash movement amount (strictly positive).
pub fn validate_cash_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a cash movement concept and returns it trimmed.
pub fn validate_concept(concept: &str) -> ValidationResult<String> {
    let concept = required("concept", concept)?;
    max_len("concept", &concept, MAX_TEXT_LEN)?;
    single_line("concept", &concept)?;
    Ok(concept)
}

// =============================================================================
// Settings Validators
// =============================================================================

/// Validates one store settings field and returns it trimmed.
pub fn validate_settings_field(
    field: &str,
    value: &str,
    is_required: bool,
) -> ValidationResult<String> {
    let value = if is_required {
        required(field, value)?
    } else {
        value.trim().to_string()
    };
    max_len(field, &value, MAX_TEXT_LEN)?;
    Ok(value)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_barcode() {
        assert_eq!(validate_barcode("0001").unwrap(), "0001");
        assert_eq!(validate_barcode("  ABC-12_x.9 ").unwrap(), "ABC-12_x.9");
        assert!(validate_barcode("   ").is_err());
        assert!(validate_barcode("a,b").is_err());
        assert!(validate_barcode("a b").is_err());
        assert!(validate_barcode(&"9".repeat(65)).is_err());
        assert!(validate_barcode(&"9".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_product_name() {
        assert_eq!(validate_product_name(" Café, 250g ").unwrap(), "Café, 250g");
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"x".repeat(201)).is_err());
        assert!(validate_product_name("two\nlines").is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username(" maria.g ").unwrap(), "maria.g");
        assert!(validate_username("").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("comma,name").is_err());
        assert!(validate_username(&"u".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("1234").is_ok());
        assert!(matches!(
            validate_password("123"),
            Err(ValidationError::TooShort { min: 4, .. })
        ));
        assert!(matches!(
            validate_password(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_cash_movement_fields() {
        assert!(validate_cash_amount(Money::from_cents(1)).is_ok());
        assert!(validate_cash_amount(Money::zero()).is_err());
        assert!(validate_cash_amount(Money::from_cents(-100)).is_err());
        assert_eq!(validate_concept(" change fund ").unwrap(), "change fund");
        assert!(validate_concept("  ").is_err());
        assert!(validate_concept("tab\there").is_err());
    }

    #[test]
    fn test_validate_settings_field() {
        assert!(validate_settings_field("business_name", "", true).is_err());
        assert_eq!(validate_settings_field("phone", "", false).unwrap(), "");
        assert!(validate_settings_field("address", &"a".repeat(201), false).is_err());
    }
}

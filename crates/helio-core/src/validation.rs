//! # Validation Module
//!
//! Input validation for everything that ends up in a workbook cell.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI / caller                                                 │
//! │  └── Type validation (argument parsing, deserialization)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation before any fetch happens                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Workbook                                                     │
//! │  └── No constraints at all. A cell takes whatever it is given.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use helio_core::validation::{validate_material, validate_quantity};
//!
//! validate_material("Copper Wire 4mm").unwrap();
//! validate_quantity(12.5).unwrap();
//! assert!(validate_quantity(0.0).is_err());
//! ```

use crate::error::ValidationError;
use crate::locator::normalize_mobile;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest text accepted into a single cell.
pub const MAX_TEXT_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Non-empty after trimming and at most [`MAX_TEXT_LEN`] characters.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(())
}

pub fn validate_material(material: &str) -> ValidationResult<()> {
    validate_required("material", material)
}

pub fn validate_name(name: &str) -> ValidationResult<()> {
    validate_required("name", name)
}

/// Validates a mobile number.
///
/// ## Rules
/// - At least 10 digits once separators and country code are stripped
/// - Only digits, spaces, `+`, `-` and parentheses
pub fn validate_mobile(mobile: &str) -> ValidationResult<()> {
    validate_required("mobile", mobile)?;

    if !mobile
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "mobile".to_string(),
            reason: "must contain only digits and separators".to_string(),
        });
    }

    if normalize_mobile(mobile).len() < 10 {
        return Err(ValidationError::InvalidFormat {
            field: "mobile".to_string(),
            reason: "must have at least 10 digits".to_string(),
        });
    }

    Ok(())
}

/// Loose email check: one `@` with text on both sides and a dot after it.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_required("email", email)?;
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "not an email address".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a stock movement quantity.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Stock Out: 25 × Panel on 01-03-2024                                   │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(25.0) ← THIS FUNCTION                               │
/// │       │                                                                 │
/// │       ├── not finite / <= 0? → Error: "quantity must be positive"      │
/// │       │                                                                 │
/// │       └── OK → fetch workbook, append journal, update master           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: f64) -> ValidationResult<()> {
    validate_positive("quantity", qty)
}

/// System size in kW.
pub fn validate_kw(kw: f64) -> ValidationResult<()> {
    validate_positive("kW", kw)
}

/// Zero or more (opening stock, advance, total cost).
pub fn validate_non_negative(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

fn validate_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_month(month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_material("Panel 540Wp").is_ok());
        assert!(validate_material("   ").is_err());
        assert!(validate_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_mobile() {
        assert!(validate_mobile("+91 98765-43210").is_ok());
        assert!(validate_mobile("9876543210").is_ok());
        assert!(validate_mobile("98765").is_err());
        assert!(validate_mobile("98765abc10").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ops@helio.in").is_ok());
        assert!(validate_email("ops@helio").is_err());
        assert!(validate_email("@helio.in").is_err());
    }

    #[test]
    fn test_validate_quantities() {
        assert!(validate_quantity(0.5).is_ok());
        assert!(validate_quantity(0.0).is_err());
        assert!(validate_quantity(-1.0).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
        assert!(validate_non_negative("opening stock", 0.0).is_ok());
        assert!(validate_non_negative("opening stock", -0.1).is_err());
        assert!(validate_kw(3.3).is_ok());
    }

    #[test]
    fn test_validate_month() {
        assert!(validate_month(1).is_ok());
        assert!(validate_month(12).is_ok());
        assert!(validate_month(13).is_err());
    }
}

//! # Error Types
//!
//! Domain-specific error types for helio-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  helio-core errors (this file)                                         │
//! │  ├── CoreError        - Workbook / record / layout failures            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  helio-store errors (separate crate)                                   │
//! │  └── StoreError       - Fetch, parse, persist and retry failures       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → CLI (anyhow)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised while reading or mutating an in-memory workbook.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sheet the operation depends on does not exist.
    ///
    /// ## When This Occurs
    /// - Reading a month's stock report before any movement was recorded
    /// - A workbook was replaced in the file store by one with other tabs
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// A sheet with this name already exists in the workbook.
    #[error("Sheet already exists: {0}")]
    DuplicateSheet(String),

    /// No row matched the record key.
    #[error("Record not found in {sheet}: {key}")]
    RecordNotFound { sheet: String, key: String },

    /// A positional row reference points outside the data region.
    #[error("Row {row} is outside the data rows of {sheet}")]
    InvalidRow { sheet: String, row: u32 },

    /// A merge request overlaps an existing merged range.
    ///
    /// ## When This Occurs
    /// A date-block header is written over columns that are already part of
    /// another merge, usually after a workbook was edited by hand.
    #[error("Cannot merge {range} in {sheet}: overlaps {existing}")]
    MergeConflict {
        sheet: String,
        range: String,
        existing: String,
    },

    /// A cell address could not be parsed.
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// A field name is not part of the sheet schema.
    #[error("Unknown field '{field}' for {sheet}")]
    UnknownField { sheet: String, field: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a RecordNotFound error.
    pub fn record_not_found(sheet: impl Into<String>, key: impl Into<String>) -> Self {
        CoreError::RecordNotFound {
            sheet: sheet.into(),
            key: key.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any workbook is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed date, short mobile number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::record_not_found("Client Data", "ravi-5-9876543210");
        assert_eq!(
            err.to_string(),
            "Record not found in Client Data: ravi-5-9876543210"
        );

        let err = CoreError::MergeConflict {
            sheet: "Stock 03".to_string(),
            range: "E1:G1".to_string(),
            existing: "F1:H1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot merge E1:G1 in Stock 03: overlaps F1:H1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "material".to_string(),
        };
        assert_eq!(err.to_string(), "material is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

//! # Store Error Types
//!
//! Errors raised while fetching, parsing, mutating and persisting workbooks.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  File Store     │  │   Document      │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotFound       │  │  DocumentFormat │  │  DateColumnMissing      │ │
//! │  │  Auth           │  │                 │  │  ConcurrentModification │ │
//! │  │  Transient  ⟲   │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Domain         │  │   Local         │  │     Rendering           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Io             │  │  Render                 │ │
//! │  │  Core           │  │  Config         │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ⟲ = retried with backoff, and only on fetch                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use helio_core::{CoreError, ValidationError};

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // File Store Errors
    // =========================================================================
    /// The file key does not exist in the store.
    #[error("Workbook not found: {0}")]
    NotFound(String),

    /// Credentials for the store are missing, invalid or expired.
    #[error("Not authorized to access {key}: {reason}")]
    Auth { key: String, reason: String },

    /// A network-level failure that may succeed when repeated.
    #[error("Transient store failure: {0}")]
    Transient(String),

    // =========================================================================
    // Document Errors
    // =========================================================================
    /// The bytes are not a readable workbook, or the workbook cannot be
    /// serialized.
    #[error("Malformed workbook document: {0}")]
    DocumentFormat(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// The document changed in the store since it was fetched.
    #[error("Workbook {key} was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrentModification {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// The day's stock columns are still missing after backfill and reload.
    #[error("Date columns for {date} missing in {sheet} after backfill and reload")]
    DateColumnMissing { sheet: String, date: String },

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Input rejected before any fetch happened.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Error raised by a workbook mutation.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Local Errors
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The PDF renderer failed. Persisted workbook state is unaffected.
    #[error("Rendering failed: {0}")]
    Render(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl StoreError {
    /// Returns true if repeating the same fetch may succeed.
    ///
    /// Only [`StoreError::Transient`] qualifies. Auth, format and domain
    /// errors fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// Returns true for "record/sheet/file not there" outcomes, which callers
    /// report as a missing result rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_)
                | StoreError::Core(CoreError::SheetNotFound(_))
                | StoreError::Core(CoreError::RecordNotFound { .. })
        )
    }
}

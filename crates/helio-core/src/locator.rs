//! # Record Locator
//!
//! Finds the row holding a record by normalized key comparison, and upserts
//! when no row matches.
//!
//! ## Matching
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RecordKey: [Name ≈ "Ravi Kumar"] ∧ [kW ≈ 5] ∧ [Mobile ≈ 9876543210]   │
//! │                                                                         │
//! │  row 2: "ravi kumar " | 5   | "+91 98765-43210"   → match (first wins)  │
//! │  row 3: "Ravi Kumar"  | 3   | "9876543210"        → kW differs          │
//! │  row 4: "RAVI KUMAR"  | "5" | "09876543210"       → match (duplicate)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Duplicates are tolerated: lookups return the first matching row in scan
//! order and [`find_all`] exposes the rest for reporting.

use std::fmt;

use tracing::{debug, warn};

use crate::document::{format_number, CellValue, Row, Sheet};

// =============================================================================
// Normalizers
// =============================================================================

/// How a key column is canonicalized before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Lowercased, trimmed.
    Text,
    /// Digits only, last 10 kept.
    Mobile,
    /// Numeric canonical form (`"5.0"` and `5` compare equal); falls back to
    /// text for non-numeric cells.
    Number,
}

impl Normalizer {
    pub fn normalize(&self, raw: &str) -> String {
        match self {
            Normalizer::Text => normalize_text(raw),
            Normalizer::Mobile => normalize_mobile(raw),
            Normalizer::Number => match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => format_number(n),
                _ => normalize_text(raw),
            },
        }
    }
}

pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn normalize_mobile(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let start = digits.len().saturating_sub(10);
    digits[start..].iter().collect()
}

// =============================================================================
// Key Predicates
// =============================================================================

/// One column of a record key, with its expected value already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPredicate {
    pub column: u32,
    pub normalizer: Normalizer,
    expected: String,
}

impl KeyPredicate {
    pub fn new(column: u32, value: &str, normalizer: Normalizer) -> Self {
        KeyPredicate {
            column,
            normalizer,
            expected: normalizer.normalize(value),
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn matches(&self, row: &Row<'_>) -> bool {
        self.normalizer.normalize(&row.text(self.column)) == self.expected
    }
}

/// Conjunction of predicates identifying one logical record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordKey {
    predicates: Vec<KeyPredicate>,
}

impl RecordKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate (builder style).
    pub fn with(mut self, column: u32, value: &str, normalizer: Normalizer) -> Self {
        self.predicates.push(KeyPredicate::new(column, value, normalizer));
        self
    }

    pub fn predicates(&self) -> &[KeyPredicate] {
        &self.predicates
    }

    /// An empty key never matches; every predicate must hold otherwise.
    pub fn matches(&self, row: &Row<'_>) -> bool {
        !self.predicates.is_empty() && self.predicates.iter().all(|p| p.matches(row))
    }

    /// Canonical composite key, e.g. `ravi kumar-5-9876543210`.
    pub fn composite(&self) -> String {
        self.predicates
            .iter()
            .map(KeyPredicate::expected)
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.composite())
    }
}

// =============================================================================
// Lookup & Upsert
// =============================================================================

/// Outcome of [`find_or_create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    Found(u32),
    Created(u32),
}

impl Located {
    pub fn row(&self) -> u32 {
        match self {
            Located::Found(row) | Located::Created(row) => *row,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Located::Created(_))
    }
}

/// First row at or after `first_data_row` matching `key`.
pub fn find_row(sheet: &Sheet, first_data_row: u32, key: &RecordKey) -> Option<u32> {
    sheet
        .rows_from(first_data_row)
        .find(|row| key.matches(row))
        .map(|row| row.index())
}

/// Every matching row, in scan order.
pub fn find_all(sheet: &Sheet, first_data_row: u32, key: &RecordKey) -> Vec<u32> {
    sheet
        .rows_from(first_data_row)
        .filter(|row| key.matches(row))
        .map(|row| row.index())
        .collect()
}

/// Finds the record's row, appending `seed` as a new row when none matches.
///
/// The new row is never placed above `first_data_row`. When several rows
/// match, the first wins and the collision is logged.
pub fn find_or_create<I, V>(sheet: &mut Sheet, first_data_row: u32, key: &RecordKey, seed: I) -> Located
where
    I: IntoIterator<Item = V>,
    V: Into<CellValue>,
{
    let matches = find_all(sheet, first_data_row, key);
    if let Some(&row) = matches.first() {
        if matches.len() > 1 {
            warn!(
                sheet = %sheet.name(),
                key = %key,
                rows = ?matches,
                "duplicate records share a key, using the first"
            );
        }
        return Located::Found(row);
    }

    let row = (sheet.row_count() + 1).max(first_data_row);
    sheet.write_row(row, seed);
    debug!(sheet = %sheet.name(), key = %key, row, "appended new record row");
    Located::Created(row)
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # helio-core: Spreadsheet-as-Database Engine for Helio CRM
//!
//! Every record of the business (clients, stock, leads, proposals) lives in a
//! workbook. This crate treats a workbook as a small database: it knows each
//! tab's column layout, finds and upserts rows by composite key, grows the
//! per-day stock columns and keeps derived stock cells consistent.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Helio CRM Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    helio-cli                                    │   │
//! │  │    stock-in, stock-out, leads, proposals, dashboard, ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              helio-store (I/O layer)                            │   │
//! │  │   store adapters, xlsx codec, orchestrator, retry protocol     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ &mut Workbook                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ helio-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │ document │ │  schema  │ │ locator  │ │ date_blocks      │  │   │
//! │  │   │ Workbook │ │ FieldDef │ │RecordKey │ │ aggregate        │  │   │
//! │  │   │ Sheet    │ │SheetKind │ │ upsert   │ │ (stock columns)  │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   stock · clients · leads · proposals · timeline · credentials │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO NETWORK • PURE FUNCTIONS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`document`] - Workbook / Sheet / Cell model with merges and styles
//! - [`schema`] - Column layout of every sheet kind
//! - [`locator`] - Composite-key row lookup and upsert
//! - [`dates`] - Month lengths and date formats
//! - [`date_blocks`] - The In/Out/Remarks column blocks of a stock sheet
//! - [`aggregate`] - Current stock, minimum stock and low-stock highlight
//! - [`stock`], [`clients`], [`leads`], [`proposals`], [`timeline`],
//!   [`credentials`], [`notes`] - Business mutations and reports per sheet kind
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use helio_core::{stock, StockMovement, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
//! let movement = StockMovement::stock_in(date, "Panel 540W", "INV-7", 50.0);
//!
//! stock::ensure_month_sheets(&mut workbook, date).unwrap();
//! stock::append_journal_entry(&mut workbook, &movement).unwrap();
//! let columns = stock::locate_date_block(&workbook, date).unwrap().unwrap();
//! let levels = stock::apply_movement(&mut workbook, &movement, columns).unwrap();
//!
//! assert_eq!(levels.current, 50.0);
//! assert!(!levels.alert);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod clients;
pub mod credentials;
pub mod date_blocks;
pub mod dates;
pub mod document;
pub mod error;
pub mod leads;
pub mod locator;
pub mod notes;
pub mod proposals;
pub mod schema;
pub mod stock;
pub mod timeline;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregate::StockLevels;
pub use date_blocks::DateColumns;
pub use document::{Cell, CellStyle, CellValue, MergeRange, Row, Sheet, Workbook};
pub use error::{CoreError, CoreResult, ValidationError};
pub use locator::{Located, Normalizer, RecordKey};
pub use schema::{FieldDef, SheetKind, SheetSchema, ValueKind};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Label of the "payment outstanding" marker in payment reports.
pub const DUE_LABEL: &str = "Due";

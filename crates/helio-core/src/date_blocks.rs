//! # Date-Block Manager
//!
//! A stock master sheet carries one 3-column block per calendar day, to the
//! right of the four fixed columns.
//!
//! ## Layout
//! ```text
//!       A          B           C           D      E    F     G        H ...
//!   ┌──────────┬─────────┬───────────┬─────────┬──────────────────────┬────
//! 1 │          │ Opening │  Current  │   Min   │      01-03-2024      │ 02-
//!   │ Material │  Stock  │   Stock   │  Stock  ├──────┬──────┬────────┼────
//! 2 │          │         │           │         │  In  │ Out  │Remarks │ In
//!   ├──────────┼─────────┼───────────┼─────────┼──────┼──────┼────────┼────
//! 3 │ Panel    │   50    │    35     │  5.00   │  10  │  25  │        │
//! ```
//!
//! Headers A-D are merged over rows 1-2. Each day header is merged over its
//! three columns in row 1. Missing days are appended on the next block
//! boundary, so block columns always sit at `5 + 3k`.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dates::{format_block_date, month_days, parse_block_date};
use crate::document::{CellStyle, Sheet};
use crate::error::CoreResult;
use crate::schema::stock::{BLOCK_WIDTH, FIELDS, FIRST_DATE_COLUMN};

pub const HEADER_FILL: &str = "FFD9D9D9";
pub const IN_FILL: &str = "FFE2F0D9";
pub const OUT_FILL: &str = "FFF9CB9C";
pub const REMARKS_FILL: &str = HEADER_FILL;

/// The three columns of one day's block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateColumns {
    pub in_col: u32,
    pub out_col: u32,
    pub remarks_col: u32,
}

impl DateColumns {
    pub fn starting_at(col: u32) -> Self {
        DateColumns {
            in_col: col,
            out_col: col + 1,
            remarks_col: col + 2,
        }
    }
}

// =============================================================================
// Layout
// =============================================================================

/// Lays out a fresh stock master: fixed headers plus every day of the month.
pub fn setup_stock_sheet(sheet: &mut Sheet, month_of: NaiveDate) -> CoreResult<()> {
    for field in FIELDS {
        sheet.merge_cells(1, field.column, 2, field.column)?;
        sheet.set_value(1, field.column, field.header);
        sheet.set_style(1, field.column, CellStyle::header(Some(HEADER_FILL)));
        sheet.set_style(2, field.column, CellStyle::header(Some(HEADER_FILL)));
    }
    materialize_month(sheet, month_of)?;
    Ok(())
}

/// Writes one block per day of `month_of`'s month, starting at column 5.
pub fn materialize_month(sheet: &mut Sheet, month_of: NaiveDate) -> CoreResult<usize> {
    let days = month_days(month_of)?;
    for (i, day) in days.iter().enumerate() {
        write_block(sheet, FIRST_DATE_COLUMN + i as u32 * BLOCK_WIDTH, *day)?;
    }
    Ok(days.len())
}

fn write_block(sheet: &mut Sheet, col: u32, date: NaiveDate) -> CoreResult<()> {
    sheet.merge_cells(1, col, 1, col + BLOCK_WIDTH - 1)?;
    sheet.set_value(1, col, format_block_date(date));
    sheet.set_style(1, col, CellStyle::header(None));

    let labels = [("In", IN_FILL), ("Out", OUT_FILL), ("Remarks", REMARKS_FILL)];
    for (offset, (label, fill)) in labels.iter().enumerate() {
        let c = col + offset as u32;
        sheet.set_value(2, c, *label);
        sheet.set_style(2, c, CellStyle::header(Some(fill)));
    }
    Ok(())
}

// =============================================================================
// Lookup
// =============================================================================

/// `(first column, date)` of every block whose header parses as a date.
pub fn block_dates(sheet: &Sheet) -> Vec<(u32, NaiveDate)> {
    let last = sheet.column_count();
    (FIRST_DATE_COLUMN..=last)
        .step_by(BLOCK_WIDTH as usize)
        .filter_map(|col| parse_block_date(&sheet.text(1, col)).map(|d| (col, d)))
        .collect()
}

/// Locates the block for `date`. `None` means the block has to be created.
pub fn find_date_columns(sheet: &Sheet, date: NaiveDate) -> Option<DateColumns> {
    block_dates(sheet)
        .into_iter()
        .find(|(_, d)| *d == date)
        .map(|(col, _)| DateColumns::starting_at(col))
}

/// First column of the next free block boundary.
pub fn next_block_column(sheet: &Sheet) -> u32 {
    let used = sheet.column_count().saturating_sub(FIRST_DATE_COLUMN - 1);
    FIRST_DATE_COLUMN + used.div_ceil(BLOCK_WIDTH) * BLOCK_WIDTH
}

/// Appends a block for every day of `month_of`'s month that has none.
///
/// Idempotent: a second call on the same sheet adds nothing.
pub fn create_missing_dates(sheet: &mut Sheet, month_of: NaiveDate) -> CoreResult<Vec<NaiveDate>> {
    let existing: HashSet<NaiveDate> = block_dates(sheet).into_iter().map(|(_, d)| d).collect();
    let mut created = Vec::new();

    for day in month_days(month_of)? {
        if existing.contains(&day) {
            continue;
        }
        let col = next_block_column(sheet);
        write_block(sheet, col, day)?;
        created.push(day);
    }

    if !created.is_empty() {
        info!(
            sheet = %sheet.name(),
            count = created.len(),
            "backfilled missing date blocks"
        );
    }
    Ok(created)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MergeRange;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_setup_lays_out_full_month() {
        let mut sheet = Sheet::new("Stock 02");
        setup_stock_sheet(&mut sheet, date(2024, 2, 10)).unwrap();

        assert_eq!(sheet.text(1, 1), "Material");
        assert!(sheet.merges().contains(&MergeRange::new(1, 1, 2, 1)));
        assert_eq!(block_dates(&sheet).len(), 29);
        assert_eq!(sheet.column_count(), 4 + 29 * 3);

        assert_eq!(sheet.text(1, 5), "01-02-2024");
        assert!(sheet.merges().contains(&MergeRange::new(1, 5, 1, 7)));
        assert_eq!(sheet.row(2).texts(7)[4..], ["In", "Out", "Remarks"]);
        assert_eq!(sheet.style(2, 6).fill.as_deref(), Some(OUT_FILL));
        assert!(sheet.style(1, 5).bold);
    }

    #[test]
    fn test_find_date_columns() {
        let mut sheet = Sheet::new("Stock 03");
        setup_stock_sheet(&mut sheet, date(2024, 3, 1)).unwrap();
        let cols = find_date_columns(&sheet, date(2024, 3, 2)).unwrap();
        assert_eq!(cols, DateColumns::starting_at(8));
        assert_eq!(cols.remarks_col, 10);
        assert!(find_date_columns(&sheet, date(2024, 4, 1)).is_none());
    }

    #[test]
    fn test_backfill_only_missing_days() {
        let mut sheet = Sheet::new("Stock 03");
        setup_stock_sheet(&mut sheet, date(2024, 3, 1)).unwrap();

        // wipe the header of 15-03 so the day goes missing
        let col = find_date_columns(&sheet, date(2024, 3, 15)).unwrap().in_col;
        sheet.set_value(1, col, "");

        let created = create_missing_dates(&mut sheet, date(2024, 3, 1)).unwrap();
        assert_eq!(created, vec![date(2024, 3, 15)]);
        let cols = find_date_columns(&sheet, date(2024, 3, 15)).unwrap();
        assert_eq!(cols.in_col, 5 + 31 * 3);

        assert!(create_missing_dates(&mut sheet, date(2024, 3, 1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_next_block_column_aligns_to_stride() {
        let mut sheet = Sheet::new("Stock 03");
        assert_eq!(next_block_column(&sheet), 5);
        sheet.set_value(3, 6, 1.0);
        assert_eq!(next_block_column(&sheet), 8);
    }

    #[test]
    fn test_backfill_on_bare_sheet() {
        let mut sheet = Sheet::new("Stock 04");
        let created = create_missing_dates(&mut sheet, date(2024, 4, 9)).unwrap();
        assert_eq!(created.len(), 30);
        assert_eq!(find_date_columns(&sheet, date(2024, 4, 30)).unwrap().in_col, 5 + 29 * 3);
    }
}

//! # Stock Aggregation
//!
//! Recomputes the derived columns of a material row after any movement:
//!
//! ```text
//! current = opening + Σ In − Σ Out        (every date-block on the row)
//! minimum = round2(opening × 0.10)
//! alert   = current ≤ minimum             (red fill on Material and Min)
//! ```
//!
//! The three steps only run together through [`refresh_derived`]; a row
//! whose current stock changed but whose highlight did not would show a stale
//! alert.
//!
//! Cell contents are coerced leniently: blanks count as 0, text is read up
//! to its first non-numeric character, anything else is 0 with a warning.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::{CellValue, Sheet};
use crate::schema::stock::{BLOCK_WIDTH, CURRENT, FIRST_DATE_COLUMN, MATERIAL, MINIMUM, OPENING};

/// Fill applied to a row at or below its minimum stock.
pub const ALERT_FILL: &str = "FFFF0000";

pub const MIN_STOCK_RATIO: f64 = 0.10;

/// Derived figures of one material row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevels {
    pub material: String,
    pub opening: f64,
    pub total_in: f64,
    pub total_out: f64,
    pub current: f64,
    pub minimum: f64,
    pub alert: bool,
}

// =============================================================================
// Coercion
// =============================================================================

/// Rounds half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Leading numeric prefix of `text` (`"12kg"` → 12), if any.
fn parse_numeric_prefix(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    text[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric value of a cell for aggregation purposes.
pub fn coerce_number(value: &CellValue) -> f64 {
    match value {
        CellValue::Empty => 0.0,
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) if s.trim().is_empty() => 0.0,
        CellValue::Text(s) => parse_numeric_prefix(s).unwrap_or_else(|| {
            warn!(value = %s, "non-numeric cell counted as 0");
            0.0
        }),
        other => {
            warn!(value = %other, "non-numeric cell counted as 0");
            0.0
        }
    }
}

// =============================================================================
// Derived Columns
// =============================================================================

fn movement_totals(sheet: &Sheet, row: u32) -> (f64, f64) {
    let last = sheet.column_count();
    let mut total_in = 0.0;
    let mut total_out = 0.0;
    for col in (FIRST_DATE_COLUMN..=last).step_by(BLOCK_WIDTH as usize) {
        total_in += coerce_number(sheet.value(row, col));
        total_out += coerce_number(sheet.value(row, col + 1));
    }
    (total_in, total_out)
}

fn recompute_current_stock(sheet: &mut Sheet, row: u32) -> f64 {
    let opening = coerce_number(sheet.value(row, OPENING.column));
    let (total_in, total_out) = movement_totals(sheet, row);
    let current = opening + total_in - total_out;
    sheet.set_value(row, CURRENT.column, current);
    current
}

fn recompute_min_stock(sheet: &mut Sheet, row: u32) -> f64 {
    let opening = coerce_number(sheet.value(row, OPENING.column));
    let minimum = round2(opening * MIN_STOCK_RATIO);
    sheet.set_value(row, MINIMUM.column, minimum);
    minimum
}

fn apply_highlight(sheet: &mut Sheet, row: u32, current: f64, minimum: f64) -> bool {
    let alert = current <= minimum;
    let fill = alert.then_some(ALERT_FILL);
    sheet.set_fill(row, MATERIAL.column, fill);
    sheet.set_fill(row, MINIMUM.column, fill);
    alert
}

/// Recomputes current stock, minimum stock and the alert highlight of `row`.
pub fn refresh_derived(sheet: &mut Sheet, row: u32) -> StockLevels {
    let current = recompute_current_stock(sheet, row);
    let minimum = recompute_min_stock(sheet, row);
    let alert = apply_highlight(sheet, row, current, minimum);
    let (total_in, total_out) = movement_totals(sheet, row);

    StockLevels {
        material: sheet.text(row, MATERIAL.column),
        opening: coerce_number(sheet.value(row, OPENING.column)),
        total_in,
        total_out,
        current,
        minimum,
        alert,
    }
}

/// Reads the stored figures of `row` without touching the sheet.
pub fn read_levels(sheet: &Sheet, row: u32) -> StockLevels {
    let (total_in, total_out) = movement_totals(sheet, row);
    let current = coerce_number(sheet.value(row, CURRENT.column));
    let minimum = coerce_number(sheet.value(row, MINIMUM.column));
    StockLevels {
        material: sheet.text(row, MATERIAL.column),
        opening: coerce_number(sheet.value(row, OPENING.column)),
        total_in,
        total_out,
        current,
        minimum,
        alert: current <= minimum,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_blocks::setup_stock_sheet;
    use chrono::NaiveDate;

    fn march() -> Sheet {
        let mut sheet = Sheet::new("Stock 03");
        setup_stock_sheet(&mut sheet, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).unwrap();
        sheet.write_row(3, ["Panel"]);
        sheet
    }

    #[test]
    fn test_current_stock_sums_every_block() {
        let mut sheet = march();
        sheet.set_value(3, OPENING.column, 50.0);
        sheet.set_value(3, 5, 10.0); // 01-03 In
        sheet.set_value(3, 6, 25.0); // 01-03 Out
        sheet.set_value(3, 8, "5"); // 02-03 In as text
        sheet.set_value(3, 9, ""); // blank Out

        let levels = refresh_derived(&mut sheet, 3);
        assert_eq!(levels.total_in, 15.0);
        assert_eq!(levels.total_out, 25.0);
        assert_eq!(levels.current, 40.0);
        assert_eq!(sheet.value(3, CURRENT.column), &CellValue::Number(40.0));
        assert_eq!(levels.minimum, 5.0);
        assert!(!levels.alert);
        assert!(sheet.style(3, MATERIAL.column).fill.is_none());
    }

    #[test]
    fn test_alert_at_minimum() {
        let mut sheet = march();
        sheet.set_value(3, OPENING.column, 50.0);
        sheet.set_value(3, 6, 45.0);

        let levels = refresh_derived(&mut sheet, 3);
        assert_eq!(levels.current, 5.0);
        assert_eq!(levels.minimum, 5.0);
        assert!(levels.alert);
        assert_eq!(sheet.style(3, MATERIAL.column).fill.as_deref(), Some(ALERT_FILL));
        assert_eq!(sheet.style(3, MINIMUM.column).fill.as_deref(), Some(ALERT_FILL));

        // restocking clears the highlight
        sheet.set_value(3, 8, 20.0);
        let levels = refresh_derived(&mut sheet, 3);
        assert!(!levels.alert);
        assert!(sheet.style(3, MATERIAL.column).fill.is_none());
    }

    #[test]
    fn test_min_stock_rounding() {
        let mut sheet = march();
        sheet.set_value(3, OPENING.column, 33.33);
        assert_eq!(refresh_derived(&mut sheet, 3).minimum, 3.33);
        sheet.set_value(3, OPENING.column, 0.25);
        assert_eq!(refresh_derived(&mut sheet, 3).minimum, 0.03);
    }

    #[test]
    fn test_lenient_coercion() {
        assert_eq!(coerce_number(&CellValue::Empty), 0.0);
        assert_eq!(coerce_number(&CellValue::text("12kg")), 12.0);
        assert_eq!(coerce_number(&CellValue::text("-3.5 units")), -3.5);
        assert_eq!(coerce_number(&CellValue::text("abc")), 0.0);
        assert_eq!(coerce_number(&CellValue::Number(f64::NAN)), 0.0);
    }

    #[test]
    fn test_zero_opening_is_always_alert() {
        let mut sheet = march();
        let levels = refresh_derived(&mut sheet, 3);
        assert_eq!(levels.current, 0.0);
        assert!(levels.alert);
    }

    #[test]
    fn test_read_levels_matches_refresh() {
        let mut sheet = march();
        sheet.set_value(3, OPENING.column, 20.0);
        sheet.set_value(3, 5, 4.0);
        let refreshed = refresh_derived(&mut sheet, 3);
        assert_eq!(read_levels(&sheet, 3), refreshed);
    }
}

//! # Stock Ledger
//!
//! Pure mutations and reports over the stock workbook. One month is three
//! tabs: the master (`Stock MM`) with a row per material and a date-block per
//! day, plus the append-only journals `Stock In MM` and `Stock Out MM`.
//!
//! ## Movement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StockMovement { 01-03-2024, "Panel", Out, 25 }                         │
//! │       │                                                                 │
//! │       ├── ensure_month_sheets()    Stock 03 / Stock In 03 / Out 03     │
//! │       ├── locate_date_block()      01-03-2024 → E/F/G                   │
//! │       │     (missing → backfill + persist + reload, done by caller)     │
//! │       ├── append_journal_entry()   Stock Out 03: [date, Panel, 25, ..] │
//! │       └── apply_movement()         F{row} += 25, refresh_derived()      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::aggregate::{coerce_number, read_levels, refresh_derived, StockLevels};
use crate::date_blocks::{create_missing_dates, find_date_columns, setup_stock_sheet, DateColumns};
use crate::dates::{format_block_date, previous_month};
use crate::document::{CellValue, Sheet, Workbook};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::locator::{find_or_create, find_row, Normalizer, RecordKey};
use crate::schema::stock::{CURRENT, MATERIAL, OPENING};
use crate::schema::{SheetKind, STOCK_MASTER};
use crate::types::{DailyMovement, StockDirection, StockMovement};
use crate::validation::{validate_material, validate_non_negative, validate_quantity, validate_required};

// =============================================================================
// Naming & Keys
// =============================================================================

pub fn master_sheet_name(month: u32) -> String {
    SheetKind::StockMaster.sheet_name(month)
}

pub fn journal_sheet_name(direction: StockDirection, month: u32) -> String {
    match direction {
        StockDirection::In => SheetKind::StockInJournal.sheet_name(month),
        StockDirection::Out => SheetKind::StockOutJournal.sheet_name(month),
    }
}

/// Materials are matched case-insensitively on column A.
pub fn material_key(material: &str) -> RecordKey {
    RecordKey::new().with(MATERIAL.column, material, Normalizer::Text)
}

pub fn validate_movement(movement: &StockMovement) -> CoreResult<()> {
    validate_material(&movement.material)?;
    validate_quantity(movement.quantity)?;
    if movement.direction == StockDirection::In {
        validate_required("invoice", movement.invoice.as_deref().unwrap_or(""))?;
    }
    Ok(())
}

// =============================================================================
// Month Sheets
// =============================================================================

/// `(material, current stock)` of the previous month's master, if it exists.
fn carry_forward(workbook: &Workbook, date: NaiveDate) -> Vec<(String, f64)> {
    let Some(previous) = previous_month(date) else {
        return Vec::new();
    };
    let Some(sheet) = workbook.get_sheet(&master_sheet_name(previous.month())) else {
        return Vec::new();
    };
    sheet
        .rows_from(STOCK_MASTER.first_data_row())
        .filter(|row| !row.value(MATERIAL.column).is_empty())
        .map(|row| {
            (
                row.text(MATERIAL.column).trim().to_string(),
                coerce_number(row.value(CURRENT.column)),
            )
        })
        .collect()
}

/// Creates the master and both journals for `date`'s month when missing.
///
/// A new master is laid out with every day of the month and seeded with
/// the previous month's materials, their current stock becoming the new
/// opening stock. Returns true when the master was created.
pub fn ensure_month_sheets(workbook: &mut Workbook, date: NaiveDate) -> CoreResult<bool> {
    let month = date.month();
    let master = master_sheet_name(month);
    let created = !workbook.has_sheet(&master);

    if created {
        let carried = carry_forward(workbook, date);
        workbook.ensure_sheet(&master, |sheet| {
            setup_stock_sheet(sheet, date)?;
            for (material, opening) in &carried {
                let row = sheet.append_row([material.as_str()]);
                sheet.set_value(row, OPENING.column, *opening);
                refresh_derived(sheet, row);
            }
            Ok(())
        })?;
        info!(
            sheet = %master,
            carried = carried.len(),
            "created stock master sheet"
        );
    }

    for kind in [SheetKind::StockInJournal, SheetKind::StockOutJournal] {
        let schema = kind.schema();
        workbook.ensure_sheet(&kind.sheet_name(month), |sheet| {
            schema.write_headers(sheet);
            Ok(())
        })?;
    }
    Ok(created)
}

// =============================================================================
// Movements
// =============================================================================

/// Appends the movement to its month journal. Returns the journal row.
pub fn append_journal_entry(workbook: &mut Workbook, movement: &StockMovement) -> CoreResult<u32> {
    let name = journal_sheet_name(movement.direction, movement.date.month());
    let sheet = workbook.require_sheet_mut(&name)?;

    let values: Vec<CellValue> = match movement.direction {
        StockDirection::In => vec![
            movement.date.into(),
            movement.material.as_str().into(),
            movement.invoice.as_deref().unwrap_or("").into(),
            movement.quantity.into(),
        ],
        StockDirection::Out => vec![
            movement.date.into(),
            movement.material.as_str().into(),
            movement.quantity.into(),
            movement.remarks.as_deref().unwrap_or("").into(),
        ],
    };
    let row = sheet.append_row(values);
    debug!(sheet = %name, row, "journal entry appended");
    Ok(row)
}

pub fn locate_date_block(workbook: &Workbook, date: NaiveDate) -> CoreResult<Option<DateColumns>> {
    let sheet = workbook.require_sheet(&master_sheet_name(date.month()))?;
    Ok(find_date_columns(sheet, date))
}

/// Adds every missing day block to `date`'s master sheet.
pub fn backfill_date_blocks(workbook: &mut Workbook, date: NaiveDate) -> CoreResult<usize> {
    let sheet = workbook.require_sheet_mut(&master_sheet_name(date.month()))?;
    Ok(create_missing_dates(sheet, date)?.len())
}

fn material_row(sheet: &mut Sheet, material: &str) -> u32 {
    find_or_create(
        sheet,
        STOCK_MASTER.first_data_row(),
        &material_key(material),
        [material.trim()],
    )
    .row()
}

/// Adds the quantity to the day's In or Out cell and refreshes the row.
///
/// Stock-out remarks are appended to the day's Remarks cell.
pub fn apply_movement(
    workbook: &mut Workbook,
    movement: &StockMovement,
    cols: DateColumns,
) -> CoreResult<StockLevels> {
    let sheet = workbook.require_sheet_mut(&master_sheet_name(movement.date.month()))?;
    let row = material_row(sheet, &movement.material);

    let col = match movement.direction {
        StockDirection::In => cols.in_col,
        StockDirection::Out => cols.out_col,
    };
    let existing = coerce_number(sheet.value(row, col));
    sheet.set_value(row, col, existing + movement.quantity);

    if let Some(remarks) = &movement.remarks {
        let previous = sheet.text(row, cols.remarks_col);
        let combined = if previous.trim().is_empty() {
            remarks.clone()
        } else {
            format!("{}; {}", previous, remarks)
        };
        sheet.set_value(row, cols.remarks_col, combined);
    }

    Ok(refresh_derived(sheet, row))
}

/// Sets a material's opening stock for `date`'s month and refreshes it.
pub fn set_opening_stock(
    workbook: &mut Workbook,
    date: NaiveDate,
    material: &str,
    opening: f64,
) -> CoreResult<StockLevels> {
    validate_material(material)?;
    validate_non_negative("opening stock", opening)?;
    ensure_month_sheets(workbook, date)?;

    let sheet = workbook.require_sheet_mut(&master_sheet_name(date.month()))?;
    let row = material_row(sheet, material);
    sheet.set_value(row, OPENING.column, opening);
    Ok(refresh_derived(sheet, row))
}

// =============================================================================
// Reports
// =============================================================================

fn month_master(workbook: &Workbook, month: u32) -> CoreResult<&Sheet> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        }
        .into());
    }
    workbook.require_sheet(&master_sheet_name(month))
}

fn material_rows(sheet: &Sheet) -> impl Iterator<Item = u32> + '_ {
    sheet
        .rows_from(STOCK_MASTER.first_data_row())
        .filter(|row| !row.value(MATERIAL.column).is_empty())
        .map(|row| row.index())
}

/// Stored levels of one material in `month`.
pub fn current_stock(workbook: &Workbook, month: u32, material: &str) -> CoreResult<StockLevels> {
    let sheet = month_master(workbook, month)?;
    let row = find_row(sheet, STOCK_MASTER.first_data_row(), &material_key(material))
        .ok_or_else(|| CoreError::record_not_found(sheet.name(), material))?;
    Ok(read_levels(sheet, row))
}

/// Every material of `month` with its levels.
pub fn stock_summary(workbook: &Workbook, month: u32) -> CoreResult<Vec<StockLevels>> {
    let sheet = month_master(workbook, month)?;
    Ok(material_rows(sheet).map(|row| read_levels(sheet, row)).collect())
}

/// Materials at or below their minimum stock.
pub fn low_stock(workbook: &Workbook, month: u32) -> CoreResult<Vec<StockLevels>> {
    Ok(stock_summary(workbook, month)?
        .into_iter()
        .filter(|levels| levels.alert)
        .collect())
}

/// Materials that moved on `date`.
pub fn stock_on_date(workbook: &Workbook, date: NaiveDate) -> CoreResult<Vec<DailyMovement>> {
    let sheet = month_master(workbook, date.month())?;
    let cols = find_date_columns(sheet, date)
        .ok_or_else(|| CoreError::record_not_found(sheet.name(), format_block_date(date)))?;

    Ok(material_rows(sheet)
        .filter_map(|row| {
            let stock_in = coerce_number(sheet.value(row, cols.in_col));
            let stock_out = coerce_number(sheet.value(row, cols.out_col));
            (stock_in != 0.0 || stock_out != 0.0).then(|| DailyMovement {
                material: sheet.text(row, MATERIAL.column),
                stock_in,
                stock_out,
                remarks: sheet.text(row, cols.remarks_col),
            })
        })
        .collect())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ALERT_FILL;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(workbook: &mut Workbook, movement: &StockMovement) -> StockLevels {
        ensure_month_sheets(workbook, movement.date).unwrap();
        append_journal_entry(workbook, movement).unwrap();
        let cols = locate_date_block(workbook, movement.date).unwrap().unwrap();
        apply_movement(workbook, movement, cols).unwrap()
    }

    #[test]
    fn test_ensure_month_sheets_creates_three_tabs() {
        let mut workbook = Workbook::new();
        assert!(ensure_month_sheets(&mut workbook, date(2024, 2, 10)).unwrap());
        assert_eq!(
            workbook.sheet_names(),
            vec!["Stock 02", "Stock In 02", "Stock Out 02"]
        );
        assert!(!ensure_month_sheets(&mut workbook, date(2024, 2, 11)).unwrap());
    }

    #[test]
    fn test_stock_in_then_out() {
        let mut workbook = Workbook::new();
        set_opening_stock(&mut workbook, date(2024, 2, 1), "Panel", 40.0).unwrap();

        record(&mut workbook, &StockMovement::stock_in(date(2024, 2, 10), "panel", "INV-7", 10.0));
        let levels = record(
            &mut workbook,
            &StockMovement::stock_out(date(2024, 2, 12), "PANEL", 3.0, Some("site A")),
        );

        assert_eq!(levels.material, "Panel");
        assert_eq!(levels.current, 47.0);
        assert_eq!(levels.minimum, 4.0);
        assert!(!levels.alert);

        let journal = workbook.get_sheet("Stock In 02").unwrap();
        assert_eq!(journal.value(2, 1), &CellValue::Date(date(2024, 2, 10)));
        assert_eq!(journal.text(2, 3), "INV-7");

        let out = workbook.get_sheet("Stock Out 02").unwrap();
        assert_eq!(out.row(2).texts(4)[2..], ["3", "site A"]);

        let moved = stock_on_date(&workbook, date(2024, 2, 12)).unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].stock_out, 3.0);
        assert_eq!(moved[0].remarks, "site A");
    }

    #[test]
    fn test_new_month_carries_current_stock() {
        let mut workbook = Workbook::new();
        set_opening_stock(&mut workbook, date(2024, 2, 1), "Panel", 40.0).unwrap();
        record(&mut workbook, &StockMovement::stock_in(date(2024, 2, 10), "Panel", "INV-1", 10.0));

        let levels = record(
            &mut workbook,
            &StockMovement::stock_out(date(2024, 3, 1), "Panel", 45.0, None),
        );
        assert_eq!(levels.opening, 50.0);
        assert_eq!(levels.current, 5.0);
        assert_eq!(levels.minimum, 5.0);
        assert!(levels.alert);

        let sheet = workbook.get_sheet("Stock 03").unwrap();
        assert_eq!(sheet.style(3, MATERIAL.column).fill.as_deref(), Some(ALERT_FILL));
        assert_eq!(low_stock(&workbook, 3).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_block_is_reported_then_backfilled() {
        let mut workbook = Workbook::new();
        ensure_month_sheets(&mut workbook, date(2024, 3, 1)).unwrap();
        let sheet = workbook.get_sheet_mut("Stock 03").unwrap();
        let col = find_date_columns(sheet, date(2024, 3, 15)).unwrap().in_col;
        sheet.set_value(1, col, "");

        assert_eq!(locate_date_block(&workbook, date(2024, 3, 15)).unwrap(), None);
        assert_eq!(backfill_date_blocks(&mut workbook, date(2024, 3, 15)).unwrap(), 1);
        assert!(locate_date_block(&workbook, date(2024, 3, 15)).unwrap().is_some());
    }

    #[test]
    fn test_current_stock_lookup() {
        let mut workbook = Workbook::new();
        set_opening_stock(&mut workbook, date(2024, 4, 1), "Inverter", 12.0).unwrap();
        assert_eq!(current_stock(&workbook, 4, " inverter ").unwrap().current, 12.0);
        assert!(matches!(
            current_stock(&workbook, 4, "Cable"),
            Err(CoreError::RecordNotFound { .. })
        ));
        assert!(matches!(
            current_stock(&workbook, 5, "Inverter"),
            Err(CoreError::SheetNotFound(_))
        ));
        assert!(current_stock(&workbook, 13, "Inverter").is_err());
    }

    #[test]
    fn test_validate_movement() {
        let ok = StockMovement::stock_in(date(2024, 4, 1), "Cable", "INV-2", 5.0);
        assert!(validate_movement(&ok).is_ok());
        let no_invoice = StockMovement::stock_in(date(2024, 4, 1), "Cable", " ", 5.0);
        assert!(validate_movement(&no_invoice).is_err());
        let zero = StockMovement::stock_out(date(2024, 4, 1), "Cable", 0.0, None);
        assert!(validate_movement(&zero).is_err());
    }
}

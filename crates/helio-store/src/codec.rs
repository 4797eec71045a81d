//! # Document Codec
//!
//! Converts workbook bytes to the in-memory [`Workbook`] and back.
//!
//! ## What Survives a Round Trip
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  .xlsx (umya-spreadsheet)           Workbook (helio-core)               │
//! │  ─────────────────────────          ─────────────────────               │
//! │  sheet order + names          ◄──►  Vec<Sheet>                          │
//! │  string cell                  ◄──►  CellValue::Text                     │
//! │  numeric cell                 ◄──►  CellValue::Number                   │
//! │  numeric + date format code   ◄──►  CellValue::Date (serial, 1900 sys)  │
//! │  solid fill ARGB              ◄──►  CellStyle::fill                     │
//! │  bold font                    ◄──►  CellStyle::bold                     │
//! │  centered alignment           ◄──►  CellStyle::centered                 │
//! │  merged ranges "A1:C1"        ◄──►  MergeRange                          │
//! │                                                                         │
//! │  Everything else (formulas, borders, widths, comments) is dropped.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Cursor;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};
use umya_spreadsheet::{HorizontalAlignmentValues, VerticalAlignmentValues};

use helio_core::{Cell, CellStyle, CellValue, MergeRange, Sheet, Workbook};

use crate::error::{StoreError, StoreResult};

/// Number format written on date cells.
pub const DATE_FORMAT_CODE: &str = "yyyy-mm-dd";

/// `NaiveDate::num_days_from_ce` of 1899-12-30, serial day 0.
const SERIAL_EPOCH_DAYS_FROM_CE: i32 = 693_594;

/// Parses and serializes whole workbook documents.
pub trait DocumentCodec: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> StoreResult<Workbook>;

    fn serialize(&self, workbook: &Workbook) -> StoreResult<Vec<u8>>;
}

// =============================================================================
// Date Serials
// =============================================================================

pub fn date_to_serial(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - SERIAL_EPOCH_DAYS_FROM_CE)
}

/// Whole-day part of a serial; the time fraction is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(serial.floor() as i32 + SERIAL_EPOCH_DAYS_FROM_CE)
}

/// True for format codes that display a calendar date (`yyyy-mm-dd`,
/// `dd/mm/yy`, `d-mmm`...). Only the first (positive) section counts, and
/// quoted literals, escaped characters and `[...]` colour or locale tags are
/// skipped, so `0;[Red]-0` stays numeric.
pub fn is_date_format(code: &str) -> bool {
    let mut chars = code.chars();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        if in_quotes {
            in_quotes = c != '"';
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ';' => return false,
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
            }
            'd' | 'D' | 'y' | 'Y' => return true,
            _ => {}
        }
    }
    false
}

// =============================================================================
// xlsx Codec
// =============================================================================

/// `.xlsx` codec backed by umya-spreadsheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxCodec;

impl XlsxCodec {
    pub fn new() -> Self {
        XlsxCodec
    }

    fn read_cell(cell: &umya_spreadsheet::Cell) -> Cell {
        let style = cell.get_style();
        let is_date = style
            .get_number_format()
            .map(|format| is_date_format(format.get_format_code()))
            .unwrap_or(false);

        let value = match cell.get_value_number() {
            Some(n) if is_date => serial_to_date(n)
                .map(CellValue::Date)
                .unwrap_or(CellValue::Number(n)),
            Some(n) => CellValue::Number(n),
            None => CellValue::text(cell.get_value().to_string()),
        };

        let centered = style
            .get_alignment()
            .map(|a| *a.get_horizontal() == HorizontalAlignmentValues::Center)
            .unwrap_or(false);

        Cell {
            value,
            style: CellStyle {
                fill: style
                    .get_background_color()
                    .map(|color| color.get_argb().to_string())
                    .filter(|argb| !argb.is_empty()),
                bold: style.get_font().map(|f| *f.get_bold()).unwrap_or(false),
                centered,
            },
        }
    }

    fn read_sheet(ws: &umya_spreadsheet::Worksheet) -> Sheet {
        let mut sheet = Sheet::new(ws.get_name());

        for cell in ws.get_cell_collection() {
            let coordinate = cell.get_coordinate();
            let col = *coordinate.get_col_num();
            let row = *coordinate.get_row_num();
            sheet.put_cell(row, col, Self::read_cell(cell));
        }

        for range in ws.get_merge_cells() {
            let a1 = range.get_range();
            let merged = MergeRange::parse_a1(&a1)
                .and_then(|m| sheet.merge_cells(m.top, m.left, m.bottom, m.right));
            if let Err(e) = merged {
                warn!(sheet = %ws.get_name(), range = %a1, error = %e, "skipping unreadable merged range");
            }
        }

        sheet.mark_clean();
        sheet
    }

    fn write_sheet(ws: &mut umya_spreadsheet::Worksheet, sheet: &Sheet) {
        for (row, col, cell) in sheet.cells() {
            let target = ws.get_cell_mut((col, row));
            match &cell.value {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    target.set_value_string(s.as_str());
                }
                CellValue::Number(n) => {
                    target.set_value_number(*n);
                }
                CellValue::Date(d) => {
                    target.set_value_number(date_to_serial(*d));
                }
            }

            let is_date = matches!(cell.value, CellValue::Date(_));
            if cell.style.is_plain() && !is_date {
                continue;
            }

            let style = ws.get_style_mut((col, row));
            if is_date {
                style.get_number_format_mut().set_format_code(DATE_FORMAT_CODE);
            }
            if let Some(fill) = &cell.style.fill {
                style.set_background_color(fill.as_str());
            }
            if cell.style.bold {
                style.get_font_mut().set_bold(true);
            }
            if cell.style.centered {
                let alignment = style.get_alignment_mut();
                alignment.set_horizontal(HorizontalAlignmentValues::Center);
                alignment.set_vertical(VerticalAlignmentValues::Center);
            }
        }

        for merge in sheet.merges() {
            ws.add_merge_cells(merge.to_a1());
        }
    }
}

impl DocumentCodec for XlsxCodec {
    fn parse(&self, bytes: &[u8]) -> StoreResult<Workbook> {
        let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
            .map_err(|e| StoreError::DocumentFormat(e.to_string()))?;

        let mut workbook = Workbook::new();
        for ws in book.get_sheet_collection() {
            workbook.push_sheet(Self::read_sheet(ws))?;
        }
        workbook.mark_clean();

        debug!(sheets = workbook.sheets().len(), bytes = bytes.len(), "workbook parsed");
        Ok(workbook)
    }

    fn serialize(&self, workbook: &Workbook) -> StoreResult<Vec<u8>> {
        if workbook.sheets().is_empty() {
            return Err(StoreError::DocumentFormat(
                "a workbook needs at least one sheet".to_string(),
            ));
        }

        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        for sheet in workbook.sheets() {
            let ws = book
                .new_sheet(sheet.name())
                .map_err(|e| StoreError::DocumentFormat(format!("{}: {}", sheet.name(), e)))?;
            Self::write_sheet(ws, sheet);
        }

        let mut out = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out)
            .map_err(|e| StoreError::DocumentFormat(e.to_string()))?;

        let bytes = out.into_inner();
        debug!(sheets = workbook.sheets().len(), bytes = bytes.len(), "workbook serialized");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::date_blocks::{find_date_columns, setup_stock_sheet, IN_FILL};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_serials() {
        assert_eq!(date_to_serial(date(2024, 2, 29)), 45351.0);
        assert_eq!(serial_to_date(45351.75), Some(date(2024, 2, 29)));
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_date_format_detection() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format("dd/mm/yy"));
        assert!(!is_date_format("General"));
        assert!(!is_date_format("0.00"));
        assert!(!is_date_format("\"qty\" 0"));
        assert!(!is_date_format("0;[Red]-0"));
        assert!(!is_date_format("[Blue]#,##0.00"));
        assert!(!is_date_format("0 \\d\\a\\y\\s"));
        assert!(!is_date_format("0.00;[Red]\"day \"0"));
        assert!(is_date_format("[$-409]d-mmm-yy;@"));
    }

    #[test]
    fn test_red_negative_quantity_stays_numeric() {
        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        let ws = book.new_sheet("Stock 03").unwrap();
        ws.get_cell_mut((3, 3)).set_value_number(50.0);
        ws.get_style_mut((3, 3))
            .get_number_format_mut()
            .set_format_code("0;[Red]-0");
        let mut out = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out).unwrap();

        let parsed = XlsxCodec::new().parse(&out.into_inner()).unwrap();
        let sheet = parsed.get_sheet("Stock 03").unwrap();
        assert_eq!(sheet.value(3, 3), &CellValue::Number(50.0));
    }

    #[test]
    fn test_round_trip_keeps_values_styles_and_merges() {
        let mut workbook = Workbook::new();
        {
            let sheet = workbook.add_sheet("Stock 02").unwrap();
            setup_stock_sheet(sheet, date(2024, 2, 1)).unwrap();
            sheet.write_row(3, [CellValue::text("Panel 540W"), 0.0.into(), 50.0.into(), 0.0.into()]);
        }
        {
            let sheet = workbook.add_sheet("Stock In 02").unwrap();
            sheet.append_row([CellValue::text("Date"), "Material".into()]);
            sheet.append_row([CellValue::Date(date(2024, 2, 29)), "Panel 540W".into()]);
        }

        let codec = XlsxCodec::new();
        let bytes = codec.serialize(&workbook).unwrap();
        let parsed = codec.parse(&bytes).unwrap();

        assert_eq!(parsed.sheet_names(), vec!["Stock 02", "Stock In 02"]);
        assert!(!parsed.is_dirty());

        let stock = parsed.get_sheet("Stock 02").unwrap();
        let original = workbook.get_sheet("Stock 02").unwrap();
        assert_eq!(stock.row_count(), original.row_count());
        assert_eq!(stock.value(3, 3), &CellValue::Number(50.0));
        assert_eq!(stock.merges().len(), original.merges().len());

        let cols = find_date_columns(stock, date(2024, 2, 29)).unwrap();
        assert_eq!(cols.in_col, 5 + 28 * 3);
        assert_eq!(stock.style(2, cols.in_col).fill.as_deref(), Some(IN_FILL));
        assert!(stock.style(1, cols.in_col).bold);
        assert!(stock.style(1, cols.in_col).centered);

        let journal = parsed.get_sheet("Stock In 02").unwrap();
        assert_eq!(journal.value(2, 1), &CellValue::Date(date(2024, 2, 29)));
    }

    #[test]
    fn test_malformed_bytes() {
        let err = XlsxCodec::new().parse(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, StoreError::DocumentFormat(_)));
    }

    #[test]
    fn test_empty_workbook_cannot_be_serialized() {
        let err = XlsxCodec::new().serialize(&Workbook::new()).unwrap_err();
        assert!(matches!(err, StoreError::DocumentFormat(_)));
    }
}

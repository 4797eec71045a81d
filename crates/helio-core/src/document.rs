//! # Workbook Document Model
//!
//! The in-memory tree every operation works on: a [`Workbook`] owns ordered
//! [`Sheet`]s, a sheet owns sparse rows of [`Cell`]s plus its merged ranges.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Workbook                                                               │
//! │  ├── Sheet "Client Data"                                                │
//! │  │     rows: { 1 → {1: "Date", 2: "Name", ...}, 2 → {...}, ... }       │
//! │  │     merges: []                                                       │
//! │  └── Sheet "Stock 03"                                                   │
//! │        rows: { 1 → {1: "Material", 5: "01-03-2024", ...}, ... }        │
//! │        merges: [A1:A2, B1:B2, C1:C2, D1:D2, E1:G1, H1:J1, ...]          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows and columns are 1-based. Reading an address that was never written
//! yields [`CellValue::Empty`]; nothing is allocated until a value or a style
//! lands in the cell. Any mutation marks the owning sheet dirty so the
//! orchestrator knows whether a persist is needed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Cell Value
// =============================================================================

/// The value held by a single cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    /// Builds a text value, collapsing `""` to [`CellValue::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    /// True for empty cells and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Strict numeric view: numbers, or text that parses fully as a number.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl From<&String> for CellValue {
    fn from(value: &String) -> Self {
        CellValue::text(value.as_str())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

/// Renders a number the way a spreadsheet shows it: integers without `.0`.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// =============================================================================
// Cell Style
// =============================================================================

/// The subset of cell formatting the engine reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellStyle {
    /// Solid background fill as an ARGB hex string, e.g. `FFFF0000`.
    pub fill: Option<String>,
    pub bold: bool,
    /// Centered both horizontally and vertically.
    pub centered: bool,
}

impl CellStyle {
    pub fn is_plain(&self) -> bool {
        self.fill.is_none() && !self.bold && !self.centered
    }

    /// Bold, centered header style with the given fill.
    pub fn header(fill: Option<&str>) -> Self {
        CellStyle {
            fill: fill.map(str::to_string),
            bold: true,
            centered: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    fn is_vacant(&self) -> bool {
        self.value == CellValue::Empty && self.style.is_plain()
    }
}

// =============================================================================
// Addressing
// =============================================================================

/// Converts a 1-based column number to letters (`1 → A`, `28 → AB`).
pub fn column_letter(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parses an A1-style address into `(row, col)`.
pub fn parse_a1(address: &str) -> CoreResult<(u32, u32)> {
    let address = address.trim().replace('$', "");
    let split = address
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| CoreError::InvalidAddress(address.clone()))?;
    let (letters, digits) = address.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::InvalidAddress(address.clone()));
    }
    let col = letters
        .chars()
        .try_fold(0u32, |acc, c| {
            acc.checked_mul(26)?
                .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
        })
        .ok_or_else(|| CoreError::InvalidAddress(address.clone()))?;
    let row: u32 = digits
        .parse()
        .map_err(|_| CoreError::InvalidAddress(address.clone()))?;
    if row == 0 {
        return Err(CoreError::InvalidAddress(address));
    }
    Ok((row, col))
}

// =============================================================================
// Merge Range
// =============================================================================

/// A rectangular merged region, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl MergeRange {
    pub fn new(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        MergeRange {
            top: top.min(bottom),
            left: left.min(right),
            bottom: top.max(bottom),
            right: left.max(right),
        }
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.top..=self.bottom).contains(&row) && (self.left..=self.right).contains(&col)
    }

    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.top <= other.bottom
            && other.top <= self.bottom
            && self.left <= other.right
            && other.left <= self.right
    }

    /// `E1:G1` style rendering.
    pub fn to_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letter(self.left),
            self.top,
            column_letter(self.right),
            self.bottom
        )
    }

    pub fn parse_a1(range: &str) -> CoreResult<Self> {
        let (start, end) = range
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidAddress(range.to_string()))?;
        let (top, left) = parse_a1(start)?;
        let (bottom, right) = parse_a1(end)?;
        Ok(MergeRange::new(top, left, bottom, right))
    }
}

// =============================================================================
// Row View
// =============================================================================

static EMPTY_VALUE: CellValue = CellValue::Empty;

/// Read-only view of one row. Cells are addressed from column 1.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    index: u32,
    cells: Option<&'a BTreeMap<u32, Cell>>,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn cell(&self, col: u32) -> Option<&'a Cell> {
        self.cells.and_then(|cells| cells.get(&col))
    }

    pub fn value(&self, col: u32) -> &'a CellValue {
        self.cell(col).map(|c| &c.value).unwrap_or(&EMPTY_VALUE)
    }

    /// Display text of a cell, `""` when empty.
    pub fn text(&self, col: u32) -> String {
        self.value(col).to_string()
    }

    pub fn is_blank(&self) -> bool {
        self.cells
            .map(|cells| cells.values().all(|c| c.value.is_empty()))
            .unwrap_or(true)
    }

    /// Display text of columns `1..=width`.
    pub fn texts(&self, width: u32) -> Vec<String> {
        (1..=width).map(|col| self.text(col)).collect()
    }
}

/// Ordered traversal over `first..=last` rows, including blank ones.
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    sheet: &'a Sheet,
    next: u32,
    last: u32,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Row<'a>> {
        if self.next > self.last {
            return None;
        }
        let row = self.sheet.row(self.next);
        self.next += 1;
        Some(row)
    }
}

// =============================================================================
// Sheet
// =============================================================================

/// A named worksheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    name: String,
    rows: BTreeMap<u32, BTreeMap<u32, Cell>>,
    merges: Vec<MergeRange>,
    #[serde(skip)]
    dirty: bool,
}

impl PartialEq for Sheet {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.rows == other.rows && self.merges == other.merges
    }
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            rows: BTreeMap::new(),
            merges: Vec::new(),
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Index of the last row holding any cell, 0 for an empty sheet.
    pub fn row_count(&self) -> u32 {
        self.rows.keys().next_back().copied().unwrap_or(0)
    }

    /// Index of the right-most used column, counting merged ranges.
    pub fn column_count(&self) -> u32 {
        let cells = self
            .rows
            .values()
            .filter_map(|cells| cells.keys().next_back().copied())
            .max()
            .unwrap_or(0);
        let merged = self.merges.iter().map(|m| m.right).max().unwrap_or(0);
        cells.max(merged)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn row(&self, index: u32) -> Row<'_> {
        Row {
            index,
            cells: self.rows.get(&index),
        }
    }

    /// Every row from 1 to [`row_count`](Self::row_count).
    pub fn rows(&self) -> Rows<'_> {
        self.rows_from(1)
    }

    /// Rows from `first` to the last row; empty when `first` is past the end.
    pub fn rows_from(&self, first: u32) -> Rows<'_> {
        Rows {
            sheet: self,
            next: first.max(1),
            last: self.row_count(),
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.rows.get(&row).and_then(|cells| cells.get(&col))
    }

    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        self.row(row).value(col)
    }

    pub fn text(&self, row: u32, col: u32) -> String {
        self.row(row).text(col)
    }

    pub fn style(&self, row: u32, col: u32) -> CellStyle {
        self.cell(row, col)
            .map(|c| c.style.clone())
            .unwrap_or_default()
    }

    pub fn merges(&self) -> &[MergeRange] {
        &self.merges
    }

    /// Iterates every stored cell as `(row, col, cell)`.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &Cell)> {
        self.rows.iter().flat_map(|(row, cells)| {
            cells.iter().map(move |(col, cell)| (*row, *col, cell))
        })
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Stores a full cell, dropping it when it carries neither value nor style.
    pub fn put_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.dirty = true;
        if cell.is_vacant() {
            if let Some(cells) = self.rows.get_mut(&row) {
                cells.remove(&col);
                if cells.is_empty() {
                    self.rows.remove(&row);
                }
            }
            return;
        }
        self.rows.entry(row).or_default().insert(col, cell);
    }

    pub fn set_value(&mut self, row: u32, col: u32, value: impl Into<CellValue>) {
        let mut cell = self.cell(row, col).cloned().unwrap_or_default();
        cell.value = value.into();
        self.put_cell(row, col, cell);
    }

    pub fn set_style(&mut self, row: u32, col: u32, style: CellStyle) {
        let mut cell = self.cell(row, col).cloned().unwrap_or_default();
        cell.style = style;
        self.put_cell(row, col, cell);
    }

    /// Sets or clears only the background fill, keeping font and alignment.
    pub fn set_fill(&mut self, row: u32, col: u32, fill: Option<&str>) {
        let mut style = self.style(row, col);
        style.fill = fill.map(str::to_string);
        self.set_style(row, col, style);
    }

    /// Writes `values` into `row` starting at column 1.
    pub fn write_row<I, V>(&mut self, row: u32, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        for (offset, value) in values.into_iter().enumerate() {
            self.set_value(row, offset as u32 + 1, value);
        }
    }

    /// Appends `values` after the last row and returns the new row index.
    pub fn append_row<I, V>(&mut self, values: I) -> u32
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let row = self.row_count() + 1;
        self.write_row(row, values);
        self.dirty = true;
        row
    }

    /// Clears the row's cells and writes `values` in their place.
    pub fn replace_row<I, V>(&mut self, row: u32, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.rows.remove(&row);
        self.dirty = true;
        self.write_row(row, values);
    }

    /// Removes `row` and shifts every row below it up by one.
    pub fn delete_row(&mut self, row: u32) {
        let below: Vec<u32> = self.rows.range(row + 1..).map(|(k, _)| *k).collect();
        self.rows.remove(&row);
        for index in below {
            if let Some(cells) = self.rows.remove(&index) {
                self.rows.insert(index - 1, cells);
            }
        }

        self.merges.retain(|m| !(m.top == row && m.bottom == row));
        for merge in &mut self.merges {
            if merge.top > row {
                merge.top -= 1;
                merge.bottom -= 1;
            } else if merge.bottom >= row {
                merge.bottom -= 1;
            }
        }
        self.dirty = true;
    }

    /// Registers a merged range.
    ///
    /// Re-merging an identical range is a no-op; a partial overlap is a
    /// [`CoreError::MergeConflict`].
    pub fn merge_cells(&mut self, top: u32, left: u32, bottom: u32, right: u32) -> CoreResult<()> {
        let range = MergeRange::new(top, left, bottom, right);
        if self.merges.contains(&range) {
            return Ok(());
        }
        if let Some(existing) = self.merges.iter().find(|m| m.overlaps(&range)) {
            return Err(CoreError::MergeConflict {
                sheet: self.name.clone(),
                range: range.to_a1(),
                existing: existing.to_a1(),
            });
        }
        self.merges.push(range);
        self.dirty = true;
        Ok(())
    }
}

// =============================================================================
// Workbook
// =============================================================================

/// Ordered collection of sheets. Sheet names are unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    #[serde(skip)]
    structure_dirty: bool,
}

impl PartialEq for Workbook {
    fn eq(&self, other: &Self) -> bool {
        self.sheets == other.sheets
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn get_sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn require_sheet(&self, name: &str) -> CoreResult<&Sheet> {
        self.get_sheet(name)
            .ok_or_else(|| CoreError::SheetNotFound(name.to_string()))
    }

    pub fn require_sheet_mut(&mut self, name: &str) -> CoreResult<&mut Sheet> {
        self.get_sheet_mut(name)
            .ok_or_else(|| CoreError::SheetNotFound(name.to_string()))
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.get_sheet(name).is_some()
    }

    /// Appends an empty sheet. Fails when the name is already taken.
    pub fn add_sheet(&mut self, name: &str) -> CoreResult<&mut Sheet> {
        self.push_sheet(Sheet::new(name))
    }

    /// Appends a fully built sheet, as produced by a codec.
    pub fn push_sheet(&mut self, sheet: Sheet) -> CoreResult<&mut Sheet> {
        if self.has_sheet(sheet.name()) {
            return Err(CoreError::DuplicateSheet(sheet.name().to_string()));
        }
        self.sheets.push(sheet);
        self.structure_dirty = true;
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    /// Returns the named sheet, creating it with `init` when absent.
    ///
    /// `init` only runs for a newly created sheet, so layout code placed
    /// there is never re-applied to an existing tab.
    pub fn ensure_sheet<F>(&mut self, name: &str, init: F) -> CoreResult<&mut Sheet>
    where
        F: FnOnce(&mut Sheet) -> CoreResult<()>,
    {
        let index = match self.sheets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                let mut sheet = Sheet::new(name);
                init(&mut sheet)?;
                self.sheets.push(sheet);
                self.structure_dirty = true;
                self.sheets.len() - 1
            }
        };
        Ok(&mut self.sheets[index])
    }

    /// True when any sheet was added or any cell changed since the last clean.
    pub fn is_dirty(&self) -> bool {
        self.structure_dirty || self.sheets.iter().any(Sheet::is_dirty)
    }

    pub fn mark_clean(&mut self) {
        self.structure_dirty = false;
        for sheet in &mut self.sheets {
            sheet.mark_clean();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

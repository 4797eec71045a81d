//! Dashboard notes and tasks, each on its own tab of the clients workbook.
//!
//! Both lists are addressed positionally: `index` 0 is the first non-blank
//! record, counted over the whole tab even when a listing is filtered.

use tracing::info;

use crate::document::{CellValue, Row, Sheet, Workbook};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::locator::{find_all, Normalizer, RecordKey};
use crate::schema::{note, task, SheetKind, SheetSchema, NOTES, TASKS};
use crate::types::{NewNote, NewTask, Note, Task};
use crate::validation::validate_required;

/// Notes run longer than other free-text cells.
pub const MAX_NOTE_LEN: usize = 2000;

pub fn notes_sheet_name() -> String {
    SheetKind::Notes.sheet_name(0)
}

pub fn tasks_sheet_name() -> String {
    SheetKind::Tasks.sheet_name(0)
}

fn ensure<'a>(workbook: &'a mut Workbook, schema: &'static SheetSchema) -> CoreResult<&'a mut Sheet> {
    workbook.ensure_sheet(&schema.kind.sheet_name(0), |sheet| {
        schema.write_headers(sheet);
        Ok(())
    })
}

/// Non-blank records in sheet order, paired with their positional index.
fn records<'a>(sheet: &'a Sheet, schema: &SheetSchema) -> impl Iterator<Item = (usize, Row<'a>)> {
    sheet
        .rows_from(schema.first_data_row())
        .filter(|row| !row.is_blank())
        .enumerate()
}

fn nth_record_row(sheet: &Sheet, schema: &SheetSchema, index: usize) -> CoreResult<u32> {
    records(sheet, schema)
        .nth(index)
        .map(|(_, row)| row.index())
        .ok_or_else(|| CoreError::InvalidRow {
            sheet: sheet.name().to_string(),
            row: u32::try_from(index)
                .unwrap_or(u32::MAX)
                .saturating_add(schema.first_data_row()),
        })
}

// =============================================================================
// Notes
// =============================================================================

pub fn add_note(workbook: &mut Workbook, new_note: &NewNote) -> CoreResult<u32> {
    let text = new_note.text.trim();
    if text.is_empty() {
        return Err(ValidationError::Required {
            field: "note".to_string(),
        }
        .into());
    }
    if text.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        }
        .into());
    }

    let sheet = ensure(workbook, &NOTES)?;
    let row = sheet.append_row(vec![
        CellValue::from(new_note.date),
        new_note.client.trim().into(),
        text.into(),
    ]);
    info!(row, client = %new_note.client.trim(), "note added");
    Ok(row)
}

fn note_of(index: usize, row: &Row<'_>) -> Note {
    Note {
        index,
        date: row.text(note::DATE.column),
        client: row.text(note::CLIENT.column),
        text: row.text(note::TEXT.column),
    }
}

/// Every note, or those of one client (names compare case-insensitively).
pub fn list_notes(workbook: &Workbook, client: Option<&str>) -> Vec<Note> {
    let Some(sheet) = workbook.get_sheet(&notes_sheet_name()) else {
        return Vec::new();
    };
    let wanted = client.map(|name| {
        let key = RecordKey::new().with(note::CLIENT.column, name, Normalizer::Text);
        find_all(sheet, NOTES.first_data_row(), &key)
    });

    records(sheet, &NOTES)
        .filter(|(_, row)| wanted.as_ref().map_or(true, |rows| rows.contains(&row.index())))
        .map(|(index, row)| note_of(index, &row))
        .collect()
}

/// Removes the note at `index` and returns it.
pub fn delete_note(workbook: &mut Workbook, index: usize) -> CoreResult<Note> {
    let sheet = workbook.require_sheet_mut(&notes_sheet_name())?;
    let row = nth_record_row(sheet, &NOTES, index)?;
    let removed = note_of(index, &sheet.row(row));
    sheet.delete_row(row);
    info!(row, index, "note deleted");
    Ok(removed)
}

// =============================================================================
// Tasks
// =============================================================================

pub fn add_task(workbook: &mut Workbook, new_task: &NewTask) -> CoreResult<u32> {
    validate_required("task description", &new_task.description)?;

    let sheet = ensure(workbook, &TASKS)?;
    let row = sheet.append_row(vec![
        CellValue::from(new_task.date),
        new_task.time.trim().into(),
        new_task.description.trim().into(),
    ]);
    info!(row, date = %new_task.date, "task added");
    Ok(row)
}

fn task_of(index: usize, row: &Row<'_>) -> Task {
    Task {
        index,
        date: row.text(task::DATE.column),
        time: row.text(task::TIME.column),
        description: row.text(task::DESCRIPTION.column),
    }
}

pub fn list_tasks(workbook: &Workbook) -> Vec<Task> {
    let Some(sheet) = workbook.get_sheet(&tasks_sheet_name()) else {
        return Vec::new();
    };
    records(sheet, &TASKS)
        .map(|(index, row)| task_of(index, &row))
        .collect()
}

pub fn delete_task(workbook: &mut Workbook, index: usize) -> CoreResult<Task> {
    let sheet = workbook.require_sheet_mut(&tasks_sheet_name())?;
    let row = nth_record_row(sheet, &TASKS, index)?;
    let removed = task_of(index, &sheet.row(row));
    sheet.delete_row(row);
    info!(row, index, "task deleted");
    Ok(removed)
}

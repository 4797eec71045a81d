//! Lead pipeline on the `Leads` tab.
//!
//! Callers address leads positionally: `index` 0 is the first data row
//! (sheet row 2). Reference numbers run `A0001..A9999`, then `B0001`.

use tracing::{debug, info};

use crate::document::{CellValue, Sheet, Workbook};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::locator::{Normalizer, RecordKey};
use crate::schema::{lead, SheetKind, LEADS};
use crate::types::{Lead, LeadField, NewLead};
use crate::validation::{validate_kw, validate_mobile, validate_name, MAX_TEXT_LEN};

pub fn leads_sheet_name() -> String {
    SheetKind::Leads.sheet_name(0)
}

/// Canonical key of a lead: name + kW + mobile.
pub fn lead_key(name: &str, kw: &str, mobile: &str) -> RecordKey {
    RecordKey::new()
        .with(lead::NAME.column, name, Normalizer::Text)
        .with(lead::KW.column, kw, Normalizer::Number)
        .with(lead::MOBILE.column, mobile, Normalizer::Mobile)
}

pub(crate) fn ensure_leads(workbook: &mut Workbook) -> CoreResult<&mut Sheet> {
    workbook.ensure_sheet(&leads_sheet_name(), |sheet| {
        LEADS.write_headers(sheet);
        Ok(())
    })
}

// =============================================================================
// Reference Numbers
// =============================================================================

/// Parses `A0001`-style references.
fn parse_ref(text: &str) -> Option<(char, u32)> {
    let mut chars = text.chars();
    let letter = chars.next().filter(|c| c.is_ascii_uppercase())?;
    let digits = chars.as_str();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((letter, digits.parse().ok()?))
}

/// Reference following the last well-formed one on the sheet.
pub fn next_ref_no(sheet: Option<&Sheet>) -> String {
    let last = sheet.and_then(|sheet| {
        sheet
            .rows_from(LEADS.first_data_row())
            .filter_map(|row| parse_ref(row.text(lead::REF_NO.column).trim()))
            .last()
    });

    match last {
        None => "A0001".to_string(),
        Some((letter, number)) if number < 9999 => format!("{}{:04}", letter, number + 1),
        Some((letter, _)) => {
            let next = char::from_u32(letter as u32 + 1).unwrap_or(letter);
            format!("{}0001", next)
        }
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// Appends a lead, assigning the next reference number. Returns the reference.
pub fn add_lead(workbook: &mut Workbook, new_lead: &NewLead) -> CoreResult<String> {
    validate_name(&new_lead.name)?;
    validate_mobile(&new_lead.mobile)?;
    validate_kw(new_lead.kw)?;

    let sheet = ensure_leads(workbook)?;
    let ref_no = next_ref_no(Some(&*sheet));
    let values: Vec<CellValue> = vec![
        new_lead.date.into(),
        new_lead.name.trim().into(),
        new_lead.address.trim().into(),
        new_lead.mobile.trim().into(),
        ref_no.as_str().into(),
        new_lead.kw.into(),
        new_lead.reference.trim().into(),
    ];
    let row = sheet.append_row(values);
    info!(ref_no = %ref_no, row, "lead added");
    Ok(ref_no)
}

/// Sheet row of a 0-based lead index, checked against the data region.
fn lead_row(sheet: &Sheet, index: usize) -> CoreResult<u32> {
    let row = u32::try_from(index)
        .unwrap_or(u32::MAX)
        .saturating_add(LEADS.first_data_row());
    if row > sheet.row_count() {
        return Err(CoreError::InvalidRow {
            sheet: sheet.name().to_string(),
            row,
        });
    }
    Ok(row)
}

pub fn update_lead_field(workbook: &mut Workbook, index: usize, field: LeadField, value: &str) -> CoreResult<()> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: format!("{:?}", field).to_lowercase(),
            max: MAX_TEXT_LEN,
        }
        .into());
    }
    let sheet = workbook.require_sheet_mut(&leads_sheet_name())?;
    let row = lead_row(sheet, index)?;
    sheet.set_value(row, field.def().column, value.trim());
    debug!(row, field = ?field, "lead updated");
    Ok(())
}

/// Removes the lead; every lead below moves up one index.
pub fn delete_lead(workbook: &mut Workbook, index: usize) -> CoreResult<()> {
    let sheet = workbook.require_sheet_mut(&leads_sheet_name())?;
    let row = lead_row(sheet, index)?;
    sheet.delete_row(row);
    info!(row, "lead deleted");
    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

/// Every lead except those whose Reference is `no`.
pub fn list_leads(workbook: &Workbook) -> CoreResult<Vec<Lead>> {
    let sheet = workbook.require_sheet(&leads_sheet_name())?;
    Ok(sheet
        .rows_from(LEADS.first_data_row())
        .filter(|row| !row.is_blank())
        .filter(|row| row.text(lead::REFERENCE.column).trim().to_lowercase() != "no")
        .map(|row| Lead {
            index: (row.index() - LEADS.first_data_row()) as usize,
            date: row.text(lead::DATE.column),
            name: row.text(lead::NAME.column),
            address: row.text(lead::ADDRESS.column),
            mobile: row.text(lead::MOBILE.column),
            ref_no: row.text(lead::REF_NO.column),
            kw: row.text(lead::KW.column),
            reference: row.text(lead::REFERENCE.column),
            call: row.text(lead::CALL.column),
            proposal: row.text(lead::PROPOSAL.column),
            meeting: row.text(lead::MEETING.column),
            reminder: row.text(lead::REMINDER.column),
            status: row.text(lead::STATUS.column),
            final_status: row.text(lead::FINAL.column),
        })
        .collect())
}

//! Quotations on the `Proposals` tab, and their hand-off into the lead list.
//!
//! References are `01P`, `02P`, ... derived from the last row. Proposal rows
//! are read back as maps keyed by their header with spaces removed and
//! lowercased, so a renamed header column shows up under its new key.

use tracing::info;

use crate::document::{CellValue, Row, Sheet, Workbook};
use crate::error::{CoreError, CoreResult};
use crate::leads::{ensure_leads, lead_key};
use crate::locator::find_row;
use crate::schema::{proposal, SheetKind, LEADS, PROPOSALS};
use crate::types::{NewProposal, ProposalFields, TransferSummary};
use crate::validation::{validate_kw, validate_mobile, validate_name, validate_non_negative};

/// Follow-up value written into a lead's Proposal column on transfer.
pub const PROPOSAL_SENT: &str = "Sent";

pub fn proposals_sheet_name() -> String {
    SheetKind::Proposals.sheet_name(0)
}

/// `"To Whom"` → `"towhom"`.
pub fn header_key(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<String>()
        .to_lowercase()
}

/// Reference after the last row's, or `01P` when it carries none.
pub fn next_proposal_ref(sheet: Option<&Sheet>) -> String {
    let last = sheet
        .filter(|sheet| sheet.row_count() >= PROPOSALS.first_data_row())
        .map(|sheet| sheet.text(sheet.row_count(), proposal::REF_NO.column))
        .and_then(|text| {
            text.trim()
                .strip_suffix('P')
                .and_then(|n| n.parse::<u32>().ok())
        });
    format!("{:02}P", last.map(|n| n + 1).unwrap_or(1))
}

pub fn save_proposal(workbook: &mut Workbook, new_proposal: &NewProposal) -> CoreResult<String> {
    validate_name(&new_proposal.to_whom)?;
    validate_mobile(&new_proposal.mobile)?;
    validate_kw(new_proposal.kw)?;
    validate_non_negative("price", new_proposal.price)?;

    let sheet = workbook.ensure_sheet(&proposals_sheet_name(), |sheet| {
        PROPOSALS.write_headers(sheet);
        Ok(())
    })?;
    let ref_no = next_proposal_ref(Some(&*sheet));

    let p = new_proposal;
    let values: Vec<CellValue> = vec![
        ref_no.as_str().into(),
        p.date.into(),
        p.subsidy.trim().into(),
        p.kw.into(),
        p.address.trim().into(),
        p.state.trim().into(),
        p.city.trim().into(),
        p.to_whom.trim().into(),
        p.mobile.trim().into(),
        p.price.into(),
        p.panel_brand.trim().into(),
        p.panel_wp.trim().into(),
        p.inverter_brand.trim().into(),
        p.sent_by.trim().into(),
    ];
    let row = sheet.append_row(values);
    info!(ref_no = %ref_no, row, "proposal saved");
    Ok(ref_no)
}

fn fields_of(sheet: &Sheet, row: &Row<'_>) -> ProposalFields {
    let header = sheet.row(1);
    (1..=sheet.column_count())
        .filter(|col| !header.value(*col).is_empty())
        .map(|col| (header_key(&header.text(col)), row.text(col)))
        .collect()
}

/// The proposal with reference `ref_no`, last match winning.
pub fn get_proposal(workbook: &Workbook, ref_no: &str) -> CoreResult<ProposalFields> {
    let sheet = workbook.require_sheet(&proposals_sheet_name())?;
    let wanted = ref_no.trim();
    sheet
        .rows_from(PROPOSALS.first_data_row())
        .filter(|row| row.text(proposal::REF_NO.column).trim() == wanted)
        .last()
        .map(|row| fields_of(sheet, &row))
        .ok_or_else(|| CoreError::record_not_found(sheet.name(), wanted))
}

/// Every proposal; an absent tab is an empty list.
pub fn list_proposals(workbook: &Workbook) -> Vec<ProposalFields> {
    let Some(sheet) = workbook.get_sheet(&proposals_sheet_name()) else {
        return Vec::new();
    };
    sheet
        .rows_from(PROPOSALS.first_data_row())
        .filter(|row| !row.is_blank())
        .map(|row| fields_of(sheet, &row))
        .collect()
}

/// Copies every proposal into the lead list, marking it `Sent`.
///
/// A lead with the same name, kW and mobile is replaced in place (keeping its
/// position); otherwise the proposal is appended as a new lead.
pub fn transfer_to_leads(proposals: &Workbook, leads: &mut Workbook) -> CoreResult<TransferSummary> {
    let source = proposals.require_sheet(&proposals_sheet_name())?;
    let target = ensure_leads(leads)?;
    let mut summary = TransferSummary::default();

    for row in source.rows_from(PROPOSALS.first_data_row()) {
        if row.is_blank() {
            continue;
        }
        let name = row.text(proposal::TO_WHOM.column);
        let kw = row.text(proposal::KW.column);
        let mobile = row.text(proposal::MOBILE.column);

        let values: Vec<CellValue> = vec![
            row.value(proposal::DATE.column).clone(),
            row.value(proposal::TO_WHOM.column).clone(),
            row.value(proposal::ADDRESS.column).clone(),
            row.value(proposal::MOBILE.column).clone(),
            row.value(proposal::REF_NO.column).clone(),
            row.value(proposal::KW.column).clone(),
            CellValue::Empty,
            CellValue::Empty,
            CellValue::text(PROPOSAL_SENT),
        ];

        match find_row(target, LEADS.first_data_row(), &lead_key(&name, &kw, &mobile)) {
            Some(existing) => {
                target.replace_row(existing, values);
                summary.replaced += 1;
            }
            None => {
                target.append_row(values);
                summary.appended += 1;
            }
        }
    }

    info!(
        replaced = summary.replaced,
        appended = summary.appended,
        "proposals transferred to leads"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leads::{add_lead, list_leads};
    use crate::types::NewLead;
    use chrono::NaiveDate;

    fn quote(to_whom: &str, mobile: &str, kw: f64) -> NewProposal {
        NewProposal {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            subsidy: "Yes".to_string(),
            kw,
            address: "Model Town".to_string(),
            state: "Haryana".to_string(),
            city: "Hisar".to_string(),
            to_whom: to_whom.to_string(),
            mobile: mobile.to_string(),
            price: 185000.0,
            panel_brand: "Waaree".to_string(),
            panel_wp: "540".to_string(),
            inverter_brand: "Growatt".to_string(),
            sent_by: "Office".to_string(),
        }
    }

    #[test]
    fn test_refs_and_lookup() {
        let mut workbook = Workbook::new();
        assert_eq!(next_proposal_ref(None), "01P");
        assert_eq!(save_proposal(&mut workbook, &quote("Amit", "9812345678", 3.0)).unwrap(), "01P");
        assert_eq!(save_proposal(&mut workbook, &quote("Bina", "9812345679", 5.0)).unwrap(), "02P");

        let fields = get_proposal(&workbook, "02P").unwrap();
        assert_eq!(fields["towhom"], "Bina");
        assert_eq!(fields["kw"], "5");
        assert_eq!(fields["sentby"], "Office");
        assert_eq!(fields["panelwp"], "540");

        assert!(get_proposal(&workbook, "09P").is_err());
        assert_eq!(list_proposals(&workbook).len(), 2);
        assert!(list_proposals(&Workbook::new()).is_empty());
    }

    #[test]
    fn test_transfer_replaces_or_appends() {
        let mut proposals = Workbook::new();
        save_proposal(&mut proposals, &quote("Amit", "9812345678", 3.0)).unwrap();
        save_proposal(&mut proposals, &quote("Bina", "9812345679", 5.0)).unwrap();

        let mut leads = Workbook::new();
        add_lead(
            &mut leads,
            &NewLead {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                name: "amit".to_string(),
                address: "old".to_string(),
                mobile: "+91 98123 45678".to_string(),
                kw: 3.0,
                reference: "walk-in".to_string(),
            },
        )
        .unwrap();

        let summary = transfer_to_leads(&proposals, &mut leads).unwrap();
        assert_eq!(summary, TransferSummary { replaced: 1, appended: 1 });

        let listed = list_leads(&leads).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Amit");
        assert_eq!(listed[0].ref_no, "01P");
        assert_eq!(listed[0].proposal, PROPOSAL_SENT);
        assert_eq!(listed[0].address, "Model Town");
        assert_eq!(listed[1].name, "Bina");
    }
}

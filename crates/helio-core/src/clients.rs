//! # Client Ledger
//!
//! The `Client Data` tab: one 41-column row per installation. Intake fills
//! columns 1-22; application, project and payment follow-ups fill the rest.
//!
//! Rows are keyed by name + kW + the last 10 digits of the mobile number.
//! Submitting the same client twice updates the existing row.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::aggregate::coerce_number;
use crate::document::{CellValue, Row, Sheet, Workbook};
use crate::error::{CoreError, CoreResult};
use crate::locator::{find_or_create, find_row, normalize_text, Located, Normalizer, RecordKey};
use crate::schema::client::{self, APPLICATION, DOCUMENTS, PROJECT_STEPS};
use crate::schema::{FieldDef, SheetKind, CLIENT_LEDGER};
use crate::types::{
    ApplicationTimeline, ClientIntake, ClientRecord, ClientRef, DashboardStats, PaymentBreakdown,
    PaymentDue, PaymentStatus, ProjectStatus,
};
use crate::validation::{validate_kw, validate_mobile, validate_name, validate_non_negative};

/// Tab holding the ledger.
pub fn ledger_sheet_name() -> String {
    SheetKind::ClientLedger.sheet_name(0)
}

// =============================================================================
// Keys & Paths
// =============================================================================

/// Folder name of a client's uploads: lowercased, whitespace runs → `_`.
pub fn client_slug(name: &str) -> String {
    normalize_text(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Storage path of each document column for a client.
pub fn document_paths(slug: &str) -> Vec<(FieldDef, String)> {
    DOCUMENTS
        .iter()
        .map(|field| (*field, format!("uploads/{}/{}.png", slug, field.name.replace('_', ""))))
        .collect()
}

pub fn photo_path(slug: &str, extension: &str) -> String {
    format!("uploads/{}/clientPhoto.{}", slug, extension.trim_start_matches('.'))
}

pub fn client_key(client: &ClientRef) -> RecordKey {
    RecordKey::new()
        .with(client::NAME.column, &client.name, Normalizer::Text)
        .with(client::KW.column, &client.kw.to_string(), Normalizer::Number)
        .with(client::MOBILE.column, &client.mobile, Normalizer::Mobile)
}

pub fn validate_intake(intake: &ClientIntake) -> CoreResult<()> {
    validate_name(&intake.name)?;
    validate_mobile(&intake.mobile)?;
    validate_kw(intake.kw)?;
    validate_non_negative("advance", intake.advance)?;
    validate_non_negative("total cost", intake.total_cost)?;
    Ok(())
}

// =============================================================================
// Sheet Access
// =============================================================================

fn ensure_ledger(workbook: &mut Workbook) -> CoreResult<&mut Sheet> {
    workbook.ensure_sheet(&ledger_sheet_name(), |sheet| {
        CLIENT_LEDGER.write_headers(sheet);
        Ok(())
    })
}

fn ledger(workbook: &Workbook) -> CoreResult<&Sheet> {
    workbook.require_sheet(&ledger_sheet_name())
}

fn locate(sheet: &Sheet, client: &ClientRef) -> CoreResult<u32> {
    let key = client_key(client);
    find_row(sheet, CLIENT_LEDGER.first_data_row(), &key)
        .ok_or_else(|| CoreError::record_not_found(sheet.name(), key.composite()))
}

fn record_of(row: &Row<'_>) -> ClientRecord {
    let fields = CLIENT_LEDGER
        .fields
        .iter()
        .map(|f| (f.name.to_string(), row.text(f.column)))
        .collect();
    ClientRecord {
        row: row.index(),
        fields,
    }
}

/// Numeric cell or its text, so `"12000"` typed by hand stays a number.
fn numeric_or_text(value: &str) -> CellValue {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::text(value.trim()),
    }
}

// =============================================================================
// Intake
// =============================================================================

/// Inserts the client or refreshes the intake columns of an existing row.
pub fn upsert_client(workbook: &mut Workbook, intake: &ClientIntake) -> CoreResult<Located> {
    validate_intake(intake)?;
    let key = client_key(&ClientRef {
        name: intake.name.clone(),
        kw: intake.kw,
        mobile: intake.mobile.clone(),
    });

    let sheet = ensure_ledger(workbook)?;
    let located = find_or_create(sheet, CLIENT_LEDGER.first_data_row(), &key, [intake.date]);
    let row = located.row();
    let slug = client_slug(&intake.name);

    let mut intake_values: Vec<(FieldDef, CellValue)> = vec![
        (client::DATE, intake.date.into()),
        (client::NAME, intake.name.trim().into()),
        (client::ADDRESS, intake.address.trim().into()),
        (client::CITY, intake.city.trim().into()),
        (client::STATE, intake.state.trim().into()),
        (client::EMAIL, intake.email.trim().into()),
        (client::REFERENCE, intake.reference.trim().into()),
        (client::ALT_MOBILE, intake.alternate_mobile.trim().into()),
        (client::MOBILE, intake.mobile.trim().into()),
        (client::ACCOUNT_NO, intake.electricity_account.trim().into()),
        (client::KW, intake.kw.into()),
        (client::ADVANCE, intake.advance.into()),
        (client::TOTAL_COST, intake.total_cost.into()),
    ];
    // A resubmission without a photo keeps the stored path.
    if let Some(ext) = intake.photo_extension.as_deref() {
        intake_values.push((client::PHOTO, photo_path(&slug, ext).into()));
    }
    for (field, value) in intake_values {
        sheet.set_value(row, field.column, value);
    }
    for (field, path) in document_paths(&slug) {
        sheet.set_value(row, field.column, path);
    }

    info!(
        client = %key,
        row,
        created = located.was_created(),
        "client saved"
    );
    Ok(located)
}

// =============================================================================
// Reads
// =============================================================================

pub fn get_client(workbook: &Workbook, client: &ClientRef) -> CoreResult<ClientRecord> {
    let sheet = ledger(workbook)?;
    let row = locate(sheet, client)?;
    Ok(record_of(&sheet.row(row)))
}

/// Clients whose name contains `query`, case-insensitively.
pub fn search_clients(workbook: &Workbook, query: &str) -> CoreResult<Vec<ClientRecord>> {
    let sheet = ledger(workbook)?;
    let needle = normalize_text(query);
    Ok(sheet
        .rows_from(CLIENT_LEDGER.first_data_row())
        .filter(|row| !row.value(client::NAME.column).is_empty())
        .filter(|row| normalize_text(&row.text(client::NAME.column)).contains(&needle))
        .map(|row| record_of(&row))
        .collect())
}

// =============================================================================
// Follow-ups
// =============================================================================

fn update_fields(workbook: &mut Workbook, client: &ClientRef, values: &[(FieldDef, CellValue)]) -> CoreResult<u32> {
    let sheet = ensure_ledger(workbook)?;
    let row = locate(sheet, client)?;
    for (field, value) in values {
        sheet.set_value(row, field.column, value.clone());
    }
    debug!(client = %client.name, row, fields = values.len(), "client fields updated");
    Ok(row)
}

pub fn save_application_timeline(
    workbook: &mut Workbook,
    client: &ClientRef,
    timeline: &ApplicationTimeline,
) -> CoreResult<()> {
    let values = [
        (APPLICATION[0], CellValue::text(timeline.applied_kw.trim())),
        (APPLICATION[1], CellValue::text(timeline.applied_pm_surya.trim())),
        (APPLICATION[2], CellValue::text(timeline.application_discom.trim())),
        (APPLICATION[3], CellValue::text(timeline.load_change.trim())),
    ];
    update_fields(workbook, client, &values)?;
    Ok(())
}

pub fn get_application_timeline(workbook: &Workbook, client: &ClientRef) -> CoreResult<ApplicationTimeline> {
    let record = get_client(workbook, client)?;
    Ok(ApplicationTimeline {
        applied_kw: record.get(&client::APPLIED_KW).to_string(),
        applied_pm_surya: record.get(&client::APPLIED_PM_SURYA).to_string(),
        application_discom: record.get(&client::APPLICATION_DISCOM).to_string(),
        load_change: record.get(&client::LOAD_CHANGE).to_string(),
    })
}

/// Writes all eleven checklist steps; a step missing from `status` is cleared.
pub fn save_project_status(workbook: &mut Workbook, client: &ClientRef, status: &ProjectStatus) -> CoreResult<()> {
    let values: Vec<(FieldDef, CellValue)> = PROJECT_STEPS
        .iter()
        .map(|step| {
            let value = status.steps.get(step.name).map(String::as_str).unwrap_or("");
            (*step, CellValue::text(value.trim()))
        })
        .collect();
    update_fields(workbook, client, &values)?;
    Ok(())
}

pub fn get_project_status(workbook: &Workbook, client: &ClientRef) -> CoreResult<ProjectStatus> {
    let record = get_client(workbook, client)?;
    let steps: BTreeMap<String, String> = PROJECT_STEPS
        .iter()
        .map(|step| (step.name.to_string(), record.get(step).to_string()))
        .collect();
    Ok(ProjectStatus { steps })
}

pub fn save_payment_status(workbook: &mut Workbook, client: &ClientRef, payment: &PaymentStatus) -> CoreResult<()> {
    let balance = payment.balance.map(CellValue::Number).unwrap_or_default();
    let values = [
        (client::INSTALLMENT_2, numeric_or_text(&payment.installment_2)),
        (client::INSTALLMENT_3, numeric_or_text(&payment.installment_3)),
        (client::FINAL_PAYMENT, numeric_or_text(&payment.final_payment)),
        (client::BALANCE, balance),
    ];
    update_fields(workbook, client, &values)?;
    Ok(())
}

pub fn get_payment_status(workbook: &Workbook, client: &ClientRef) -> CoreResult<PaymentStatus> {
    let sheet = ledger(workbook)?;
    let row = sheet.row(locate(sheet, client)?);
    Ok(PaymentStatus {
        installment_2: row.text(client::INSTALLMENT_2.column),
        installment_3: row.text(client::INSTALLMENT_3.column),
        final_payment: row.text(client::FINAL_PAYMENT.column),
        balance: parse_balance(row.value(client::BALANCE.column)),
    })
}

// =============================================================================
// Dashboard
// =============================================================================

/// Balance of a row; blank, `-` and `.` mean "not recorded yet".
fn parse_balance(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Text(s) if matches!(s.trim(), "" | "-" | ".") => None,
        CellValue::Empty => None,
        other => Some(coerce_number(other)),
    }
}

fn is_application_filed(value: &CellValue) -> bool {
    !value.is_empty() && normalize_text(&value.to_string()) != "no"
}

pub fn dashboard_stats(workbook: &Workbook) -> CoreResult<DashboardStats> {
    let sheet = ledger(workbook)?;
    let mut stats = DashboardStats::default();

    for row in sheet.rows_from(CLIENT_LEDGER.first_data_row()) {
        if row.is_blank() {
            continue;
        }
        stats.clients += 1;
        stats.total_sales_revenue += coerce_number(row.value(client::TOTAL_COST.column));

        if let Some(balance) = parse_balance(row.value(client::BALANCE.column)) {
            stats.total_balance += balance;
            if balance == 0.0 {
                stats.plants_installed += 1;
            }
        }

        if is_application_filed(row.value(client::APPLIED_PM_SURYA.column)) {
            stats.applications_applied += 1;
        } else {
            stats.applications_pending += 1;
        }
    }

    stats.total_payment_received = stats.total_sales_revenue - stats.total_balance;
    Ok(stats)
}

/// Share of the contract value collected before the second installment.
pub const SECOND_INSTALLMENT_SHARE: f64 = 0.6;

/// Amount in an installment cell. Notes such as `Due` or `Paid` count as 0.
fn received_amount(value: &CellValue) -> f64 {
    value.as_number().filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Installment totals for the dashboard bar graph.
pub fn payment_breakdown(workbook: &Workbook) -> CoreResult<PaymentBreakdown> {
    let sheet = ledger(workbook)?;
    let mut breakdown = PaymentBreakdown::default();

    for row in sheet.rows_from(CLIENT_LEDGER.first_data_row()) {
        if row.is_blank() {
            continue;
        }
        breakdown.total_cost += received_amount(row.value(client::TOTAL_COST.column));
        breakdown.advance += received_amount(row.value(client::ADVANCE.column));
        breakdown.second_installment_received += received_amount(row.value(client::INSTALLMENT_2.column));
        breakdown.final_installment_received += received_amount(row.value(client::FINAL_PAYMENT.column));
    }

    breakdown.second_installment_due =
        breakdown.total_cost - (breakdown.advance + SECOND_INSTALLMENT_SHARE * breakdown.total_cost);
    breakdown.final_installment_due =
        breakdown.total_cost - (breakdown.advance + breakdown.second_installment_received);
    Ok(breakdown)
}

/// Clients with a non-zero balance. Unpaid installments read `Due`.
pub fn payments_due(workbook: &Workbook) -> CoreResult<Vec<PaymentDue>> {
    let sheet = ledger(workbook)?;
    let due_or = |row: &Row<'_>, field: FieldDef| {
        let text = row.text(field.column);
        if text.trim().is_empty() {
            crate::DUE_LABEL.to_string()
        } else {
            text
        }
    };

    Ok(sheet
        .rows_from(CLIENT_LEDGER.first_data_row())
        .filter(|row| !row.is_blank())
        .filter_map(|row| {
            let balance = coerce_number(row.value(client::BALANCE.column));
            (balance != 0.0).then(|| PaymentDue {
                name: row.text(client::NAME.column),
                mobile: row.text(client::MOBILE.column),
                kw: row.text(client::KW.column),
                total_cost: coerce_number(row.value(client::TOTAL_COST.column)),
                installment_2: due_or(&row, client::INSTALLMENT_2),
                installment_3: due_or(&row, client::INSTALLMENT_3),
                final_payment: due_or(&row, client::FINAL_PAYMENT),
                balance,
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
    use chrono::NaiveDate;

    fn intake(name: &str, kw: f64, mobile: &str, total_cost: f64) -> ClientIntake {
        ClientIntake {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            name: name.to_string(),
            address: "12 Sector 9".to_string(),
            city: "Hisar".to_string(),
            state: "Haryana".to_string(),
            email: "ravi@example.com".to_string(),
            reference: "walk-in".to_string(),
            alternate_mobile: String::new(),
            mobile: mobile.to_string(),
            electricity_account: "HR-7781".to_string(),
            kw,
            advance: 20000.0,
            total_cost,
            photo_extension: Some("jpg".to_string()),
        }
    }

    fn ravi() -> ClientRef {
        ClientRef {
            name: "ravi kumar".to_string(),
            kw: 5.0,
            mobile: "+91 98765 43210".to_string(),
        }
    }

    #[test]
    fn test_slug_and_paths() {
        assert_eq!(client_slug("  Ravi   Kumar "), "ravi_kumar");
        let paths = document_paths("ravi_kumar");
        assert_eq!(paths.len(), 8);
        assert_eq!(paths[0].1, "uploads/ravi_kumar/aadharfront.png");
        assert_eq!(paths[7].1, "uploads/ravi_kumar/netmeteringagreement.png");
        assert_eq!(photo_path("ravi_kumar", ".png"), "uploads/ravi_kumar/clientPhoto.png");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut workbook = Workbook::new();
        let first = upsert_client(&mut workbook, &intake("Ravi Kumar", 5.0, "9876543210", 250000.0)).unwrap();
        assert_eq!(first, Located::Created(2));

        let mut again = intake("RAVI KUMAR", 5.0, "09876543210", 260000.0);
        again.city = "Sirsa".to_string();
        let second = upsert_client(&mut workbook, &again).unwrap();
        assert_eq!(second, Located::Found(2));

        let record = get_client(&workbook, &ravi()).unwrap();
        assert_eq!(record.get(&client::CITY), "Sirsa");
        assert_eq!(record.get(&client::TOTAL_COST), "260000");
        assert_eq!(record.get(&client::PHOTO), "uploads/ravi_kumar/clientPhoto.jpg");
        assert_eq!(workbook.get_sheet("Client Data").unwrap().row_count(), 2);
    }

    #[test]
    fn test_resubmission_without_photo_keeps_path() {
        let mut workbook = Workbook::new();
        upsert_client(&mut workbook, &intake("Ravi Kumar", 5.0, "9876543210", 250000.0)).unwrap();

        let mut again = intake("Ravi Kumar", 5.0, "9876543210", 250000.0);
        again.photo_extension = None;
        upsert_client(&mut workbook, &again).unwrap();

        let record = get_client(&workbook, &ravi()).unwrap();
        assert_eq!(record.get(&client::PHOTO), "uploads/ravi_kumar/clientPhoto.jpg");
    }

    #[test]
    fn test_new_client_without_photo_has_blank_path() {
        let mut workbook = Workbook::new();
        let mut first = intake("Ravi Kumar", 5.0, "9876543210", 250000.0);
        first.photo_extension = None;
        upsert_client(&mut workbook, &first).unwrap();

        let record = get_client(&workbook, &ravi()).unwrap();
        assert_eq!(record.get(&client::PHOTO), "");
    }

    #[test]
    fn test_payment_breakdown() {
        let mut workbook = Workbook::new();
        upsert_client(&mut workbook, &intake("Ravi Kumar", 5.0, "9876543210", 250000.0)).unwrap();
        upsert_client(&mut workbook, &intake("Meena Devi", 3.0, "9812345678", 150000.0)).unwrap();
        save_payment_status(
            &mut workbook,
            &ravi(),
            &PaymentStatus {
                installment_2: "150000".to_string(),
                installment_3: String::new(),
                final_payment: "Due".to_string(),
                balance: Some(80000.0),
            },
        )
        .unwrap();

        let breakdown = payment_breakdown(&workbook).unwrap();
        assert_eq!(breakdown.total_cost, 400000.0);
        assert_eq!(breakdown.advance, 40000.0);
        assert_eq!(breakdown.second_installment_received, 150000.0);
        assert_eq!(breakdown.final_installment_received, 0.0);
        assert!((breakdown.second_installment_due - 120000.0).abs() < 1e-6);
        assert_eq!(breakdown.final_installment_due, 210000.0);
    }

    #[test]
    fn test_different_kw_is_a_new_record() {
        let mut workbook = Workbook::new();
        upsert_client(&mut workbook, &intake("Ravi Kumar", 5.0, "9876543210", 1.0)).unwrap();
        let located = upsert_client(&mut workbook, &intake("Ravi Kumar", 3.0, "9876543210", 1.0)).unwrap();
        assert_eq!(located, Located::Created(3));
    }

    #[test]
    fn test_follow_ups_round_trip() {
        let mut workbook = Workbook::new();
        upsert_client(&mut workbook, &intake("Ravi Kumar", 5.0, "9876543210", 1.0)).unwrap();

        let timeline = ApplicationTimeline {
            applied_kw: "5".to_string(),
            applied_pm_surya: "Yes".to_string(),
            application_discom: "Pending".to_string(),
            load_change: String::new(),
        };
        save_application_timeline(&mut workbook, &ravi(), &timeline).unwrap();
        assert_eq!(get_application_timeline(&workbook, &ravi()).unwrap(), timeline);

        let mut status = ProjectStatus::default();
        status.steps.insert("civil".to_string(), "Done".to_string());
        status.steps.insert("net_metering".to_string(), "2024-04-01".to_string());
        save_project_status(&mut workbook, &ravi(), &status).unwrap();
        let read = get_project_status(&workbook, &ravi()).unwrap();
        assert_eq!(read.steps.len(), 11);
        assert_eq!(read.steps["civil"], "Done");
        assert_eq!(read.steps["panel"], "");

        let payment = PaymentStatus {
            installment_2: "100000".to_string(),
            installment_3: String::new(),
            final_payment: String::new(),
            balance: Some(0.0),
        };
        save_payment_status(&mut workbook, &ravi(), &payment).unwrap();
        assert_eq!(get_payment_status(&workbook, &ravi()).unwrap(), payment);
    }

    #[test]
    fn test_unknown_client_is_not_found() {
        let mut workbook = Workbook::new();
        upsert_client(&mut workbook, &intake("Ravi Kumar", 5.0, "9876543210", 1.0)).unwrap();
        let stranger = ClientRef {
            name: "Sunita".to_string(),
            kw: 5.0,
            mobile: "9876543210".to_string(),
        };
        let err = save_payment_status(&mut workbook, &stranger, &PaymentStatus::default()).unwrap_err();
        assert!(matches!(err, CoreError::RecordNotFound { .. }));
    }

    #[test]
    fn test_dashboard_and_payments_due() {
        let mut workbook = Workbook::new();
        upsert_client(&mut workbook, &intake("A", 5.0, "9000000001", 300000.0)).unwrap();
        upsert_client(&mut workbook, &intake("B", 3.0, "9000000002", 200000.0)).unwrap();
        upsert_client(&mut workbook, &intake("C", 2.0, "9000000003", 100000.0)).unwrap();

        let sheet = workbook.get_sheet_mut("Client Data").unwrap();
        sheet.set_value(2, client::BALANCE.column, 0.0);
        sheet.set_value(3, client::BALANCE.column, "50000");
        sheet.set_value(4, client::BALANCE.column, "-");
        sheet.set_value(3, client::APPLIED_PM_SURYA.column, "yes");
        sheet.set_value(4, client::APPLIED_PM_SURYA.column, "No");

        let stats = dashboard_stats(&workbook).unwrap();
        assert_eq!(stats.clients, 3);
        assert_eq!(stats.total_sales_revenue, 600000.0);
        assert_eq!(stats.total_balance, 50000.0);
        assert_eq!(stats.total_payment_received, 550000.0);
        assert_eq!(stats.plants_installed, 1);
        assert_eq!(stats.applications_applied, 1);
        assert_eq!(stats.applications_pending, 2);

        let due = payments_due(&workbook).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "B");
        assert_eq!(due[0].installment_2, "Due");
        assert_eq!(due[0].balance, 50000.0);
    }

    #[test]
    fn test_search_clients() {
        let mut workbook = Workbook::new();
        upsert_client(&mut workbook, &intake("Ravi Kumar", 5.0, "9876543210", 1.0)).unwrap();
        upsert_client(&mut workbook, &intake("Sunita Devi", 3.0, "9876500000", 1.0)).unwrap();
        let found = search_clients(&workbook, "KUMAR").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get(&client::NAME), "Ravi Kumar");
    }

    #[test]
    fn test_invalid_intake_rejected() {
        let mut workbook = Workbook::new();
        let err = upsert_client(&mut workbook, &intake("Ravi", 5.0, "123", 1.0)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(workbook.sheets().is_empty());
    }
}

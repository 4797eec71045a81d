//! Staff directory on the `Credentials` tab, keyed by email.

use tracing::{debug, info};

use crate::document::{CellValue, Workbook};
use crate::error::CoreResult;
use crate::locator::{find_all, find_or_create, Normalizer, RecordKey};
use crate::schema::{credential, SheetKind, CREDENTIALS};
use crate::types::Credential;
use crate::validation::{validate_email, validate_required};

pub fn credentials_sheet_name() -> String {
    SheetKind::Credentials.sheet_name(0)
}

pub fn credential_key(email: &str) -> RecordKey {
    RecordKey::new().with(credential::EMAIL.column, email, Normalizer::Text)
}

/// Looks up a staff member by email. `None` when the tab or row is absent.
pub fn find_credential(workbook: &Workbook, email: &str) -> Option<Credential> {
    let sheet = workbook.get_sheet(&credentials_sheet_name())?;
    let rows = find_all(sheet, CREDENTIALS.first_data_row(), &credential_key(email));
    debug!(email, matches = rows.len(), "credential lookup");
    let row = sheet.row(*rows.first()?);
    Some(Credential {
        email: row.text(credential::EMAIL.column),
        display_name: row.text(credential::DISPLAY_NAME.column),
        role: row.text(credential::ROLE.column),
    })
}

pub fn list_credentials(workbook: &Workbook) -> Vec<Credential> {
    let Some(sheet) = workbook.get_sheet(&credentials_sheet_name()) else {
        return Vec::new();
    };
    sheet
        .rows_from(CREDENTIALS.first_data_row())
        .filter(|row| !row.is_blank())
        .map(|row| Credential {
            email: row.text(credential::EMAIL.column),
            display_name: row.text(credential::DISPLAY_NAME.column),
            role: row.text(credential::ROLE.column),
        })
        .collect()
}

/// Adds a staff member, or updates name and role of an existing email.
pub fn add_credential(workbook: &mut Workbook, entry: &Credential) -> CoreResult<u32> {
    validate_email(&entry.email)?;
    validate_required("display_name", &entry.display_name)?;
    validate_required("role", &entry.role)?;

    let sheet = workbook.ensure_sheet(&credentials_sheet_name(), |sheet| {
        CREDENTIALS.write_headers(sheet);
        Ok(())
    })?;
    let seed: Vec<CellValue> = vec![entry.email.trim().into()];
    let located = find_or_create(sheet, CREDENTIALS.first_data_row(), &credential_key(&entry.email), seed);
    let row = located.row();
    sheet.set_value(row, credential::DISPLAY_NAME.column, entry.display_name.trim());
    sheet.set_value(row, credential::ROLE.column, entry.role.trim());
    info!(email = %entry.email, row, created = located.was_created(), "credential saved");
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(email: &str, role: &str) -> Credential {
        Credential {
            email: email.to_string(),
            display_name: "Office".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_add_and_find() {
        let mut workbook = Workbook::new();
        assert!(find_credential(&workbook, "a@helio.in").is_none());

        assert_eq!(add_credential(&mut workbook, &staff("a@helio.in", "admin")).unwrap(), 2);
        assert_eq!(add_credential(&mut workbook, &staff("b@helio.in", "staff")).unwrap(), 3);
        assert_eq!(add_credential(&mut workbook, &staff(" A@Helio.in", "staff")).unwrap(), 2);

        let found = find_credential(&workbook, "a@HELIO.in").unwrap();
        assert_eq!(found.role, "staff");
        assert_eq!(list_credentials(&workbook).len(), 2);
    }

    #[test]
    fn test_rejects_bad_email() {
        let mut workbook = Workbook::new();
        assert!(add_credential(&mut workbook, &staff("not-an-email", "admin")).is_err());
        assert!(list_credentials(&workbook).is_empty());
    }
}

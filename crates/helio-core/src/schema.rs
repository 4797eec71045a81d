//! # Sheet Schemas
//!
//! One descriptor table per record kind. Each field has a stable 1-based
//! column; every reader and writer in the crate resolves columns through these
//! tables, so a layout change is a one-line edit here.
//!
//! ## Record Kinds
//! ```text
//! ┌───────────────────┬──────────────────┬─────────────┬──────────────────┐
//! │ Kind              │ Sheet name       │ Header rows │ Width            │
//! ├───────────────────┼──────────────────┼─────────────┼──────────────────┤
//! │ ClientLedger      │ Client Data      │ 1           │ 41               │
//! │ StockMaster       │ Stock MM         │ 2           │ 4 + 3 per day    │
//! │ StockInJournal    │ Stock In MM      │ 1           │ 4                │
//! │ StockOutJournal   │ Stock Out MM     │ 1           │ 4                │
//! │ Leads             │ Leads            │ 1           │ 13               │
//! │ Proposals         │ Proposals        │ 1           │ 14               │
//! │ Timeline          │ Timeline         │ 1           │ 5                │
//! │ Credentials       │ Credentials      │ 1           │ 3                │
//! │ Notes             │ Notes            │ 1           │ 3                │
//! │ Tasks             │ Tasks            │ 1           │ 3                │
//! └───────────────────┴──────────────────┴─────────────┴──────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::document::{CellStyle, Sheet};
use crate::error::{CoreError, CoreResult};

// =============================================================================
// Field Descriptors
// =============================================================================

/// How a field's cells are interpreted when read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Number,
    Date,
    /// Free-form status text ("Yes", "Done", a date string...).
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Stable identifier used by callers (`"total_cost"`).
    pub name: &'static str,
    /// Header text written into the header row.
    pub header: &'static str,
    pub column: u32,
    pub kind: ValueKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, header: &'static str, column: u32, kind: ValueKind) -> Self {
        FieldDef {
            name,
            header,
            column,
            kind,
        }
    }
}

const fn text(name: &'static str, header: &'static str, column: u32) -> FieldDef {
    FieldDef::new(name, header, column, ValueKind::Text)
}

const fn number(name: &'static str, header: &'static str, column: u32) -> FieldDef {
    FieldDef::new(name, header, column, ValueKind::Number)
}

const fn date(name: &'static str, header: &'static str, column: u32) -> FieldDef {
    FieldDef::new(name, header, column, ValueKind::Date)
}

const fn flag(name: &'static str, header: &'static str, column: u32) -> FieldDef {
    FieldDef::new(name, header, column, ValueKind::Flag)
}

// =============================================================================
// Sheet Kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    ClientLedger,
    StockMaster,
    StockInJournal,
    StockOutJournal,
    Leads,
    Proposals,
    Timeline,
    Credentials,
    Notes,
    Tasks,
}

impl SheetKind {
    pub fn schema(&self) -> &'static SheetSchema {
        match self {
            SheetKind::ClientLedger => &CLIENT_LEDGER,
            SheetKind::StockMaster => &STOCK_MASTER,
            SheetKind::StockInJournal => &STOCK_IN_JOURNAL,
            SheetKind::StockOutJournal => &STOCK_OUT_JOURNAL,
            SheetKind::Leads => &LEADS,
            SheetKind::Proposals => &PROPOSALS,
            SheetKind::Timeline => &TIMELINE,
            SheetKind::Credentials => &CREDENTIALS,
            SheetKind::Notes => &NOTES,
            SheetKind::Tasks => &TASKS,
        }
    }

    /// Tab name. Monthly kinds take the month (1-12); others ignore it.
    pub fn sheet_name(&self, month: u32) -> String {
        match self {
            SheetKind::ClientLedger => "Client Data".to_string(),
            SheetKind::StockMaster => format!("Stock {:02}", month),
            SheetKind::StockInJournal => format!("Stock In {:02}", month),
            SheetKind::StockOutJournal => format!("Stock Out {:02}", month),
            SheetKind::Leads => "Leads".to_string(),
            SheetKind::Proposals => "Proposals".to_string(),
            SheetKind::Timeline => "Timeline".to_string(),
            SheetKind::Credentials => "Credentials".to_string(),
            SheetKind::Notes => "Notes".to_string(),
            SheetKind::Tasks => "Tasks".to_string(),
        }
    }
}

// =============================================================================
// Sheet Schema
// =============================================================================

#[derive(Debug)]
pub struct SheetSchema {
    pub kind: SheetKind,
    pub header_rows: u32,
    pub fields: &'static [FieldDef],
}

impl SheetSchema {
    /// First row holding records.
    pub fn first_data_row(&self) -> u32 {
        self.header_rows + 1
    }

    pub fn width(&self) -> u32 {
        self.fields.iter().map(|f| f.column).max().unwrap_or(0)
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn column(&self, name: &str) -> CoreResult<u32> {
        self.field(name)
            .map(|f| f.column)
            .ok_or_else(|| CoreError::UnknownField {
                sheet: format!("{:?}", self.kind),
                field: name.to_string(),
            })
    }

    /// Header texts in column order.
    pub fn headers(&self) -> Vec<&'static str> {
        let mut fields: Vec<&FieldDef> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.column);
        fields.iter().map(|f| f.header).collect()
    }

    /// Writes the header row in bold. Used when a sheet is first created.
    pub fn write_headers(&self, sheet: &mut Sheet) {
        for field in self.fields {
            sheet.set_value(1, field.column, field.header);
            sheet.set_style(
                1,
                field.column,
                CellStyle {
                    bold: true,
                    ..CellStyle::default()
                },
            );
        }
    }
}

// =============================================================================
// Client Ledger
// =============================================================================

pub mod client {
    use super::*;

    pub const DATE: FieldDef = date("date", "Date", 1);
    pub const NAME: FieldDef = text("name", "Name", 2);
    pub const ADDRESS: FieldDef = text("address", "Address", 3);
    pub const CITY: FieldDef = text("city", "City", 4);
    pub const STATE: FieldDef = text("state", "State", 5);
    pub const EMAIL: FieldDef = text("email", "Email", 6);
    pub const REFERENCE: FieldDef = text("reference", "Reference", 7);
    pub const PHOTO: FieldDef = text("photo", "Photo", 8);
    pub const ALT_MOBILE: FieldDef = text("alternate_mobile", "Alternate Mobile", 9);
    pub const MOBILE: FieldDef = text("mobile", "Mobile", 10);
    pub const ACCOUNT_NO: FieldDef = text("electricity_account", "Electricity Account No.", 11);
    pub const KW: FieldDef = number("kw", "kW", 12);
    pub const ADVANCE: FieldDef = number("advance", "Advance", 13);
    pub const TOTAL_COST: FieldDef = number("total_cost", "Total Cost", 14);

    // Document paths (uploads/<slug>/<file>)
    pub const DOC_AADHAR_FRONT: FieldDef = text("aadhar_front", "Aadhar Front", 15);
    pub const DOC_AADHAR_BACK: FieldDef = text("aadhar_back", "Aadhar Back", 16);
    pub const DOC_PAN_CARD: FieldDef = text("pan_card", "PAN Card", 17);
    pub const DOC_BILL: FieldDef = text("bill", "Bill", 18);
    pub const DOC_OWNERSHIP_PROOF: FieldDef = text("ownership_proof", "Ownership Proof", 19);
    pub const DOC_CANCEL_CHEQUE: FieldDef = text("cancel_cheque", "Cancel Cheque", 20);
    pub const DOC_PURCHASE_AGREEMENT: FieldDef = text("purchase_agreement", "Purchase Agreement", 21);
    pub const DOC_NET_METERING_AGREEMENT: FieldDef =
        text("net_metering_agreement", "Net Metering Agreement", 22);

    // Application timeline
    pub const APPLIED_KW: FieldDef = flag("applied_kw", "Applied kW", 23);
    pub const APPLIED_PM_SURYA: FieldDef = flag("applied_pm_surya", "Applied on PM Surya", 24);
    pub const APPLICATION_DISCOM: FieldDef = flag("application_discom", "Application DHBVN", 25);
    pub const LOAD_CHANGE: FieldDef = flag("load_change", "Load Change", 26);

    // Project status
    pub const CIVIL: FieldDef = flag("civil", "Civil", 27);
    pub const EARTHING: FieldDef = flag("earthing", "Earthing", 28);
    pub const EARTHING_CABLE: FieldDef = flag("earthing_cable", "Earthing Cable", 29);
    pub const PANEL: FieldDef = flag("panel", "Panel", 30);
    pub const INVERTER: FieldDef = flag("inverter", "Inverter", 31);
    pub const ACDB: FieldDef = flag("acdb", "ACDB", 32);
    pub const DCDB: FieldDef = flag("dcdb", "DCDB", 33);
    pub const AC_CABLE: FieldDef = flag("ac_cable", "AC Cable", 34);
    pub const DC_CABLE: FieldDef = flag("dc_cable", "DC Cable", 35);
    pub const LA: FieldDef = flag("la", "LA", 36);
    pub const NET_METERING: FieldDef = flag("net_metering", "Net Metering", 37);

    // Payments
    pub const INSTALLMENT_2: FieldDef = text("installment_2", "2nd Installment", 38);
    pub const INSTALLMENT_3: FieldDef = text("installment_3", "3rd Installment", 39);
    pub const FINAL_PAYMENT: FieldDef = text("final_payment", "Final Payment", 40);
    pub const BALANCE: FieldDef = number("balance", "Balance", 41);

    pub const DOCUMENTS: [FieldDef; 8] = [
        DOC_AADHAR_FRONT,
        DOC_AADHAR_BACK,
        DOC_PAN_CARD,
        DOC_BILL,
        DOC_OWNERSHIP_PROOF,
        DOC_CANCEL_CHEQUE,
        DOC_PURCHASE_AGREEMENT,
        DOC_NET_METERING_AGREEMENT,
    ];

    pub const APPLICATION: [FieldDef; 4] =
        [APPLIED_KW, APPLIED_PM_SURYA, APPLICATION_DISCOM, LOAD_CHANGE];

    pub const PROJECT_STEPS: [FieldDef; 11] = [
        CIVIL,
        EARTHING,
        EARTHING_CABLE,
        PANEL,
        INVERTER,
        ACDB,
        DCDB,
        AC_CABLE,
        DC_CABLE,
        LA,
        NET_METERING,
    ];

    pub const FIELDS: &[FieldDef] = &[
        DATE,
        NAME,
        ADDRESS,
        CITY,
        STATE,
        EMAIL,
        REFERENCE,
        PHOTO,
        ALT_MOBILE,
        MOBILE,
        ACCOUNT_NO,
        KW,
        ADVANCE,
        TOTAL_COST,
        DOC_AADHAR_FRONT,
        DOC_AADHAR_BACK,
        DOC_PAN_CARD,
        DOC_BILL,
        DOC_OWNERSHIP_PROOF,
        DOC_CANCEL_CHEQUE,
        DOC_PURCHASE_AGREEMENT,
        DOC_NET_METERING_AGREEMENT,
        APPLIED_KW,
        APPLIED_PM_SURYA,
        APPLICATION_DISCOM,
        LOAD_CHANGE,
        CIVIL,
        EARTHING,
        EARTHING_CABLE,
        PANEL,
        INVERTER,
        ACDB,
        DCDB,
        AC_CABLE,
        DC_CABLE,
        LA,
        NET_METERING,
        INSTALLMENT_2,
        INSTALLMENT_3,
        FINAL_PAYMENT,
        BALANCE,
    ];
}

pub static CLIENT_LEDGER: SheetSchema = SheetSchema {
    kind: SheetKind::ClientLedger,
    header_rows: 1,
    fields: client::FIELDS,
};

// =============================================================================
// Stock Master & Journals
// =============================================================================

pub mod stock {
    use super::*;

    pub const MATERIAL: FieldDef = text("material", "Material", 1);
    pub const OPENING: FieldDef = number("opening_stock", "Opening Stock", 2);
    pub const CURRENT: FieldDef = number("current_stock", "Current Stock", 3);
    pub const MINIMUM: FieldDef = number("min_stock", "Min Stock", 4);

    /// Column of the first date-block.
    pub const FIRST_DATE_COLUMN: u32 = 5;
    /// Columns per date-block: In, Out, Remarks.
    pub const BLOCK_WIDTH: u32 = 3;

    pub const FIELDS: &[FieldDef] = &[MATERIAL, OPENING, CURRENT, MINIMUM];
}

pub static STOCK_MASTER: SheetSchema = SheetSchema {
    kind: SheetKind::StockMaster,
    header_rows: 2,
    fields: stock::FIELDS,
};

pub mod stock_in {
    use super::*;

    pub const DATE: FieldDef = date("date", "Date", 1);
    pub const MATERIAL: FieldDef = text("material", "Material", 2);
    pub const INVOICE: FieldDef = text("invoice", "Invoice No.", 3);
    pub const QUANTITY: FieldDef = number("quantity", "Quantity", 4);

    pub const FIELDS: &[FieldDef] = &[DATE, MATERIAL, INVOICE, QUANTITY];
}

pub static STOCK_IN_JOURNAL: SheetSchema = SheetSchema {
    kind: SheetKind::StockInJournal,
    header_rows: 1,
    fields: stock_in::FIELDS,
};

pub mod stock_out {
    use super::*;

    pub const DATE: FieldDef = date("date", "Date", 1);
    pub const MATERIAL: FieldDef = text("material", "Material", 2);
    pub const QUANTITY: FieldDef = number("quantity", "Quantity", 3);
    pub const REMARKS: FieldDef = text("remarks", "Remarks", 4);

    pub const FIELDS: &[FieldDef] = &[DATE, MATERIAL, QUANTITY, REMARKS];
}

pub static STOCK_OUT_JOURNAL: SheetSchema = SheetSchema {
    kind: SheetKind::StockOutJournal,
    header_rows: 1,
    fields: stock_out::FIELDS,
};

// =============================================================================
// Leads
// =============================================================================

pub mod lead {
    use super::*;

    pub const DATE: FieldDef = date("date", "Date", 1);
    pub const NAME: FieldDef = text("name", "Consumer name", 2);
    pub const ADDRESS: FieldDef = text("address", "Address", 3);
    pub const MOBILE: FieldDef = text("mobile", "Mobile", 4);
    pub const REF_NO: FieldDef = text("ref_no", "Ref no.", 5);
    pub const KW: FieldDef = number("kw", "kW", 6);
    pub const REFERENCE: FieldDef = text("reference", "Reference", 7);
    pub const CALL: FieldDef = flag("call", "Call", 8);
    pub const PROPOSAL: FieldDef = flag("proposal", "Proposal", 9);
    pub const MEETING: FieldDef = flag("meeting", "Meeting", 10);
    pub const REMINDER: FieldDef = flag("reminder", "Reminder", 11);
    pub const STATUS: FieldDef = flag("status", "Status", 12);
    pub const FINAL: FieldDef = flag("final", "Final", 13);

    pub const FIELDS: &[FieldDef] = &[
        DATE, NAME, ADDRESS, MOBILE, REF_NO, KW, REFERENCE, CALL, PROPOSAL, MEETING, REMINDER,
        STATUS, FINAL,
    ];
}

pub static LEADS: SheetSchema = SheetSchema {
    kind: SheetKind::Leads,
    header_rows: 1,
    fields: lead::FIELDS,
};

// =============================================================================
// Proposals
// =============================================================================

pub mod proposal {
    use super::*;

    pub const REF_NO: FieldDef = text("ref", "Ref", 1);
    pub const DATE: FieldDef = date("date", "Date", 2);
    pub const SUBSIDY: FieldDef = text("subsidy", "Subsidy", 3);
    pub const KW: FieldDef = number("kw", "KW", 4);
    pub const ADDRESS: FieldDef = text("address", "Address", 5);
    pub const STATE: FieldDef = text("state", "State", 6);
    pub const CITY: FieldDef = text("city", "City", 7);
    pub const TO_WHOM: FieldDef = text("to_whom", "To Whom", 8);
    pub const MOBILE: FieldDef = text("mobile", "Mobile", 9);
    pub const PRICE: FieldDef = number("price", "Price", 10);
    pub const PANEL_BRAND: FieldDef = text("panel_brand", "Panel Brand", 11);
    pub const PANEL_WP: FieldDef = text("panel_wp", "Panel Wp", 12);
    pub const INVERTER_BRAND: FieldDef = text("inverter_brand", "Inverter Brand", 13);
    pub const SENT_BY: FieldDef = text("sent_by", "sentBy", 14);

    pub const FIELDS: &[FieldDef] = &[
        REF_NO,
        DATE,
        SUBSIDY,
        KW,
        ADDRESS,
        STATE,
        CITY,
        TO_WHOM,
        MOBILE,
        PRICE,
        PANEL_BRAND,
        PANEL_WP,
        INVERTER_BRAND,
        SENT_BY,
    ];
}

pub static PROPOSALS: SheetSchema = SheetSchema {
    kind: SheetKind::Proposals,
    header_rows: 1,
    fields: proposal::FIELDS,
};

// =============================================================================
// Timeline & Credentials
// =============================================================================

pub mod timeline {
    use super::*;

    pub const CLIENT: FieldDef = text("client_name", "Client Name", 1);
    pub const EVENT: FieldDef = text("event", "Event", 2);
    pub const EVENT_DATE: FieldDef = date("event_date", "Event Date", 3);
    pub const DESCRIPTION: FieldDef = text("description", "Event Description", 4);
    pub const STATUS: FieldDef = flag("status", "Status", 5);

    pub const FIELDS: &[FieldDef] = &[CLIENT, EVENT, EVENT_DATE, DESCRIPTION, STATUS];
}

pub static TIMELINE: SheetSchema = SheetSchema {
    kind: SheetKind::Timeline,
    header_rows: 1,
    fields: timeline::FIELDS,
};

pub mod credential {
    use super::*;

    pub const EMAIL: FieldDef = text("email", "Email", 1);
    pub const DISPLAY_NAME: FieldDef = text("display_name", "Display Name", 2);
    pub const ROLE: FieldDef = text("role", "Role", 3);

    pub const FIELDS: &[FieldDef] = &[EMAIL, DISPLAY_NAME, ROLE];
}

pub static CREDENTIALS: SheetSchema = SheetSchema {
    kind: SheetKind::Credentials,
    header_rows: 1,
    fields: credential::FIELDS,
};

// =============================================================================
// Notes & Tasks
// =============================================================================

pub mod note {
    use super::*;

    pub const DATE: FieldDef = date("date", "Date", 1);
    pub const CLIENT: FieldDef = text("client", "Client", 2);
    pub const TEXT: FieldDef = text("note", "Note", 3);

    pub const FIELDS: &[FieldDef] = &[DATE, CLIENT, TEXT];
}

pub static NOTES: SheetSchema = SheetSchema {
    kind: SheetKind::Notes,
    header_rows: 1,
    fields: note::FIELDS,
};

pub mod task {
    use super::*;

    pub const DATE: FieldDef = date("date", "Date", 1);
    pub const TIME: FieldDef = text("time", "Time", 2);
    pub const DESCRIPTION: FieldDef = text("description", "Description", 3);

    pub const FIELDS: &[FieldDef] = &[DATE, TIME, DESCRIPTION];
}

pub static TASKS: SheetSchema = SheetSchema {
    kind: SheetKind::Tasks,
    header_rows: 1,
    fields: task::FIELDS,
};

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [SheetKind; 10] = [
        SheetKind::ClientLedger,
        SheetKind::StockMaster,
        SheetKind::StockInJournal,
        SheetKind::StockOutJournal,
        SheetKind::Leads,
        SheetKind::Proposals,
        SheetKind::Timeline,
        SheetKind::Credentials,
        SheetKind::Notes,
        SheetKind::Tasks,
    ];

    #[test]
    fn test_columns_are_unique_and_contiguous() {
        for kind in ALL {
            let schema = kind.schema();
            let columns: HashSet<u32> = schema.fields.iter().map(|f| f.column).collect();
            assert_eq!(columns.len(), schema.fields.len(), "{:?}", kind);
            assert_eq!(schema.width() as usize, schema.fields.len(), "{:?}", kind);

            let names: HashSet<&str> = schema.fields.iter().map(|f| f.name).collect();
            assert_eq!(names.len(), schema.fields.len(), "{:?}", kind);
        }
    }

    #[test]
    fn test_client_ledger_layout() {
        assert_eq!(CLIENT_LEDGER.width(), 41);
        assert_eq!(CLIENT_LEDGER.column("total_cost").unwrap(), 14);
        assert_eq!(CLIENT_LEDGER.column("balance").unwrap(), 41);
        assert_eq!(client::PROJECT_STEPS[0].column, 27);
        assert_eq!(client::PROJECT_STEPS[10].column, 37);
        assert!(CLIENT_LEDGER.column("nope").is_err());
    }

    #[test]
    fn test_sheet_names() {
        assert_eq!(SheetKind::StockMaster.sheet_name(3), "Stock 03");
        assert_eq!(SheetKind::StockInJournal.sheet_name(11), "Stock In 11");
        assert_eq!(SheetKind::StockOutJournal.sheet_name(1), "Stock Out 01");
        assert_eq!(SheetKind::Leads.sheet_name(0), "Leads");
    }

    #[test]
    fn test_write_headers() {
        let mut sheet = Sheet::new("Stock In 03");
        STOCK_IN_JOURNAL.write_headers(&mut sheet);
        assert_eq!(
            sheet.row(1).texts(4),
            vec!["Date", "Material", "Invoice No.", "Quantity"]
        );
        assert!(sheet.style(1, 1).bold);
        assert_eq!(STOCK_MASTER.first_data_row(), 3);
    }
}

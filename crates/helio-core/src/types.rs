//! # Domain Types
//!
//! Inputs and read models exchanged with callers. Workbook rows are the
//! storage format; these structs are what crosses the crate boundary.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Stock              Clients               Leads / Proposals             │
//! │  ─────────────      ──────────────────    ─────────────────────         │
//! │  StockMovement      ClientIntake          NewLead, Lead, LeadField      │
//! │  StockDirection     ClientRef             NewProposal, ProposalFields   │
//! │  DailyMovement      ClientRecord          TransferSummary               │
//! │                     ApplicationTimeline                                 │
//! │                     ProjectStatus         Timeline / Credentials        │
//! │                     PaymentStatus         ─────────────────────         │
//! │                     DashboardStats        TimelineEvent, Credential     │
//! │                     PaymentDue            NewNote, Note, NewTask, Task  │
//! │                     PaymentBreakdown                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schema::{lead, FieldDef};

// =============================================================================
// Stock
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    In,
    Out,
}

impl fmt::Display for StockDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockDirection::In => write!(f, "in"),
            StockDirection::Out => write!(f, "out"),
        }
    }
}

impl FromStr for StockDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(StockDirection::In),
            "out" => Ok(StockDirection::Out),
            _ => Err(ValidationError::NotAllowed {
                field: "direction".to_string(),
                allowed: vec!["in".to_string(), "out".to_string()],
            }),
        }
    }
}

/// One stock-in or stock-out event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub date: NaiveDate,
    pub material: String,
    pub quantity: f64,
    pub direction: StockDirection,
    /// Supplier invoice, stock-in only.
    pub invoice: Option<String>,
    /// Free text, stock-out only.
    pub remarks: Option<String>,
}

impl StockMovement {
    pub fn stock_in(date: NaiveDate, material: &str, invoice: &str, quantity: f64) -> Self {
        StockMovement {
            date,
            material: material.trim().to_string(),
            quantity,
            direction: StockDirection::In,
            invoice: Some(invoice.trim().to_string()),
            remarks: None,
        }
    }

    pub fn stock_out(date: NaiveDate, material: &str, quantity: f64, remarks: Option<&str>) -> Self {
        StockMovement {
            date,
            material: material.trim().to_string(),
            quantity,
            direction: StockDirection::Out,
            invoice: None,
            remarks: remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
        }
    }
}

/// Movements of one material on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMovement {
    pub material: String,
    pub stock_in: f64,
    pub stock_out: f64,
    pub remarks: String,
}

// =============================================================================
// Clients
// =============================================================================

/// Intake form of a new (or returning) client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientIntake {
    pub date: NaiveDate,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub email: String,
    pub reference: String,
    pub alternate_mobile: String,
    pub mobile: String,
    pub electricity_account: String,
    pub kw: f64,
    pub advance: f64,
    pub total_cost: f64,
    /// Extension of the uploaded photo (`jpg`, `png`), when one was sent.
    pub photo_extension: Option<String>,
}

/// Identifies a client row: name, system size and mobile number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRef {
    pub name: String,
    pub kw: f64,
    pub mobile: String,
}

/// Every column of a client row keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub row: u32,
    pub fields: BTreeMap<String, String>,
}

impl ClientRecord {
    pub fn get(&self, field: &FieldDef) -> &str {
        self.fields.get(field.name).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationTimeline {
    pub applied_kw: String,
    pub applied_pm_surya: String,
    pub application_discom: String,
    pub load_change: String,
}

/// Installation checklist keyed by step name (`civil`, `panel`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub steps: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub installment_2: String,
    pub installment_3: String,
    pub final_payment: String,
    pub balance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub clients: u32,
    pub total_sales_revenue: f64,
    pub total_payment_received: f64,
    pub total_balance: f64,
    pub plants_installed: u32,
    /// Clients whose PM Surya application is filed (anything but blank/"no").
    pub applications_applied: u32,
    pub applications_pending: u32,
}

/// Installment totals across the ledger, as drawn on the dashboard bar graph.
///
/// The second installment falls due once advance plus 60% of the contract
/// value is collected; the final installment is whatever the advance and
/// second installment leave of the total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    pub total_cost: f64,
    pub advance: f64,
    pub second_installment_received: f64,
    pub second_installment_due: f64,
    pub final_installment_received: f64,
    pub final_installment_due: f64,
}

/// A client with an outstanding balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDue {
    pub name: String,
    pub mobile: String,
    pub kw: String,
    pub total_cost: f64,
    pub installment_2: String,
    pub installment_3: String,
    pub final_payment: String,
    pub balance: f64,
}

// =============================================================================
// Leads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub date: NaiveDate,
    pub name: String,
    pub address: String,
    pub mobile: String,
    pub kw: f64,
    pub reference: String,
}

/// A lead as listed to callers. `index` is 0-based over the data rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub index: usize,
    pub date: String,
    pub name: String,
    pub address: String,
    pub mobile: String,
    pub ref_no: String,
    pub kw: String,
    pub reference: String,
    pub call: String,
    pub proposal: String,
    pub meeting: String,
    pub reminder: String,
    pub status: String,
    #[serde(rename = "final")]
    pub final_status: String,
}

/// Follow-up columns of a lead that may be edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    Call,
    Proposal,
    Meeting,
    Reminder,
    Status,
    Final,
}

impl LeadField {
    pub fn def(&self) -> FieldDef {
        match self {
            LeadField::Call => lead::CALL,
            LeadField::Proposal => lead::PROPOSAL,
            LeadField::Meeting => lead::MEETING,
            LeadField::Reminder => lead::REMINDER,
            LeadField::Status => lead::STATUS,
            LeadField::Final => lead::FINAL,
        }
    }
}

impl FromStr for LeadField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "call" => Ok(LeadField::Call),
            "proposal" => Ok(LeadField::Proposal),
            "meeting" => Ok(LeadField::Meeting),
            "reminder" => Ok(LeadField::Reminder),
            "status" => Ok(LeadField::Status),
            "final" => Ok(LeadField::Final),
            _ => Err(ValidationError::NotAllowed {
                field: "lead field".to_string(),
                allowed: ["call", "proposal", "meeting", "reminder", "status", "final"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Proposals
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProposal {
    pub date: NaiveDate,
    pub subsidy: String,
    pub kw: f64,
    pub address: String,
    pub state: String,
    pub city: String,
    pub to_whom: String,
    pub mobile: String,
    pub price: f64,
    pub panel_brand: String,
    pub panel_wp: String,
    pub inverter_brand: String,
    pub sent_by: String,
}

/// A proposal row keyed by its header, lowercased with spaces removed
/// (`"To Whom"` → `"towhom"`).
pub type ProposalFields = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSummary {
    pub replaced: usize,
    pub appended: usize,
}

// =============================================================================
// Timeline & Credentials
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub client_name: String,
    pub event: String,
    pub event_date: NaiveDate,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub email: String,
    pub display_name: String,
    pub role: String,
}

// =============================================================================
// Notes & Tasks
// =============================================================================

/// A dashboard note. `client` is blank for general notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub date: NaiveDate,
    #[serde(default)]
    pub client: String,
    pub text: String,
}

/// A stored note; `index` is its position among all notes, for deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub index: usize,
    pub date: String,
    pub client: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub date: NaiveDate,
    /// Free text such as `"11:30"` or `"after lunch"`.
    #[serde(default)]
    pub time: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub index: usize,
    pub date: String,
    pub time: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing() {
        assert_eq!("IN".parse::<StockDirection>().unwrap(), StockDirection::In);
        assert_eq!(StockDirection::Out.to_string(), "out");
        assert!("sideways".parse::<StockDirection>().is_err());
    }

    #[test]
    fn test_lead_field_columns() {
        assert_eq!("call".parse::<LeadField>().unwrap().def().column, 8);
        assert_eq!(LeadField::Final.def().column, 13);
        assert!("name".parse::<LeadField>().is_err());
    }

    #[test]
    fn test_lead_serializes_final_column() {
        let lead = Lead {
            index: 0,
            date: "2024-05-02".to_string(),
            name: "Amit".to_string(),
            address: String::new(),
            mobile: "9812345678".to_string(),
            ref_no: "A0001".to_string(),
            kw: "3".to_string(),
            reference: String::new(),
            call: String::new(),
            proposal: String::new(),
            meeting: String::new(),
            reminder: String::new(),
            status: String::new(),
            final_status: "Won".to_string(),
        };
        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["final"], "Won");
        assert!(json.get("final_status").is_none());
    }

    #[test]
    fn test_stock_out_drops_blank_remarks() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let movement = StockMovement::stock_out(date, " Panel ", 3.0, Some("  "));
        assert_eq!(movement.material, "Panel");
        assert_eq!(movement.remarks, None);
    }
}

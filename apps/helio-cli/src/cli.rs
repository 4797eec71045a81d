//! Command-line surface. Every command maps to one repository call.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use helio_core::{dates::parse_input_date, ClientRef, LeadField};

#[derive(Debug, Parser)]
#[command(name = "helio", version, about = "Spreadsheet-backed CRM for solar installations")]
pub struct Cli {
    /// Config file (defaults to the platform config dir's helio.toml).
    #[arg(long, global = true, env = "HELIO_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the workbooks. Overrides the config file.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a config file and lay out the stock sheets of a month.
    Init {
        /// Any day of the month to prepare.
        #[arg(long, value_parser = parse_date)]
        month: Option<NaiveDate>,
    },

    /// Print the effective configuration.
    Config,

    #[command(subcommand)]
    Stock(StockCommand),

    #[command(subcommand)]
    Client(ClientCommand),

    #[command(subcommand)]
    Lead(LeadCommand),

    #[command(subcommand)]
    Proposal(ProposalCommand),

    #[command(subcommand)]
    Timeline(TimelineCommand),

    #[command(subcommand)]
    Staff(StaffCommand),

    #[command(subcommand)]
    Note(NoteCommand),

    #[command(subcommand)]
    Task(TaskCommand),

    /// Client counts, revenue and balances.
    Dashboard,

    /// Clients with an outstanding balance.
    PaymentsDue,

    /// Installments received and still due, summed over all clients.
    PaymentBreakdown,
}

// =============================================================================
// Stock
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum StockCommand {
    /// Record material received against a supplier invoice.
    In {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long)]
        material: String,
        #[arg(long)]
        invoice: String,
        #[arg(long, short)]
        quantity: f64,
    },

    /// Record material issued to a site.
    Out {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long)]
        material: String,
        #[arg(long, short)]
        quantity: f64,
        #[arg(long)]
        remarks: Option<String>,
    },

    /// Set a material's opening stock for the month of `date`.
    Opening {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long)]
        material: String,
        #[arg(long, short)]
        quantity: f64,
    },

    Current {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long)]
        material: String,
    },

    Summary {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// Materials at or below minimum stock.
    Low {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// Movements recorded on one day.
    OnDate {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
}

// =============================================================================
// Clients
// =============================================================================

/// Identifies a client row: name, kW and mobile.
#[derive(Debug, Clone, Args)]
pub struct ClientArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub kw: f64,
    #[arg(long)]
    pub mobile: String,
}

impl ClientArgs {
    pub fn to_ref(&self) -> ClientRef {
        ClientRef {
            name: self.name.clone(),
            kw: self.kw,
            mobile: self.mobile.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    /// Insert or update a client from a JSON intake file.
    Upsert {
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },

    Get {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Clients whose name contains the query.
    Search { query: String },

    SetApplication {
        #[command(flatten)]
        client: ClientArgs,
        #[arg(long, default_value = "")]
        applied_kw: String,
        #[arg(long, default_value = "")]
        pm_surya: String,
        #[arg(long, default_value = "")]
        discom: String,
        #[arg(long, default_value = "")]
        load_change: String,
    },

    Application {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Record project steps as `step=value` pairs.
    SetProject {
        #[command(flatten)]
        client: ClientArgs,
        #[arg(long = "step", value_parser = parse_step)]
        steps: Vec<(String, String)>,
    },

    Project {
        #[command(flatten)]
        client: ClientArgs,
    },

    SetPayment {
        #[command(flatten)]
        client: ClientArgs,
        #[arg(long, default_value = "")]
        installment_2: String,
        #[arg(long, default_value = "")]
        installment_3: String,
        #[arg(long, default_value = "")]
        final_payment: String,
        #[arg(long)]
        balance: Option<f64>,
    },

    Payment {
        #[command(flatten)]
        client: ClientArgs,
    },
}

// =============================================================================
// Leads & Proposals
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum LeadCommand {
    Add {
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long)]
        mobile: String,
        #[arg(long)]
        kw: f64,
        #[arg(long, default_value = "")]
        reference: String,
    },

    /// Edit a follow-up column (call, proposal, meeting, reminder, status, final).
    Update {
        index: usize,
        field: LeadField,
        value: String,
    },

    Delete { index: usize },

    List,

    NextRef,
}

#[derive(Debug, Subcommand)]
pub enum ProposalCommand {
    /// Store a proposal from a JSON file.
    Save {
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },

    Get { ref_no: String },

    List,

    NextRef,

    /// Copy every proposal into the lead list.
    Transfer,

    /// Fill an HTML template with a stored proposal.
    Html {
        ref_no: String,
        #[arg(long, value_name = "PATH")]
        template: PathBuf,
        /// Output file; stdout when absent.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

// =============================================================================
// Timeline & Staff
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum TimelineCommand {
    Add {
        #[arg(long)]
        client: String,
        #[arg(long)]
        event: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        status: String,
    },

    List {
        #[arg(long)]
        client: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum StaffCommand {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: String,
    },

    Find { email: String },

    List,
}

// =============================================================================
// Notes & Tasks
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum NoteCommand {
    Add {
        text: String,
        /// Client the note is about; blank for a general note.
        #[arg(long, default_value = "")]
        client: String,
        /// Defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    List {
        #[arg(long)]
        client: Option<String>,
    },

    /// Delete by the index shown in `note list`.
    Delete { index: usize },
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    Add {
        description: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        time: String,
    },

    List,

    Delete { index: usize },
}

// =============================================================================
// Value Parsers
// =============================================================================

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    parse_input_date(text).map_err(|e| e.to_string())
}

fn parse_step(text: &str) -> Result<(String, String), String> {
    let (step, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected step=value, got '{}'", text))?;
    let step = step.trim();
    if step.is_empty() {
        return Err("step name is empty".to_string());
    }
    Ok((step.to_string(), value.trim().to_string()))
}

//! # Helio CLI
//!
//! Command-line front end for the Helio CRM workbooks.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        helio (binary)                                   │
//! │                                                                         │
//! │  args (clap) ──► StoreConfig::load(--config) ──► --data-dir override   │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                       Ledger::open_local(&config)                      │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                  one repository call ──► JSON on stdout                │
//! │                                                                         │
//! │  Logs go to stderr (RUST_LOG overrides the default filter).           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cli;

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use helio_core::schema::client::PROJECT_STEPS;
use helio_core::{
    ApplicationTimeline, ClientIntake, Credential, NewLead, NewNote, NewProposal, NewTask,
    PaymentStatus, ProjectStatus, TimelineEvent,
};
use helio_store::{fill_template, Ledger, StoreConfig};

use crate::cli::{
    Cli, ClientCommand, Command, LeadCommand, NoteCommand, ProposalCommand, StaffCommand,
    StockCommand, TaskCommand, TimelineCommand,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = StoreConfig::load(cli.config.clone()).context("loading configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    debug!(data_dir = %config.storage.data_dir.display(), "configuration ready");

    run(cli, config).await
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Everything at debug
/// - `RUST_LOG=helio_store=trace` - Trace the store layer only
/// - Default: info, debug for the CLI and store layer
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,helio_cli=debug,helio_store=debug,helio_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn run(cli: Cli, config: StoreConfig) -> Result<()> {
    match cli.command {
        Command::Init { month } => {
            let path = cli.config.or_else(StoreConfig::default_config_path);
            config.save(path.clone())?;
            info!(?path, "configuration written");

            let ledger = Ledger::open_local(&config);
            let month = month.unwrap_or_else(|| Local::now().date_naive());
            let created = ledger.stock().initialize_month(month).await?;
            print_json(&serde_json::json!({
                "config": path,
                "data_dir": config.storage.data_dir,
                "stock_month_created": created,
            }))
        }
        Command::Config => print_json(&config),
        Command::Stock(cmd) => stock(&Ledger::open_local(&config), cmd).await,
        Command::Client(cmd) => client(&Ledger::open_local(&config), cmd).await,
        Command::Lead(cmd) => lead(&Ledger::open_local(&config), cmd).await,
        Command::Proposal(cmd) => proposal(&Ledger::open_local(&config), cmd).await,
        Command::Timeline(cmd) => timeline(&Ledger::open_local(&config), cmd).await,
        Command::Staff(cmd) => staff(&Ledger::open_local(&config), cmd).await,
        Command::Note(cmd) => note(&Ledger::open_local(&config), cmd).await,
        Command::Task(cmd) => task(&Ledger::open_local(&config), cmd).await,
        Command::Dashboard => print_json(&Ledger::open_local(&config).clients().dashboard().await?),
        Command::PaymentsDue => {
            print_json(&Ledger::open_local(&config).clients().payments_due().await?)
        }
        Command::PaymentBreakdown => {
            print_json(&Ledger::open_local(&config).clients().payment_breakdown().await?)
        }
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn stock(ledger: &Ledger, cmd: StockCommand) -> Result<()> {
    let repo = ledger.stock();
    match cmd {
        StockCommand::In { date, material, invoice, quantity } => {
            print_json(&repo.stock_in(date, &material, &invoice, quantity).await?)
        }
        StockCommand::Out { date, material, quantity, remarks } => {
            let levels = repo
                .stock_out(date, &material, quantity, remarks.as_deref())
                .await?;
            if levels.alert {
                eprintln!(
                    "warning: {} is at {} (minimum {})",
                    levels.material, levels.current, levels.minimum
                );
            }
            print_json(&levels)
        }
        StockCommand::Opening { date, material, quantity } => {
            print_json(&repo.set_opening_stock(date, &material, quantity).await?)
        }
        StockCommand::Current { month, material } => {
            print_json(&repo.current_stock(month, &material).await?)
        }
        StockCommand::Summary { month } => print_json(&repo.summary(month).await?),
        StockCommand::Low { month } => print_json(&repo.low_stock(month).await?),
        StockCommand::OnDate { date } => print_json(&repo.on_date(date).await?),
    }
}

async fn client(ledger: &Ledger, cmd: ClientCommand) -> Result<()> {
    let repo = ledger.clients();
    match cmd {
        ClientCommand::Upsert { file } => {
            let intake: ClientIntake = read_json(&file).await?;
            let located = repo.upsert(&intake).await?;
            print_json(&serde_json::json!({
                "row": located.row(),
                "created": located.was_created(),
            }))
        }
        ClientCommand::Get { client } => print_json(&repo.get(&client.to_ref()).await?),
        ClientCommand::Search { query } => print_json(&repo.search(&query).await?),
        ClientCommand::SetApplication { client, applied_kw, pm_surya, discom, load_change } => {
            let timeline = ApplicationTimeline {
                applied_kw,
                applied_pm_surya: pm_surya,
                application_discom: discom,
                load_change,
            };
            repo.save_application_timeline(&client.to_ref(), &timeline).await?;
            print_json(&timeline)
        }
        ClientCommand::Application { client } => {
            print_json(&repo.application_timeline(&client.to_ref()).await?)
        }
        ClientCommand::SetProject { client, steps } => {
            for (step, _) in &steps {
                if !PROJECT_STEPS.iter().any(|s| s.name == step.as_str()) {
                    let known: Vec<_> = PROJECT_STEPS.iter().map(|s| s.name).collect();
                    bail!("unknown project step '{}', expected one of: {}", step, known.join(", "));
                }
            }
            let status = ProjectStatus {
                steps: steps.into_iter().collect(),
            };
            repo.save_project_status(&client.to_ref(), &status).await?;
            print_json(&status)
        }
        ClientCommand::Project { client } => print_json(&repo.project_status(&client.to_ref()).await?),
        ClientCommand::SetPayment {
            client,
            installment_2,
            installment_3,
            final_payment,
            balance,
        } => {
            let payment = PaymentStatus {
                installment_2,
                installment_3,
                final_payment,
                balance,
            };
            repo.save_payment_status(&client.to_ref(), &payment).await?;
            print_json(&payment)
        }
        ClientCommand::Payment { client } => print_json(&repo.payment_status(&client.to_ref()).await?),
    }
}

async fn lead(ledger: &Ledger, cmd: LeadCommand) -> Result<()> {
    let repo = ledger.leads();
    match cmd {
        LeadCommand::Add { date, name, address, mobile, kw, reference } => {
            let new_lead = NewLead {
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                name,
                address,
                mobile,
                kw,
                reference,
            };
            let ref_no = repo.add(&new_lead).await?;
            print_json(&serde_json::json!({ "ref_no": ref_no }))
        }
        LeadCommand::Update { index, field, value } => {
            repo.update_field(index, field, &value).await?;
            print_json(&serde_json::json!({ "index": index, "field": field, "value": value }))
        }
        LeadCommand::Delete { index } => {
            repo.delete(index).await?;
            print_json(&serde_json::json!({ "deleted": index }))
        }
        LeadCommand::List => print_json(&repo.list().await?),
        LeadCommand::NextRef => print_json(&serde_json::json!({ "ref_no": repo.next_ref_no().await? })),
    }
}

async fn proposal(ledger: &Ledger, cmd: ProposalCommand) -> Result<()> {
    let repo = ledger.proposals();
    match cmd {
        ProposalCommand::Save { file } => {
            let new_proposal: NewProposal = read_json(&file).await?;
            let ref_no = repo.save(&new_proposal).await?;
            print_json(&serde_json::json!({ "ref_no": ref_no }))
        }
        ProposalCommand::Get { ref_no } => print_json(&repo.get(&ref_no).await?),
        ProposalCommand::List => print_json(&repo.list().await?),
        ProposalCommand::NextRef => print_json(&serde_json::json!({ "ref_no": repo.next_ref().await? })),
        ProposalCommand::Transfer => print_json(&repo.transfer_to_leads().await?),
        ProposalCommand::Html { ref_no, template, out } => {
            let fields = repo.get(&ref_no).await?;
            let template = tokio::fs::read_to_string(&template)
                .await
                .with_context(|| format!("reading {}", template.display()))?;
            let html = fill_template(&template, &fields);
            match out {
                Some(path) => {
                    tokio::fs::write(&path, html)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(ref_no = %ref_no, path = %path.display(), "proposal html written");
                    Ok(())
                }
                None => {
                    println!("{}", html);
                    Ok(())
                }
            }
        }
    }
}

async fn timeline(ledger: &Ledger, cmd: TimelineCommand) -> Result<()> {
    let repo = ledger.timeline();
    match cmd {
        TimelineCommand::Add { client, event, date, description, status } => {
            let event = TimelineEvent {
                client_name: client,
                event,
                event_date: date,
                description,
                status,
            };
            let row = repo.add(&event).await?;
            print_json(&serde_json::json!({ "row": row }))
        }
        TimelineCommand::List { client } => print_json(&repo.events_for(&client).await?),
    }
}

async fn staff(ledger: &Ledger, cmd: StaffCommand) -> Result<()> {
    let repo = ledger.credentials();
    match cmd {
        StaffCommand::Add { email, name, role } => {
            let entry = Credential {
                email,
                display_name: name,
                role,
            };
            let row = repo.add(&entry).await?;
            print_json(&serde_json::json!({ "row": row, "email": entry.email }))
        }
        StaffCommand::Find { email } => match repo.find(&email).await? {
            Some(found) => print_json(&found),
            None => bail!("no staff member with email {}", email),
        },
        StaffCommand::List => print_json(&repo.list().await?),
    }
}

async fn note(ledger: &Ledger, cmd: NoteCommand) -> Result<()> {
    let repo = ledger.notes();
    match cmd {
        NoteCommand::Add { text, client, date } => {
            let new_note = NewNote {
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                client,
                text,
            };
            let row = repo.add_note(&new_note).await?;
            print_json(&serde_json::json!({ "row": row }))
        }
        NoteCommand::List { client } => print_json(&repo.notes(client.as_deref()).await?),
        NoteCommand::Delete { index } => print_json(&repo.delete_note(index).await?),
    }
}

async fn task(ledger: &Ledger, cmd: TaskCommand) -> Result<()> {
    let repo = ledger.notes();
    match cmd {
        TaskCommand::Add { description, date, time } => {
            let row = repo.add_task(&NewTask { date, time, description }).await?;
            print_json(&serde_json::json!({ "row": row }))
        }
        TaskCommand::List => print_json(&repo.tasks().await?),
        TaskCommand::Delete { index } => print_json(&repo.delete_task(index).await?),
    }
}

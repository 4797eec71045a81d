//! # Repository Module
//!
//! One repository per business area, each bound to one workbook key.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command                                                           │
//! │       │                                                                 │
//! │       │  ledger.stock().stock_out(date, "Panel", 25.0, None)           │
//! │       ▼                                                                 │
//! │  StockRepository                                                       │
//! │  ├── validates input (no fetch on bad input)                           │
//! │  ├── picks the helio-core operation                                    │
//! │  └── hands it to the Orchestrator                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Orchestrator: fetch → parse → mutate → serialize → store              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`StockRepository`] - Movements, opening stock, stock reports
//! - [`ClientRepository`] - Client intake, follow-ups, dashboard
//! - [`LeadRepository`] - Lead pipeline
//! - [`ProposalRepository`] - Quotations, transfer to leads, rendering
//! - [`TimelineRepository`] - Client event log
//! - [`CredentialRepository`] - Staff directory
//! - [`NotesRepository`] - Dashboard notes and tasks

pub mod clients;
pub mod credentials;
pub mod leads;
pub mod notes;
pub mod proposals;
pub mod stock;
pub mod timeline;

pub use clients::ClientRepository;
pub use credentials::CredentialRepository;
pub use leads::LeadRepository;
pub use notes::NotesRepository;
pub use proposals::ProposalRepository;
pub use stock::StockRepository;
pub use timeline::TimelineRepository;

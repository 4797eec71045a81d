//! # helio-store: Workbook I/O for Helio CRM
//!
//! Moves workbooks between a file store and the helio-core document model,
//! and runs each business operation as one fetch → mutate → store cycle.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        helio-store                                      │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ Ledger  → StockRepository, ClientRepository, LeadRepository, ... │  │
//! │  └──────────────────────────────┬───────────────────────────────────┘  │
//! │                                 ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ Orchestrator                                                     │  │
//! │  │   fetch (retried) → parse → helio-core mutation → serialize →    │  │
//! │  │   store (once, with the fetched WriteToken)                      │  │
//! │  │   missing date block → backfill → persist → reload → locate      │  │
//! │  └──────────┬──────────────────────────────────┬────────────────────┘  │
//! │             ▼                                  ▼                        │
//! │  ┌────────────────────┐             ┌──────────────────────────┐       │
//! │  │ DocumentCodec      │             │ WorkbookStore            │       │
//! │  │  XlsxCodec (umya)  │             │  FsStore, MemoryStore    │       │
//! │  └────────────────────┘             └──────────────────────────┘       │
//! │                                                                         │
//! │  Side services: StaffSessions over TtlStore, ProposalRenderer (PDF)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let config = StoreConfig::load_or_default(None);
//! let ledger = Ledger::open_local(&config);
//! let levels = ledger.stock().stock_out(date, "Panel 540W", 45.0, None).await?;
//! if levels.alert {
//!     println!("{} is below minimum", levels.material);
//! }
//! ```

pub mod adapter;
pub mod codec;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod render;
pub mod repository;
pub mod session;

pub use adapter::{ConcurrencyPolicy, FetchedDocument, FsStore, MemoryStore, WorkbookStore, WriteToken};
pub use codec::{DocumentCodec, XlsxCodec};
pub use config::{RetrySettings, SessionSettings, StorageSettings, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use ledger::Ledger;
pub use orchestrator::{LoadedWorkbook, Orchestrator};
pub use render::{fill_template, ProposalRenderer};
pub use session::{Clock, InMemoryTtlStore, StaffSessions, TokioClock, TtlStore};

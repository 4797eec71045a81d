//! # Ledger
//!
//! Entry point of the store layer: one orchestrator shared by every
//! repository, with each repository bound to its workbook key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StoreConfig ──► Ledger::open_local(&config)                           │
//! │                     │                                                   │
//! │                     ├── FsStore(data_dir, policy)                      │
//! │                     ├── XlsxCodec                                      │
//! │                     └── Orchestrator(retry, create_missing)            │
//! │                                                                         │
//! │  ledger.stock()        → "Stock Sheet.xlsx"                            │
//! │  ledger.clients()      → "TempData.xlsx"                               │
//! │  ledger.timeline()     → "TempData.xlsx"   (Timeline tab)              │
//! │  ledger.credentials()  → "TempData.xlsx"   (Credentials tab)           │
//! │  ledger.notes()        → "TempData.xlsx"   (Notes and Tasks tabs)      │
//! │  ledger.leads()        → "leads.xlsx"                                  │
//! │  ledger.proposals()    → "proposal.xlsx" (+ leads for transfer)        │
//! │  ledger.sessions()     → staff sign-in over the credentials tab        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::info;

use crate::adapter::{FsStore, WorkbookStore};
use crate::codec::{DocumentCodec, XlsxCodec};
use crate::config::{SessionSettings, StorageSettings, StoreConfig};
use crate::orchestrator::Orchestrator;
use crate::repository::{
    ClientRepository, CredentialRepository, LeadRepository, NotesRepository, ProposalRepository,
    StockRepository, TimelineRepository,
};
use crate::session::{InMemoryTtlStore, StaffSessions, TtlStore};
use helio_core::Credential;

#[derive(Clone)]
pub struct Ledger {
    orchestrator: Orchestrator,
    storage: StorageSettings,
    session: SessionSettings,
    codes: Arc<dyn TtlStore<String>>,
    sessions: Arc<dyn TtlStore<Credential>>,
}

impl Ledger {
    /// Builds a ledger over any store and codec. Documents must already
    /// exist unless `create_missing` is set on the orchestrator.
    pub fn new(orchestrator: Orchestrator, storage: StorageSettings) -> Self {
        Ledger {
            orchestrator,
            storage,
            session: SessionSettings::default(),
            codes: Arc::new(InMemoryTtlStore::<String>::new()),
            sessions: Arc::new(InMemoryTtlStore::<Credential>::new()),
        }
    }

    pub fn with_session_settings(mut self, settings: SessionSettings) -> Self {
        self.session = settings;
        self
    }

    /// Replaces the in-memory code and session stores, e.g. with shared ones.
    pub fn with_session_stores(
        mut self,
        codes: Arc<dyn TtlStore<String>>,
        sessions: Arc<dyn TtlStore<Credential>>,
    ) -> Self {
        self.codes = codes;
        self.sessions = sessions;
        self
    }

    pub fn with_store(store: Arc<dyn WorkbookStore>, config: &StoreConfig) -> Self {
        let codec: Arc<dyn DocumentCodec> = Arc::new(XlsxCodec::new());
        let orchestrator = Orchestrator::new(store, codec, config.retry.clone());
        Self::new(orchestrator, config.storage.clone()).with_session_settings(config.session.clone())
    }

    /// Workbooks as files under `storage.data_dir`, created on first write.
    pub fn open_local(config: &StoreConfig) -> Self {
        info!(
            data_dir = %config.storage.data_dir.display(),
            policy = %config.policy(),
            "opening local ledger"
        );
        let store = Arc::new(FsStore::new(&config.storage.data_dir, config.policy()));
        let codec: Arc<dyn DocumentCodec> = Arc::new(XlsxCodec::new());
        let orchestrator = Orchestrator::new(store, codec, config.retry.clone()).create_missing(true);
        Self::new(orchestrator, config.storage.clone()).with_session_settings(config.session.clone())
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    // =========================================================================
    // Repository Accessors
    // =========================================================================

    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.orchestrator.clone(), &self.storage.stock)
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.orchestrator.clone(), &self.storage.clients)
    }

    pub fn timeline(&self) -> TimelineRepository {
        TimelineRepository::new(self.orchestrator.clone(), &self.storage.clients)
    }

    pub fn credentials(&self) -> CredentialRepository {
        CredentialRepository::new(self.orchestrator.clone(), &self.storage.clients)
    }

    pub fn notes(&self) -> NotesRepository {
        NotesRepository::new(self.orchestrator.clone(), &self.storage.clients)
    }

    pub fn leads(&self) -> LeadRepository {
        LeadRepository::new(self.orchestrator.clone(), &self.storage.leads)
    }

    pub fn proposals(&self) -> ProposalRepository {
        ProposalRepository::new(
            self.orchestrator.clone(),
            &self.storage.proposals,
            &self.storage.leads,
        )
    }

    /// Sign-in desk; clones of this ledger share its pending codes and sessions.
    pub fn sessions(&self) -> StaffSessions {
        StaffSessions::new(
            self.credentials(),
            self.codes.clone(),
            self.sessions.clone(),
            self.session.clone(),
        )
    }
}

//! # Mutation Orchestrator
//!
//! Runs one read-modify-write cycle per business operation.
//!
//! ## Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     perform_update(key, locate, mutate)                 │
//! │                                                                         │
//! │  fetch ──(Transient? backoff, retry)──► parse                           │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                 locate(&mut Workbook)                   │
//! │                                          │ target                       │
//! │                                          ▼                              │
//! │                                 mutate(&mut Workbook, target)           │
//! │                                          │                              │
//! │                          dirty? ─── no ──┴── yes ──► serialize ► store  │
//! │                                                       (never retried)   │
//! │                                                                         │
//! │  Any error before store: nothing is written.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Date-Block Retry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ensure_date_block(loaded, 15-03-2024)                                  │
//! │       │                                                                 │
//! │       ├── block found ──────────────────────────────► DateColumns       │
//! │       │                                                                 │
//! │       └── missing                                                       │
//! │             │ backfill month                                            │
//! │             │ persist          (store write #1)                         │
//! │             │ fetch + parse    (fresh copy, fresh token)                │
//! │             │ look up again                                             │
//! │             ├── found ──────────────────────────────► DateColumns       │
//! │             └── missing ────────────────────────────► DateColumnMissing │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use backoff::ExponentialBackoff;
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use helio_core::{stock, CoreResult, DateColumns, Workbook};

use crate::adapter::{FetchedDocument, WorkbookStore, WriteToken};
use crate::codec::DocumentCodec;
use crate::config::RetrySettings;
use crate::error::{StoreError, StoreResult};

/// A parsed workbook together with the token needed to write it back.
#[derive(Debug, Clone)]
pub struct LoadedWorkbook {
    pub key: String,
    pub workbook: Workbook,
    pub token: WriteToken,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn WorkbookStore>,
    codec: Arc<dyn DocumentCodec>,
    retry: RetrySettings,
    create_missing: bool,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn WorkbookStore>, codec: Arc<dyn DocumentCodec>, retry: RetrySettings) -> Self {
        Orchestrator {
            store,
            codec,
            retry,
            create_missing: false,
        }
    }

    /// Updates of a missing document start from an empty workbook instead
    /// of failing with `NotFound`.
    pub fn create_missing(mut self, create: bool) -> Self {
        self.create_missing = create;
        self
    }

    // =========================================================================
    // Fetch / Persist
    // =========================================================================

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.retry.initial_backoff(),
            max_interval: self.retry.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None, // bounded by max_attempts instead
            ..Default::default()
        }
    }

    /// Fetches with exponential backoff on transient failures.
    async fn fetch(&self, key: &str) -> StoreResult<FetchedDocument> {
        let attempts = AtomicU32::new(0);
        let max_attempts = self.retry.max_attempts.max(1);
        let attempts = &attempts;
        let store = self.store.as_ref();

        backoff::future::retry(self.create_backoff(), move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            match store.fetch(key).await {
                Ok(document) => Ok(document),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(key, attempt, max_attempts, error = %e, "fetch failed, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    /// Fetches and parses a workbook.
    pub async fn load(&self, key: &str) -> StoreResult<LoadedWorkbook> {
        let fetched = self.fetch(key).await?;
        let mut workbook = self.codec.parse(&fetched.bytes)?;
        workbook.mark_clean();
        debug!(key, version = fetched.token.version, sheets = workbook.sheets().len(), "workbook loaded");
        Ok(LoadedWorkbook {
            key: key.to_string(),
            workbook,
            token: fetched.token,
        })
    }

    /// Like [`load`](Self::load), but a missing document becomes an empty
    /// workbook when `create_missing` is set.
    pub async fn load_for_update(&self, key: &str) -> StoreResult<LoadedWorkbook> {
        match self.load(key).await {
            Err(StoreError::NotFound(_)) if self.create_missing => {
                info!(key, "workbook does not exist yet, starting empty");
                Ok(LoadedWorkbook {
                    key: key.to_string(),
                    workbook: Workbook::new(),
                    token: WriteToken::NEW_DOCUMENT,
                })
            }
            other => other,
        }
    }

    /// Serializes and stores the workbook, refreshing its token.
    pub async fn persist(&self, loaded: &mut LoadedWorkbook) -> StoreResult<()> {
        let bytes = self.codec.serialize(&loaded.workbook)?;
        let size = bytes.len();
        loaded.token = self.store.store(&loaded.key, bytes, &loaded.token).await?;
        loaded.workbook.mark_clean();
        info!(key = %loaded.key, version = loaded.token.version, bytes = size, "workbook persisted");
        Ok(())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Loads a workbook and runs a read-only query over it.
    pub async fn read<T, F>(&self, key: &str, query: F) -> StoreResult<T>
    where
        F: FnOnce(&Workbook) -> CoreResult<T>,
    {
        let loaded = self.load(key).await?;
        Ok(query(&loaded.workbook)?)
    }

    /// Full read-modify-write cycle. Nothing is stored when `locate` or
    /// `mutate` fails, or when they leave the workbook unchanged.
    pub async fn perform_update<L, M, T, R>(&self, key: &str, locate: L, mutate: M) -> StoreResult<R>
    where
        L: FnOnce(&mut Workbook) -> CoreResult<T>,
        M: FnOnce(&mut Workbook, T) -> CoreResult<R>,
    {
        let mut loaded = self.load_for_update(key).await?;
        let target = locate(&mut loaded.workbook)?;
        let result = mutate(&mut loaded.workbook, target)?;

        if loaded.workbook.is_dirty() {
            self.persist(&mut loaded).await?;
        } else {
            debug!(key, "workbook unchanged, skipping store");
        }
        Ok(result)
    }

    /// [`perform_update`](Self::perform_update) without a separate locate step.
    pub async fn update<R, M>(&self, key: &str, mutate: M) -> StoreResult<R>
    where
        M: FnOnce(&mut Workbook) -> CoreResult<R>,
    {
        self.perform_update(key, |_| Ok(()), |workbook, ()| mutate(workbook)).await
    }

    /// Finds the day's stock columns, running the backfill / persist /
    /// reload / retry protocol once when they are missing.
    ///
    /// On return `loaded` may hold a freshly fetched copy of the document.
    pub async fn ensure_date_block(&self, loaded: &mut LoadedWorkbook, date: NaiveDate) -> StoreResult<DateColumns> {
        if let Some(cols) = stock::locate_date_block(&loaded.workbook, date)? {
            return Ok(cols);
        }

        let created = stock::backfill_date_blocks(&mut loaded.workbook, date)?;
        warn!(key = %loaded.key, %date, created, "date block missing, backfilled month");

        self.persist(loaded).await?;
        let key = loaded.key.clone();
        *loaded = self.load(&key).await?;

        match stock::locate_date_block(&loaded.workbook, date)? {
            Some(cols) => {
                info!(key = %loaded.key, %date, in_col = cols.in_col, "date block found after reload");
                Ok(cols)
            }
            None => Err(StoreError::DateColumnMissing {
                sheet: stock::master_sheet_name(date.month()),
                date: helio_core::dates::format_block_date(date),
            }),
        }
    }
}

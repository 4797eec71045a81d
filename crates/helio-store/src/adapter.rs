//! # Workbook Store Adapters
//!
//! Whole-document fetch and store against a file store.
//!
//! ## Write Tokens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Fetch / Store Cycle                                 │
//! │                                                                         │
//! │  fetch("Stock Sheet.xlsx")                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FetchedDocument { bytes, token: WriteToken { version: 7 } }           │
//! │       │                                                                 │
//! │       │  ... parse, mutate, serialize ...                              │
//! │       ▼                                                                 │
//! │  store(key, bytes, &token)                                             │
//! │       │                                                                 │
//! │       ├── LastWriteWins → overwrite, new token                         │
//! │       │                                                                 │
//! │       └── Optimistic                                                   │
//! │             ├── stored version still 7 → write, new token              │
//! │             └── someone wrote since   → ConcurrentModification         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A file that does not exist yet has version 0, so a store with
//! [`WriteToken::NEW_DOCUMENT`] creates it and fails under `Optimistic` if
//! another writer created it first.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Contract
// =============================================================================

/// Version of a document as seen at fetch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WriteToken {
    pub version: u64,
}

impl WriteToken {
    /// Token for a document that does not exist yet.
    pub const NEW_DOCUMENT: WriteToken = WriteToken { version: 0 };

    pub fn new(version: u64) -> Self {
        WriteToken { version }
    }
}

/// Bytes of a document plus the token for writing it back.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub token: WriteToken,
}

/// What a store does when the document changed since fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Overwrite whatever is there.
    LastWriteWins,
    /// Reject the write with [`StoreError::ConcurrentModification`].
    #[default]
    Optimistic,
}

impl fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyPolicy::LastWriteWins => write!(f, "last_write_wins"),
            ConcurrencyPolicy::Optimistic => write!(f, "optimistic"),
        }
    }
}

impl FromStr for ConcurrencyPolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "last_write_wins" | "lww" => Ok(ConcurrencyPolicy::LastWriteWins),
            "optimistic" => Ok(ConcurrencyPolicy::Optimistic),
            other => Err(StoreError::Config(format!(
                "Unknown concurrency policy: '{}'. Valid options: last_write_wins, optimistic",
                other
            ))),
        }
    }
}

impl ConcurrencyPolicy {
    /// Checks `token` against the stored version and returns the next one.
    fn admit(&self, key: &str, token: &WriteToken, current: u64) -> StoreResult<u64> {
        if *self == ConcurrencyPolicy::Optimistic && token.version != current {
            warn!(key, expected = token.version, actual = current, "rejecting stale write");
            return Err(StoreError::ConcurrentModification {
                key: key.to_string(),
                expected: token.version,
                actual: current,
            });
        }
        Ok(current.wrapping_add(1).max(1))
    }
}

/// Remote (or local) holder of whole workbook documents.
#[async_trait]
pub trait WorkbookStore: Send + Sync {
    /// Fails with `NotFound`, `Auth` or `Transient`.
    async fn fetch(&self, key: &str) -> StoreResult<FetchedDocument>;

    /// Replaces the document, returning the token for the next write.
    async fn store(&self, key: &str, bytes: Vec<u8>, token: &WriteToken) -> StoreResult<WriteToken>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Store backed by a map, with hooks for failure injection in tests and
/// single-process tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
    policy: ConcurrencyPolicy,
    documents: RwLock<HashMap<String, (Vec<u8>, u64)>>,
    failing_fetches: AtomicU32,
    fetches: AtomicU32,
    stores: AtomicU32,
}

impl MemoryStore {
    pub fn new(policy: ConcurrencyPolicy) -> Self {
        MemoryStore {
            policy,
            ..Default::default()
        }
    }

    /// Seeds a document without touching the counters.
    pub async fn insert(&self, key: &str, bytes: Vec<u8>) {
        let mut documents = self.documents.write().await;
        let version = documents.get(key).map(|(_, v)| v + 1).unwrap_or(1);
        documents.insert(key.to_string(), (bytes, version));
    }

    pub async fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.documents.read().await.get(key).map(|(b, _)| b.clone())
    }

    /// The next `count` fetches fail with [`StoreError::Transient`].
    pub fn fail_next_fetches(&self, count: u32) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn store_count(&self) -> u32 {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkbookStore for MemoryStore {
    async fn fetch(&self, key: &str) -> StoreResult<FetchedDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Transient(format!("injected failure fetching {}", key)));
        }

        let documents = self.documents.read().await;
        let (bytes, version) = documents
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(FetchedDocument {
            bytes: bytes.clone(),
            token: WriteToken::new(*version),
        })
    }

    async fn store(&self, key: &str, bytes: Vec<u8>, token: &WriteToken) -> StoreResult<WriteToken> {
        let mut documents = self.documents.write().await;
        let current = documents.get(key).map(|(_, v)| *v).unwrap_or(0);
        let next = self.policy.admit(key, token, current)?;

        documents.insert(key.to_string(), (bytes, next));
        self.stores.fetch_add(1, Ordering::SeqCst);
        debug!(key, version = next, "document stored in memory");
        Ok(WriteToken::new(next))
    }
}

// =============================================================================
// File System Store
// =============================================================================

/// Store over a local directory, one file per key.
///
/// Versions are content hashes, so an edit made by hand (or by a synced
/// folder client) between fetch and store is detected under `Optimistic`.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    policy: ConcurrencyPolicy,
    write_lock: Mutex<()>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, policy: ConcurrencyPolicy) -> Self {
        FsStore {
            root: root.into(),
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to a file directly under the root.
    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !key.trim().is_empty() => Ok(self.root.join(name)),
            _ => Err(StoreError::NotFound(format!("invalid document key '{}'", key))),
        }
    }

    fn version_of(bytes: &[u8]) -> u64 {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        hasher.finish().max(1)
    }

    fn map_io(key: &str, err: std::io::Error) -> StoreError {
        match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
            ErrorKind::PermissionDenied => StoreError::Auth {
                key: key.to_string(),
                reason: err.to_string(),
            },
            ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock => {
                StoreError::Transient(err.to_string())
            }
            _ => StoreError::Io(err),
        }
    }

    async fn current_version(&self, key: &str, path: &Path) -> StoreResult<u64> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Self::version_of(&bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(Self::map_io(key, e)),
        }
    }
}

#[async_trait]
impl WorkbookStore for FsStore {
    async fn fetch(&self, key: &str) -> StoreResult<FetchedDocument> {
        let path = self.path_for(key)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Self::map_io(key, e))?;
        debug!(?path, bytes = bytes.len(), "document read");
        let token = WriteToken::new(Self::version_of(&bytes));
        Ok(FetchedDocument { bytes, token })
    }

    async fn store(&self, key: &str, bytes: Vec<u8>, token: &WriteToken) -> StoreResult<WriteToken> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;

        let current = self.current_version(key, &path).await?;
        self.policy.admit(key, token, current)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::map_io(key, e))?;
        let temp = self.root.join(format!(".{}.{}.tmp", key, Uuid::new_v4()));
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| Self::map_io(key, e))?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Self::map_io(key, e));
        }

        let version = Self::version_of(&bytes);
        info!(?path, bytes = bytes.len(), "document written");
        Ok(WriteToken::new(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("optimistic".parse::<ConcurrencyPolicy>().unwrap(), ConcurrencyPolicy::Optimistic);
        assert_eq!(
            "Last-Write-Wins".parse::<ConcurrencyPolicy>().unwrap(),
            ConcurrencyPolicy::LastWriteWins
        );
        assert!("pessimistic".parse::<ConcurrencyPolicy>().is_err());
        assert_eq!(ConcurrencyPolicy::LastWriteWins.to_string(), "last_write_wins");
    }

    #[tokio::test]
    async fn test_memory_store_versions() {
        let store = MemoryStore::new(ConcurrencyPolicy::Optimistic);
        assert!(matches!(store.fetch("a.xlsx").await, Err(StoreError::NotFound(_))));

        let first = store.store("a.xlsx", vec![1], &WriteToken::NEW_DOCUMENT).await.unwrap();
        let fetched = store.fetch("a.xlsx").await.unwrap();
        assert_eq!(fetched.token, first);
        assert_eq!(fetched.bytes, vec![1]);

        store.store("a.xlsx", vec![2], &fetched.token).await.unwrap();
        let err = store.store("a.xlsx", vec![3], &fetched.token).await.unwrap_err();
        assert!(matches!(err, StoreError::ConcurrentModification { .. }));
        assert_eq!(store.bytes("a.xlsx").await, Some(vec![2]));
        assert_eq!(store.store_count(), 2);
    }

    #[tokio::test]
    async fn test_last_write_wins_overwrites() {
        let store = MemoryStore::new(ConcurrencyPolicy::LastWriteWins);
        store.insert("a.xlsx", vec![1]).await;
        let stale = store.fetch("a.xlsx").await.unwrap().token;
        store.store("a.xlsx", vec![2], &stale).await.unwrap();
        store.store("a.xlsx", vec![3], &stale).await.unwrap();
        assert_eq!(store.bytes("a.xlsx").await, Some(vec![3]));
    }

    #[tokio::test]
    async fn test_injected_transient_failures() {
        let store = MemoryStore::new(ConcurrencyPolicy::Optimistic);
        store.insert("a.xlsx", vec![1]).await;
        store.fail_next_fetches(2);

        assert!(store.fetch("a.xlsx").await.unwrap_err().is_retryable());
        assert!(store.fetch("a.xlsx").await.unwrap_err().is_retryable());
        assert!(store.fetch("a.xlsx").await.is_ok());
        assert_eq!(store.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_fs_store_round_trip_and_conflict() {
        let root = std::env::temp_dir().join(format!("helio-fs-{}", Uuid::new_v4()));
        let store = FsStore::new(&root, ConcurrencyPolicy::Optimistic);

        assert!(matches!(store.fetch("leads.xlsx").await, Err(StoreError::NotFound(_))));
        store.store("leads.xlsx", b"one".to_vec(), &WriteToken::NEW_DOCUMENT).await.unwrap();

        let fetched = store.fetch("leads.xlsx").await.unwrap();
        assert_eq!(fetched.bytes, b"one");

        // an outside edit between fetch and store
        tokio::fs::write(root.join("leads.xlsx"), b"edited").await.unwrap();
        let err = store.store("leads.xlsx", b"two".to_vec(), &fetched.token).await.unwrap_err();
        assert!(matches!(err, StoreError::ConcurrentModification { .. }));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_fs_store_rejects_escaping_keys() {
        let store = FsStore::new(std::env::temp_dir(), ConcurrencyPolicy::LastWriteWins);
        for key in ["../etc/passwd", "a/b.xlsx", "", "/abs.xlsx"] {
            assert!(store.fetch(key).await.is_err(), "{key}");
        }
    }
}

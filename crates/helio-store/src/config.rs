//! # Store Configuration
//!
//! Where the workbooks live, how fetches are retried and how concurrent
//! writes are handled.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HELIO_DATA_DIR=/srv/helio                                          │
//! │     HELIO_CONCURRENCY=last_write_wins                                  │
//! │     HELIO_RETRY_MAX_ATTEMPTS=5                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/helio-crm/helio.toml (Linux)                             │
//! │     ~/Library/Application Support/com.helio.crm/helio.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! data_dir = "/srv/helio"
//! clients = "TempData.xlsx"
//! stock = "Stock Sheet.xlsx"
//! leads = "leads.xlsx"
//! proposals = "proposal.xlsx"
//!
//! [retry]
//! max_attempts = 3
//! initial_backoff_ms = 200
//! max_backoff_ms = 2000
//!
//! [concurrency]
//! policy = "optimistic"  # optimistic | last_write_wins
//!
//! [session]
//! code_ttl_secs = 600
//! session_ttl_secs = 43200
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::adapter::ConcurrencyPolicy;
use crate::error::{StoreError, StoreResult};

// =============================================================================
// Storage Settings
// =============================================================================

/// Location of the store and the file key of each workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Root directory of the file-system store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_clients_key")]
    pub clients: String,

    /// Stock masters and both journals, one tab per month.
    #[serde(default = "default_stock_key")]
    pub stock: String,

    #[serde(default = "default_leads_key")]
    pub leads: String,

    #[serde(default = "default_proposals_key")]
    pub proposals: String,
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "helio", "crm")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn default_clients_key() -> String {
    "TempData.xlsx".to_string()
}

fn default_stock_key() -> String {
    "Stock Sheet.xlsx".to_string()
}

fn default_leads_key() -> String {
    "leads.xlsx".to_string()
}

fn default_proposals_key() -> String {
    "proposal.xlsx".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: default_data_dir(),
            clients: default_clients_key(),
            stock: default_stock_key(),
            leads: default_leads_key(),
            proposals: default_proposals_key(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Backoff for fetches. Stores are never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total fetch attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    200
}

fn default_max_backoff() -> u64 {
    2000
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl RetrySettings {
    /// No waiting between attempts; used by tests and one-shot tools.
    pub fn immediate(max_attempts: u32) -> Self {
        RetrySettings {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// =============================================================================
// Concurrency Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcurrencySettings {
    #[serde(default)]
    pub policy: ConcurrencyPolicy,
}

// =============================================================================
// Session Settings
// =============================================================================

/// Lifetimes of staff sign-in codes and session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: u64,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_code_ttl() -> u64 {
    600
}

fn default_session_ttl() -> u64 {
    12 * 60 * 60
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            code_ttl_secs: default_code_ttl(),
            session_ttl_secs: default_session_ttl(),
        }
    }
}

impl SessionSettings {
    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.code_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

// =============================================================================
// Main Store Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub concurrency: ConcurrencySettings,

    #[serde(default)]
    pub session: SessionSettings,
}

impl StoreConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (helio.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading store config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load store config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Store config saved");
        Ok(())
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(StoreError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(StoreError::Config(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }

        if self.session.code_ttl_secs == 0 || self.session.session_ttl_secs == 0 {
            return Err(StoreError::Config(
                "session lifetimes must be at least one second".into(),
            ));
        }

        let keys = [
            ("storage.clients", &self.storage.clients),
            ("storage.stock", &self.storage.stock),
            ("storage.leads", &self.storage.leads),
            ("storage.proposals", &self.storage.proposals),
        ];
        for (name, key) in keys {
            if key.trim().is_empty() {
                return Err(StoreError::Config(format!("{} must not be empty", name)));
            }
            if key.contains('/') || key.contains('\\') {
                return Err(StoreError::Config(format!(
                    "{} must be a file name, got: {}",
                    name, key
                )));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("HELIO_DATA_DIR") {
            debug!(data_dir = %dir, "Overriding data directory from environment");
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(policy) = std::env::var("HELIO_CONCURRENCY") {
            match policy.parse() {
                Ok(parsed) => self.concurrency.policy = parsed,
                Err(_) => warn!(policy = %policy, "Unknown concurrency policy in environment"),
            }
        }

        if let Ok(attempts) = std::env::var("HELIO_RETRY_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse::<u32>() {
                self.retry.max_attempts = n;
            }
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "helio", "crm")
            .map(|dirs| dirs.config_dir().join("helio.toml"))
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.concurrency.policy
    }
}

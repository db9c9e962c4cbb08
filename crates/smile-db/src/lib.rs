//! Data store gateway for the whitelist.
//!
//! The gateway exposes a single operation, insert-or-report-duplicate, over
//! either the hosted store (PostgREST / Supabase) or a local SQLite file.

pub mod migrations;
pub mod rest;
pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use smile_types::models::{NewEntry, WhitelistEntry};

pub use rest::RestStore;
pub use sqlite::SqliteStore;

pub const DEFAULT_TABLE: &str = "whitelist_entries";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store's uniqueness constraint on `fid` rejected the row.
    #[error("fid {fid} is already registered")]
    DuplicateKey { fid: u64 },

    /// The deadline passed before the row was committed. Nothing was written.
    #[error("the store did not respond in time")]
    Timeout,

    #[error("{0}")]
    Backend(String),
}

#[async_trait]
pub trait WhitelistStore: Send + Sync {
    /// Insert one entry. Exactly one row is written on success and none on
    /// any error path.
    ///
    /// Nothing may be committed once `deadline` has passed; the call returns
    /// `StoreError::Timeout` instead. Callers await the result rather than
    /// dropping the future, so the outcome they report is the stored one.
    async fn insert(&self, entry: NewEntry, deadline: Instant) -> Result<WhitelistEntry, StoreError>;

    /// Short backend name for log lines.
    fn backend(&self) -> &'static str;
}

/// Store selection resolved from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Rest {
        url: String,
        api_key: String,
        table: String,
        timeout: Duration,
    },
    Sqlite {
        path: PathBuf,
    },
    Unconfigured,
}

/// Handle to the configured store, built once and shared by every request.
#[derive(Clone)]
pub enum Gateway {
    Ready(Arc<dyn WhitelistStore>),
    Unconfigured,
}

impl Gateway {
    pub fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let gateway = match config {
            StoreConfig::Rest {
                url,
                api_key,
                table,
                timeout,
            } => Self::Ready(Arc::new(RestStore::new(url, api_key, table, *timeout)?)),
            StoreConfig::Sqlite { path } => Self::Ready(Arc::new(SqliteStore::open(path)?)),
            StoreConfig::Unconfigured => {
                warn!(
                    "Store is not configured (SUPABASE_URL / SUPABASE_ANON_KEY unset). \
                     Join requests will fail with a configuration error."
                );
                return Ok(Self::Unconfigured);
            }
        };

        if let Some(store) = gateway.store() {
            info!("Whitelist store ready ({})", store.backend());
        }
        Ok(gateway)
    }

    pub fn from_store(store: Arc<dyn WhitelistStore>) -> Self {
        Self::Ready(store)
    }

    /// The usable store, or `None` when the gateway was never configured.
    pub fn store(&self) -> Option<&Arc<dyn WhitelistStore>> {
        match self {
            Self::Ready(store) => Some(store),
            Self::Unconfigured => None,
        }
    }
}

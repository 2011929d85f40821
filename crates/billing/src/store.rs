//! Durable get/set storage for the usage ledger.
//!
//! Stores only move whole `LedgerState` values; month rollover is decided by
//! the ledger, never by a backend.

use crate::ledger::LedgerState;
use async_trait::async_trait;
use campaign_core::CampaignError;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LedgerStoreError {
    #[error("ledger file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger record is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ledger backend error: {0}")]
    Backend(String),

    #[error("ledger store did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<LedgerStoreError> for CampaignError {
    fn from(err: LedgerStoreError) -> Self {
        CampaignError::LedgerIo(err.to_string())
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the persisted state; `None` when nothing was ever written.
    async fn load(&self) -> Result<Option<LedgerState>, LedgerStoreError>;

    /// Replace the persisted state.
    async fn save(&self, state: &LedgerState) -> Result<(), LedgerStoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Process-local store for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<Option<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    /// The last saved state.
    pub fn snapshot(&self) -> Option<LedgerState> {
        self.state.lock().clone()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn load(&self) -> Result<Option<LedgerState>, LedgerStoreError> {
        Ok(self.state.lock().clone())
    }

    async fn save(&self, state: &LedgerState) -> Result<(), LedgerStoreError> {
        *self.state.lock() = Some(state.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// JSON file store. Writes go to a sibling temp file and are renamed into
/// place so a crash never leaves a half-written ledger behind.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "usage-ledger.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn load(&self) -> Result<Option<LedgerState>, LedgerStoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No ledger file yet");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &LedgerState) -> Result<(), LedgerStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

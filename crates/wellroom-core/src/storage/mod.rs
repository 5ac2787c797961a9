//! Clock/storage adapter.
//!
//! Engines never talk to a backend directly. They hold a [`Storage`], which
//! pairs a [`Clock`] with a [`KvStore`] and exposes typed JSON records.
//! Reads are infallible from the engine's point of view: a missing key, a
//! backend failure and a record that no longer parses all come back as
//! `None`.

mod config;
pub mod database;
pub mod keys;
mod memory;

pub use config::{
    Config, HydrationConfig, MeditationConfig, NotificationsConfig, PomodoroConfig,
    ScreenTimeConfig, TargetsConfig,
};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock::Clock;
use crate::error::StorageError;

/// Raw string key-value backend.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Clock plus key-value store, shared by every engine of a user.
#[derive(Clone)]
pub struct Storage {
    clock: Arc<dyn Clock>,
    store: Arc<dyn KvStore>,
}

impl Storage {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn KvStore>) -> Self {
        Self { clock, store }
    }

    /// In-memory storage driven by the given clock.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Arc::new(MemoryStore::new()))
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn day_stamp(&self) -> String {
        self.clock.day_stamp()
    }

    /// Load and decode a JSON record. Never fails.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage read failed, using defaults");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding malformed record");
                None
            }
        }
    }

    /// Encode and persist a JSON record.
    pub fn save<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(record).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &json)
    }

    /// Persist, logging instead of propagating a failure.
    ///
    /// Engines keep their in-memory state authoritative; a dropped write only
    /// costs durability across reloads.
    pub fn save_or_warn<T: Serialize>(&self, key: &str, record: &T) {
        if let Err(e) = self.save(key, record) {
            tracing::warn!(key, error = %e, "failed to persist record");
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("now_ms", &self.clock.now_ms())
            .finish_non_exhaustive()
    }
}

/// Returns `~/.config/wellroom[-dev]/` based on WELLROOM_ENV.
///
/// Set WELLROOM_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WELLROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("wellroom-dev")
    } else {
        base_dir.join("wellroom")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

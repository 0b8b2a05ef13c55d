//! Persistence gateway over a key/value store.
//!
//! The whole [`History`] is stored as one JSON array under a single key and
//! rewritten after every mutation. Reads never fail from the caller's point
//! of view: a missing or malformed value is logged and replaced with an empty
//! history. Writes that fail are logged and dropped; in-memory state stays
//! authoritative.
//!
//! # Format evolution
//!
//! - Unknown fields on any record are ignored on load.
//! - A missing field, an empty id, a negative duration or a duplicate id makes
//!   the whole value malformed. There is no partial recovery.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::model::History;
use crate::types::ValidationError;

/// Default key for the session history.
pub const DEFAULT_HISTORY_KEY: &str = "lapwatch_history_v1";

/// Default key for the live controller state (open session, clock, staged laps).
pub const DEFAULT_LIVE_KEY: &str = "lapwatch_live_v1";

/// Errors from a key/value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend refused or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Writes are disabled on this store.
    #[error("store is read-only")]
    ReadOnly,
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// String key/value storage with get/set semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store, optionally refusing writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    read_only: bool,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of successful writes so far.
    pub const fn write_count(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Error)]
enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid history: {0}")]
    Invalid(#[from] ValidationError),
}

/// Loads and saves the history (and live state) through a [`KeyValueStore`].
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    store: S,
    history_key: String,
    live_key: String,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self::with_keys(store, DEFAULT_HISTORY_KEY, DEFAULT_LIVE_KEY)
    }

    pub fn with_keys(
        store: S,
        history_key: impl Into<String>,
        live_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            history_key: history_key.into(),
            live_key: live_key.into(),
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Reads the stored history, falling back to an empty one.
    pub fn load(&self) -> History {
        let result = self.read::<History>(&self.history_key).and_then(|history| {
            if let Some(history) = &history {
                history.validate()?;
            }
            Ok(history)
        });
        match result {
            Ok(Some(history)) => {
                tracing::debug!(sessions = history.len(), "loaded history");
                history
            }
            Ok(None) => {
                tracing::debug!(key = %self.history_key, "no stored history");
                History::new()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %self.history_key,
                    "discarding unreadable history"
                );
                History::new()
            }
        }
    }

    /// Writes the full history. Returns whether the write went through.
    pub fn save(&mut self, history: &History) -> bool {
        let key = self.history_key.clone();
        self.write(&key, history)
    }

    /// Reads a value stored under the live-state key, `None` if absent or unreadable.
    pub fn load_live<T: DeserializeOwned>(&self) -> Option<T> {
        match self.read(&self.live_key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %self.live_key,
                    "discarding unreadable live state"
                );
                None
            }
        }
    }

    pub fn save_live<T: Serialize>(&mut self, live: &T) -> bool {
        let key = self.live_key.clone();
        self.write(&key, live)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .map_err(PersistError::from)
            .and_then(|json| self.store.set(key, &json).map_err(PersistError::from));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, key, "write failed; keeping in-memory state");
                false
            }
        }
    }
}

//! Session store adapter.
//!
//! The auth layer persists two kinds of records: the current user session
//! and in-flight authorization request states. Both live in a single
//! host-supplied [`KeyValueStore`], separated by key namespace through
//! [`NamespacedStore`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while reading from or writing to a store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The underlying store rejected the operation.
    #[error("Storage operation failed: {0}")]
    Backend(String),

    /// A stored record could not be (de)serialized.
    #[error("Stored record for '{key}' is malformed: {reason}")]
    Serialization {
        /// The full key of the record.
        key: String,
        /// The serde error message.
        reason: String,
    },
}

/// A persistent string key-value store supplied by the host.
///
/// Implementations must make single-key reads and writes atomic. No other
/// locking is performed by the client.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Returns every key currently in the store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the store cannot be read.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// An in-memory [`KeyValueStore`].
///
/// Clones share the same underlying map, so one `MemoryStore` can back
/// several clients (for example an opener window and its popup in tests).
///
/// # Example
///
/// ```rust
/// use synchive::host::{KeyValueStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("greeting", "hello").unwrap();
/// assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

/// A view of a [`KeyValueStore`] restricted to keys under one prefix.
///
/// Values are stored as JSON.
#[derive(Clone, Debug)]
pub struct NamespacedStore {
    inner: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl NamespacedStore {
    /// Creates a view of `inner` that prefixes every key with `prefix`.
    #[must_use]
    pub fn new(inner: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    /// Returns the namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Reads and deserializes the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store fails or the record is malformed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let full_key = self.full_key(key);
        let Some(raw) = self.inner.get(&full_key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Serialization {
                key: full_key,
                reason: e.to_string(),
            })
    }

    /// Serializes and stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if serialization or the store fails.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let full_key = self.full_key(key);
        let raw = serde_json::to_string(value).map_err(|e| StorageError::Serialization {
            key: full_key.clone(),
            reason: e.to_string(),
        })?;
        self.inner.set(&full_key, &raw)
    }

    /// Removes the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store fails.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(&self.full_key(key))
    }

    /// Returns the keys in this namespace, with the prefix stripped.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store fails.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .inner
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }
}

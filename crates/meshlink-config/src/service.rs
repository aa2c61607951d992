// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::collections::HashMap;
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Raw blob storage addressed by key.
pub trait ConfigStore {
    /// Reads the blob for `key`; [`ConfigError::NotFound`] when absent.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replaces the blob for `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Preferences failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("not found")]
    NotFound,
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored JSON does not fit the requested type.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything else (bad key, no config dir).
    #[error("other: {0}")]
    Other(String),
}

/// Typed JSON access over a [`ConfigStore`].
#[derive(Debug)]
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Reads `key`; `Ok(None)` when absent or empty.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let bytes = match self.store.load_raw(key) {
            Ok(bytes) => bytes,
            Err(ConfigError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Writes `value` as pretty JSON under `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Best-effort load: returns the stored value, or the default after
    /// persisting it once when nothing is stored. Unreadable entries fall back
    /// to the default without overwriting them.
    pub fn load_or_init<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Serialize + Default,
    {
        match self.load::<T>(key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                let value = T::default();
                match self.save(key, &value) {
                    Ok(()) => debug!(%key, "wrote default preferences"),
                    Err(err) => warn!(%key, %err, "could not persist default preferences"),
                }
                value
            }
            Err(err) => {
                warn!(%key, %err, "ignoring unreadable preferences");
                T::default()
            }
        }
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ConfigError::Other("store lock poisoned".into()))?;
        entries.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.entries
            .lock()
            .map_err(|_| ConfigError::Other("store lock poisoned".into()))?
            .insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        workers: usize,
        namespace: String,
    }

    #[test]
    fn missing_key_loads_none() {
        let svc = ConfigService::new(MemoryConfigStore::default());
        assert!(svc.load::<Prefs>("relay").unwrap().is_none());
    }

    #[test]
    fn load_or_init_persists_defaults_once() {
        let svc = ConfigService::new(MemoryConfigStore::default());
        let first: Prefs = svc.load_or_init("relay");
        assert_eq!(first, Prefs::default());
        assert!(svc.store().load_raw("relay").is_ok());

        svc.save(
            "relay",
            &Prefs {
                workers: 8,
                namespace: "sim".into(),
            },
        )
        .unwrap();
        let second: Prefs = svc.load_or_init("relay");
        assert_eq!(second.workers, 8);
    }

    #[test]
    fn corrupt_entry_is_not_overwritten() {
        let svc = ConfigService::new(MemoryConfigStore::default());
        svc.store().save_raw("relay", b"{not json").unwrap();
        let prefs: Prefs = svc.load_or_init("relay");
        assert_eq!(prefs, Prefs::default());
        assert_eq!(svc.store().load_raw("relay").unwrap(), b"{not json");
    }
}

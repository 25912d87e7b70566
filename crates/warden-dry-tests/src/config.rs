// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use warden_app_core::config::{ConfigError, ConfigStore};
use warden_app_core::engine_config::ENGINE_CONFIG_KEY;

/// In-memory [`ConfigStore`] that counts calls and can simulate failures.
///
/// Clones share state, so a test can hand one clone to a
/// [`ConfigService`](warden_app_core::config::ConfigService) and inspect the
/// other.
///
/// # Example
///
/// ```
/// use warden_app_core::config::ConfigService;
/// use warden_app_core::engine_config::load_engine_config;
/// use warden_dry_tests::InMemoryConfigStore;
///
/// let store = InMemoryConfigStore::with_engine_json(r#"{"limits":{"max_actions":3}}"#);
/// let service = ConfigService::new(store.clone());
/// let config = load_engine_config(&service).unwrap();
/// assert_eq!(config.limits.max_actions, 3);
/// assert_eq!(store.load_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: BTreeMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `json` under the engine config key.
    pub fn with_engine_json(json: &str) -> Self {
        let store = Self::new();
        store
            .lock()
            .data
            .insert(ENGINE_CONFIG_KEY.to_owned(), json.as_bytes().to_vec());
        store
    }

    /// Configure the store to fail on load operations.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Configure the store to fail on save operations.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// Number of `load_raw` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// Number of `save_raw` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Raw bytes stored under `key`, without counting a load.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().data.get(key).cloned()
    }

    /// Keys currently present, in ascending order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().data.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.lock();
        inner.load_count += 1;
        if inner.fail_on_load {
            return Err(ConfigError::Other("simulated load failure".into()));
        }
        inner.data.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.save_count += 1;
        if inner.fail_on_save {
            return Err(ConfigError::Other("simulated save failure".into()));
        }
        inner.data.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]
    use super::*;

    #[test]
    fn missing_key_is_not_found_and_counted() {
        let store = InMemoryConfigStore::new();
        assert!(matches!(store.load_raw("engine"), Err(ConfigError::NotFound)));
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn clones_share_data_and_counters() {
        let a = InMemoryConfigStore::new();
        let b = a.clone();
        a.save_raw("engine", b"{}").unwrap();
        assert_eq!(b.raw("engine").as_deref(), Some(&b"{}"[..]));
        assert_eq!(b.save_count(), 1);
    }

    #[test]
    fn failed_save_stores_nothing() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_save(true);
        assert!(store.save_raw("engine", b"{}").is_err());
        assert!(store.keys().is_empty());
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn failed_load_can_be_cleared() {
        let store = InMemoryConfigStore::with_engine_json("{}");
        store.set_fail_on_load(true);
        assert!(store.load_raw(ENGINE_CONFIG_KEY).is_err());
        store.set_fail_on_load(false);
        assert_eq!(store.load_raw(ENGINE_CONFIG_KEY).unwrap(), b"{}");
    }

    #[test]
    fn engine_json_is_valid_json() {
        let store = InMemoryConfigStore::with_engine_json(r#"{"limits":{}}"#);
        let raw = store.raw(ENGINE_CONFIG_KEY).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(parsed.get("limits").is_some());
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Engine config loading through the config service.

use warden_app_core::config::{ConfigError, ConfigService};
use warden_app_core::engine_config::{load_engine_config, save_engine_config, ENGINE_CONFIG_KEY};
use warden_core::{EngineConfig, OverflowPolicy};
use warden_dry_tests::InMemoryConfigStore;

#[test]
fn missing_config_yields_defaults() {
    let store = InMemoryConfigStore::new();
    let service = ConfigService::new(store.clone());
    assert_eq!(load_engine_config(&service).unwrap(), EngineConfig::default());
    assert_eq!(store.load_count(), 1);
}

#[test]
fn empty_blob_yields_defaults() {
    let store = InMemoryConfigStore::with_engine_json("");
    let service = ConfigService::new(store);
    assert_eq!(load_engine_config(&service).unwrap(), EngineConfig::default());
}

#[test]
fn zero_limit_is_invalid() {
    let store = InMemoryConfigStore::with_engine_json(r#"{"limits":{"max_actions":0}}"#);
    let service = ConfigService::new(store);
    let err = load_engine_config(&service).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("max_actions")));
}

#[test]
fn value_policy_reads_snake_case() {
    let store = InMemoryConfigStore::with_engine_json(
        r#"{"values":{"text":"reject","signed":"truncate"}}"#,
    );
    let config = load_engine_config(&ConfigService::new(store)).unwrap();
    assert_eq!(config.values.text, OverflowPolicy::Reject);
    assert_eq!(config.values.signed, OverflowPolicy::Truncate);
}

#[test]
fn malformed_json_is_a_serde_error() {
    let store = InMemoryConfigStore::with_engine_json("{ not json");
    let err = load_engine_config(&ConfigService::new(store)).unwrap_err();
    assert!(matches!(err, ConfigError::Serde(_)));
}

#[test]
fn store_failures_propagate() {
    let store = InMemoryConfigStore::new();
    store.set_fail_on_load(true);
    let err = load_engine_config(&ConfigService::new(store)).unwrap_err();
    assert!(matches!(err, ConfigError::Other(_)));
}

#[test]
fn save_refuses_invalid_config_without_touching_the_store() {
    let store = InMemoryConfigStore::new();
    let service = ConfigService::new(store.clone());
    let mut config = EngineConfig::default();
    config.limits.max_message_len = 0;
    assert!(matches!(
        save_engine_config(&service, &config),
        Err(ConfigError::Invalid(_))
    ));
    assert_eq!(store.save_count(), 0);
}

#[test]
fn saved_config_loads_back() {
    let store = InMemoryConfigStore::new();
    let service = ConfigService::new(store.clone());
    let mut config = EngineConfig::default();
    config.limits.max_entries_per_action = 8;
    save_engine_config(&service, &config).unwrap();
    assert!(store.raw(ENGINE_CONFIG_KEY).is_some());
    assert_eq!(load_engine_config(&service).unwrap(), config);
}

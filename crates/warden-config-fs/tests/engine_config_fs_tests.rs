// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Engine config persisted through the filesystem store.

use warden_app_core::config::{ConfigError, ConfigService};
use warden_app_core::engine_config::{load_engine_config, save_engine_config};
use warden_config_fs::FsConfigStore;
use warden_core::{ActionLimits, EngineConfig, OverflowPolicy};

#[test]
fn engine_config_survives_a_fresh_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = EngineConfig::default();
    config.limits.max_actions = 4;
    config.values.text = OverflowPolicy::Reject;

    let service = ConfigService::new(FsConfigStore::with_base(dir.path()).expect("store"));
    save_engine_config(&service, &config).expect("save");

    let reopened = ConfigService::new(FsConfigStore::with_base(dir.path()).expect("store"));
    assert_eq!(load_engine_config(&reopened).expect("load"), config);
}

#[test]
fn hand_edited_zero_limit_is_rejected_on_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("engine.json"),
        br#"{ "limits": { "max_entries_per_action": 0 } }"#,
    )
    .expect("write");
    let service = ConfigService::new(FsConfigStore::with_base(dir.path()).expect("store"));
    assert!(matches!(
        load_engine_config(&service),
        Err(ConfigError::Invalid(msg)) if msg.contains("max_entries_per_action")
    ));
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("engine.json"),
        br#"{ "limits": { "max_actions": 7 } }"#,
    )
    .expect("write");
    let service = ConfigService::new(FsConfigStore::with_base(dir.path()).expect("store"));
    let config = load_engine_config(&service).expect("load");
    assert_eq!(config.limits.max_actions, 7);
    assert_eq!(
        config.limits.max_event_data,
        ActionLimits::default().max_event_data
    );
}

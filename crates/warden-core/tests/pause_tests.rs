// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Pause gating and the administrative operations that require it.

use warden_core::{ActionList, EngineError, InstanceId, Slot};
use warden_dry_tests::hashes::presets;
use warden_dry_tests::{make_location, make_principal, InstanceFixture, ScriptedApp};

fn fixture() -> InstanceFixture {
    let mut list = ActionList::new();
    list.store(make_location("k"), Slot::from_u128(9));
    InstanceFixture::new(ScriptedApp::new(list)).unwrap()
}

#[test]
fn paused_instance_rejects_exec_until_unpaused() {
    let mut fx = fixture();
    fx.engine.pause(fx.updater, fx.instance).unwrap();
    assert!(fx.engine.instance(&fx.instance).unwrap().is_paused);

    let root = fx.engine.state_root();
    assert_eq!(fx.exec(0), Err(EngineError::InstancePaused(fx.instance)));
    assert_eq!(fx.engine.state_root(), root);

    fx.engine.unpause(fx.updater, fx.instance).unwrap();
    fx.exec(0).unwrap();
    assert_eq!(
        fx.engine.read(&fx.instance, &make_location("k")),
        Slot::from_u128(9)
    );
}

#[test]
fn pause_state_transitions_are_checked() {
    let mut fx = fixture();
    assert_eq!(
        fx.engine.unpause(fx.updater, fx.instance),
        Err(EngineError::NotPaused)
    );
    fx.engine.pause(fx.updater, fx.instance).unwrap();
    assert_eq!(
        fx.engine.pause(fx.updater, fx.instance),
        Err(EngineError::IsPaused)
    );
}

#[test]
fn only_the_updater_pauses() {
    let mut fx = fixture();
    for principal in [fx.caller, presets::admin(), presets::stranger()] {
        assert_eq!(
            fx.engine.pause(principal, fx.instance),
            Err(EngineError::Unauthorized)
        );
    }
    assert!(!fx.engine.instance(&fx.instance).unwrap().is_paused);
}

#[test]
fn admin_ops_on_unknown_instance_fail() {
    let mut fx = fixture();
    let unknown = InstanceId([3u8; 32]);
    assert_eq!(
        fx.engine.pause(fx.updater, unknown),
        Err(EngineError::UnknownInstance(unknown))
    );
    assert_eq!(
        fx.engine.change_caller(fx.caller, unknown, fx.updater),
        Err(EngineError::UnknownInstance(unknown))
    );
}

#[test]
fn allow_list_edits_require_pause() {
    let mut fx = fixture();
    let extra = make_principal("extra");
    assert_eq!(
        fx.engine.add_allowed(fx.updater, fx.instance, &[extra]),
        Err(EngineError::NotPaused)
    );
    assert_eq!(
        fx.engine.remove_allowed(fx.updater, fx.instance, &[fx.app]),
        Err(EngineError::NotPaused)
    );

    fx.engine.pause(fx.updater, fx.instance).unwrap();
    assert_eq!(
        fx.engine.add_allowed(fx.caller, fx.instance, &[extra]),
        Err(EngineError::Unauthorized)
    );
    fx.engine
        .add_allowed(fx.updater, fx.instance, &[extra, extra])
        .unwrap();
    let record = fx.engine.instance(&fx.instance).unwrap();
    assert!(record.allows(&extra));
    assert_eq!(record.allowed.iter().filter(|a| **a == extra).count(), 1);

    fx.engine
        .remove_allowed(fx.updater, fx.instance, &[fx.app])
        .unwrap();
    fx.engine.unpause(fx.updater, fx.instance).unwrap();
    assert_eq!(fx.exec(0), Err(EngineError::TargetNotAllowed(fx.app)));
}

#[test]
fn initializer_change_requires_pause() {
    let mut fx = fixture();
    let next = make_principal("next-initializer");
    assert_eq!(
        fx.engine.change_initializer(fx.updater, fx.instance, next),
        Err(EngineError::NotPaused)
    );
    fx.engine.pause(fx.updater, fx.instance).unwrap();
    assert_eq!(
        fx.engine.change_initializer(presets::stranger(), fx.instance, next),
        Err(EngineError::Unauthorized)
    );
    fx.engine
        .change_initializer(fx.updater, fx.instance, next)
        .unwrap();
    assert_eq!(fx.engine.instance(&fx.instance).unwrap().initializer, next);
}

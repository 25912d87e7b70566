// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
//! `exec` precondition gating: caller, payability, allow-list, payload.

use warden_core::{ActionList, Engine, EngineConfig, EngineError, InstanceId, Slot};
use warden_dry_tests::hashes::presets;
use warden_dry_tests::{
    make_location, make_principal, EmptyApp, EngineTestBuilder, InstanceFixture, ScriptedApp,
};

fn writer() -> ScriptedApp {
    let mut list = ActionList::new();
    list.store(make_location("k"), Slot::from_u128(1));
    ScriptedApp::new(list)
}

#[test]
fn only_the_caller_may_exec_paused_or_not() {
    let mut fx = InstanceFixture::new(writer()).unwrap();
    for principal in [presets::stranger(), fx.updater, presets::admin()] {
        let root = fx.engine.state_root();
        let events = fx.engine.events().len();
        let err = fx
            .engine
            .exec(principal, fx.instance, fx.app, &[0; 4], 0)
            .unwrap_err();
        assert_eq!(err, EngineError::Unauthorized);
        assert_eq!(fx.engine.state_root(), root);
        assert_eq!(fx.engine.events().len(), events);
    }

    fx.engine.pause(fx.updater, fx.instance).unwrap();
    let err = fx
        .engine
        .exec(presets::stranger(), fx.instance, fx.app, &[0; 4], 0)
        .unwrap_err();
    // Pause is checked first, so a paused instance reports the pause.
    assert_eq!(err, EngineError::InstancePaused(fx.instance));
    assert_eq!(fx.engine.read(&fx.instance, &make_location("k")), Slot::ZERO);
}

#[test]
fn change_caller_moves_execution_rights() {
    let mut fx = InstanceFixture::new(writer()).unwrap();
    let next = make_principal("next-caller");

    assert_eq!(
        fx.engine.change_caller(fx.updater, fx.instance, next),
        Err(EngineError::Unauthorized)
    );
    fx.engine.change_caller(fx.caller, fx.instance, next).unwrap();

    assert_eq!(fx.exec(0), Err(EngineError::Unauthorized));
    fx.engine
        .exec(next, fx.instance, fx.app, &[0; 4], 0)
        .unwrap();
}

#[test]
fn zero_and_unknown_instances_are_invalid() {
    let mut fx = InstanceFixture::new(writer()).unwrap();
    let zero = InstanceId::default();
    assert_eq!(
        fx.engine.exec(fx.caller, zero, fx.app, &[0; 4], 0),
        Err(EngineError::InvalidInstance(zero))
    );
    let unknown = InstanceId([7u8; 32]);
    assert_eq!(
        fx.engine.exec(fx.caller, unknown, fx.app, &[0; 4], 0),
        Err(EngineError::InvalidInstance(unknown))
    );
}

#[test]
fn unfinalized_instance_cannot_execute() {
    let fx = InstanceFixture::new(writer()).unwrap();
    let mut snapshot = fx.engine.snapshot();
    for record in &mut snapshot.instances {
        record.is_finalized = false;
    }
    let mut engine =
        Engine::restore(presets::admin(), EngineConfig::default(), snapshot).unwrap();
    engine.deploy(fx.app, writer()).unwrap();
    assert_eq!(
        engine.exec(fx.caller, fx.instance, fx.app, &[0; 4], 0),
        Err(EngineError::NotFinalized(fx.instance))
    );
}

#[test]
fn value_on_non_payable_instance_is_rejected() {
    let builder = EngineTestBuilder::new().with_balance(presets::caller(), 10);
    let mut fx = InstanceFixture::with_builder(builder, writer(), false).unwrap();
    assert_eq!(fx.exec(1), Err(EngineError::NotPayable));
    assert_eq!(fx.engine.ledger().balance(&fx.caller), 10);
}

#[test]
fn never_allowed_target_is_rejected() {
    let mut fx = InstanceFixture::new(writer()).unwrap();
    let fresh = make_principal("fresh-app");
    fx.engine.deploy(fresh, writer()).unwrap();
    assert_eq!(
        fx.engine.exec(fx.caller, fx.instance, fresh, &[0; 4], 0),
        Err(EngineError::TargetNotAllowed(fresh))
    );
}

#[test]
fn payload_must_hold_a_selector() {
    let mut fx = InstanceFixture::new(writer()).unwrap();
    assert_eq!(
        fx.engine.exec(fx.caller, fx.instance, fx.app, &[1, 2, 3], 0),
        Err(EngineError::MalformedPayload { len: 3 })
    );
}

#[test]
fn allowed_target_without_logic_reports_no_application() {
    let mut fx = InstanceFixture::new(writer()).unwrap();
    let ghost = make_principal("ghost");
    fx.engine.pause(fx.updater, fx.instance).unwrap();
    fx.engine.add_allowed(fx.updater, fx.instance, &[ghost]).unwrap();
    fx.engine.unpause(fx.updater, fx.instance).unwrap();
    assert_eq!(
        fx.engine.exec(fx.caller, fx.instance, ghost, &[0; 4], 0),
        Err(EngineError::NoApplication(ghost))
    );
}

#[test]
fn sender_must_cover_attached_value() {
    let mut fx = InstanceFixture::payable(writer(), 3).unwrap();
    assert_eq!(
        fx.exec(4),
        Err(EngineError::InsufficientFunds {
            available: 3,
            required: 4
        })
    );
}

#[test]
fn duplicate_deploy_is_rejected() {
    let mut engine = EngineTestBuilder::new()
        .with_app(make_principal("a"), EmptyApp)
        .build()
        .unwrap();
    assert_eq!(
        engine.deploy(make_principal("a"), EmptyApp),
        Err(EngineError::DuplicateApplication(make_principal("a")))
    );
}

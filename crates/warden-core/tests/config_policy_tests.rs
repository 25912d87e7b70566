// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Engine configuration: typed-write policy and action-list bounds.

use warden_core::{
    ActionError, ActionLimits, ActionList, EngineConfig, EngineError, OverflowPolicy, Selector,
    Slot, ValuePolicy, SLOT_WIDTH,
};
use warden_dry_tests::{
    make_location, make_principal, EchoPayloadApp, EngineTestBuilder, InstanceFixture,
    TextWriterApp,
};

fn text_payload(text: &str) -> Vec<u8> {
    let mut payload = vec![0u8; Selector::WIDTH];
    payload.extend(text.as_bytes());
    payload
}

fn text_fixture(policy: OverflowPolicy) -> InstanceFixture {
    let config = EngineConfig {
        values: ValuePolicy {
            text: policy,
            ..ValuePolicy::default()
        },
        ..EngineConfig::default()
    };
    let builder = EngineTestBuilder::new().with_config(config);
    InstanceFixture::with_builder(builder, TextWriterApp::new(make_location("name")), false)
        .unwrap()
}

#[test]
fn long_text_is_truncated_under_default_policy() {
    let mut fx = text_fixture(OverflowPolicy::Truncate);
    let long = "x".repeat(SLOT_WIDTH + 8);
    fx.engine
        .exec(fx.caller, fx.instance, fx.app, &text_payload(&long), 0)
        .unwrap();
    let slot = fx.engine.read(&fx.instance, &make_location("name"));
    assert_eq!(slot.text_bytes(), &long.as_bytes()[..SLOT_WIDTH]);
}

#[test]
fn long_text_reverts_under_rejecting_policy() {
    let mut fx = text_fixture(OverflowPolicy::Reject);
    let long = "x".repeat(SLOT_WIDTH + 1);
    let err = fx
        .engine
        .exec(fx.caller, fx.instance, fx.app, &text_payload(&long), 0)
        .unwrap_err();
    assert!(matches!(err, EngineError::ApplicationReverted { reason: Some(_), .. }));
    assert_eq!(fx.engine.read(&fx.instance, &make_location("name")), Slot::ZERO);

    fx.engine
        .exec(fx.caller, fx.instance, fx.app, &text_payload("short"), 0)
        .unwrap();
    assert_eq!(
        fx.engine.read(&fx.instance, &make_location("name")).text_bytes(),
        b"short"
    );
}

#[test]
fn configured_action_bound_is_enforced() {
    let config = EngineConfig {
        limits: ActionLimits {
            max_actions: 2,
            ..ActionLimits::default()
        },
        ..EngineConfig::default()
    };
    let builder = EngineTestBuilder::new().with_config(config);
    let mut fx = InstanceFixture::with_builder(builder, EchoPayloadApp, false).unwrap();

    let mut list = ActionList::new();
    list.store(make_location("a"), Slot::from_u128(1))
        .emit(Vec::new(), Vec::new())
        .pay(make_principal("x"), 0);
    let payload = EchoPayloadApp::payload(Selector([0; 4]), &list);
    assert_eq!(
        fx.engine.exec(fx.caller, fx.instance, fx.app, &payload, 0),
        Err(EngineError::InvalidActionList(ActionError::TooManyActions { max: 2 }))
    );
    assert_eq!(fx.engine.config().limits.max_actions, 2);
}

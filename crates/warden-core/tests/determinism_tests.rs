// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Location derivation is pure and instance namespaces never alias.

use proptest::prelude::*;
use warden_core::{
    location_with_seed, namespaced_location, true_location, ActionLimits, ActionList, Engine,
    InstanceId, InstanceSpec, Selector, Slot, StorageLocation,
};
use warden_dry_tests::hashes::presets;
use warden_dry_tests::{initializer_app, EchoPayloadApp, EngineTestBuilder};

fn two_instances() -> (Engine, InstanceId, InstanceId) {
    let mut engine = EngineTestBuilder::new()
        .with_app(presets::initializer(), initializer_app())
        .with_app(presets::app(), EchoPayloadApp)
        .build()
        .unwrap();
    let spec = || InstanceSpec {
        updater: presets::updater(),
        is_payable: false,
        initializer: presets::initializer(),
        init_calldata: Vec::new(),
        allowed: vec![presets::app()],
    };
    let a = engine.create_instance(presets::caller(), spec()).unwrap();
    let b = engine.create_instance(presets::caller(), spec()).unwrap();
    (engine, a, b)
}

fn write(engine: &mut Engine, instance: InstanceId, location: StorageLocation, value: Slot) {
    let mut list = ActionList::new();
    list.store(location, value);
    let payload = EchoPayloadApp::payload(Selector([0; 4]), &list);
    engine
        .exec(presets::caller(), instance, presets::app(), &payload, 0)
        .unwrap();
}

#[test]
fn repeated_creation_yields_distinct_instances() {
    let (_engine, a, b) = two_instances();
    assert_ne!(a, b);
}

proptest! {
    #[test]
    fn location_derivation_is_pure(
        key in prop::collection::vec(any::<u8>(), 0..96),
        seed in any::<[u8; 32]>(),
    ) {
        prop_assert_eq!(true_location(&key), true_location(&key));
        prop_assert_eq!(location_with_seed(&key, &seed), location_with_seed(&key, &seed));
        prop_assert_ne!(true_location(&key), location_with_seed(&key, &seed));
    }

    #[test]
    fn distinct_seeds_give_distinct_locations(
        key in prop::collection::vec(any::<u8>(), 1..64),
        a in any::<[u8; 32]>(),
        b in any::<[u8; 32]>(),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(location_with_seed(&key, &a), location_with_seed(&key, &b));
    }

    #[test]
    fn namespaces_are_isolated(
        key in prop::collection::vec(any::<u8>(), 1..32),
        va in 1u128..,
        vb in 1u128..,
    ) {
        let (mut engine, a, b) = two_instances();
        let location = true_location(&key);
        prop_assert_ne!(namespaced_location(&a, &location), namespaced_location(&b, &location));

        write(&mut engine, a, location, Slot::from_u128(va));
        prop_assert_eq!(engine.read(&a, &location), Slot::from_u128(va));
        prop_assert_eq!(engine.read(&b, &location), Slot::ZERO);

        write(&mut engine, b, location, Slot::from_u128(vb));
        prop_assert_eq!(engine.read(&a, &location), Slot::from_u128(va));
        prop_assert_eq!(engine.read(&b, &location), Slot::from_u128(vb));
    }

    #[test]
    fn decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = ActionList::decode(&bytes, &ActionLimits::default());
    }

    #[test]
    fn identical_histories_share_a_state_root(
        values in prop::collection::vec(any::<u128>(), 1..8),
    ) {
        let (mut left, la, _) = two_instances();
        let (mut right, ra, _) = two_instances();
        prop_assert_eq!(la, ra);
        for (i, v) in values.iter().enumerate() {
            let location = true_location(&i.to_le_bytes());
            write(&mut left, la, location, Slot::from_u128(*v));
            write(&mut right, ra, location, Slot::from_u128(*v));
        }
        prop_assert_eq!(left.state_root(), right.state_root());
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Application logic seam.
//!
//! An application is registered under a [`PrincipalId`] and invoked by the
//! executor with a read-only [`ExecContext`] over the calling instance's
//! namespace. It answers with an encoded [`ActionList`](crate::ActionList)
//! describing the effects it wants; it cannot mutate anything itself.
use std::collections::BTreeMap;

use crate::ident::{InstanceId, PrincipalId, StorageLocation};
use crate::slot::{Slot, SlotError, SlotValue, ValuePolicy};
use crate::store::KeyedStore;

/// A low-level revert raised by application logic.
///
/// Reverts abort the enclosing call entirely. Use a `THRW` action instead
/// when the call should complete and only report the failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppRevert {
    /// Optional human-readable reason.
    pub reason: Option<String>,
}

impl AppRevert {
    /// A revert carrying `reason`.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

/// Read-only view handed to application logic during a delegated call.
///
/// Reads resolve against the instance's namespace, not the application's.
#[derive(Clone, Copy, Debug)]
pub struct ExecContext<'a> {
    store: &'a KeyedStore,
    instance: InstanceId,
    sender: PrincipalId,
    target: PrincipalId,
    value: u128,
    values: ValuePolicy,
}

impl<'a> ExecContext<'a> {
    pub(crate) fn new(
        store: &'a KeyedStore,
        instance: InstanceId,
        sender: PrincipalId,
        target: PrincipalId,
        value: u128,
        values: ValuePolicy,
    ) -> Self {
        Self {
            store,
            instance,
            sender,
            target,
            value,
            values,
        }
    }

    /// Instance whose namespace this call executes in.
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Principal that invoked the executor.
    #[must_use]
    pub fn sender(&self) -> PrincipalId {
        self.sender
    }

    /// Address the application was invoked as.
    #[must_use]
    pub fn target(&self) -> PrincipalId {
        self.target
    }

    /// Native value attached to the call.
    #[must_use]
    pub fn value(&self) -> u128 {
        self.value
    }

    /// Reads a logical location in the instance namespace.
    #[must_use]
    pub fn read(&self, location: &StorageLocation) -> Slot {
        self.store.read(&self.instance, location)
    }

    /// Reads several logical locations in order.
    #[must_use]
    pub fn read_multi(&self, locations: &[StorageLocation]) -> Vec<Slot> {
        self.store.read_multi(&self.instance, locations)
    }

    /// Encodes a typed value under the engine's configured policy.
    ///
    /// # Errors
    /// See [`SlotValue::encode`].
    pub fn encode(&self, value: &SlotValue) -> Result<Slot, SlotError> {
        value.encode(&self.values)
    }
}

/// Application logic invoked by the executor.
pub trait ApplicationLogic {
    /// Handles `payload` and returns the encoded action list to apply.
    ///
    /// # Errors
    /// Returns [`AppRevert`] to abort the enclosing call with no effects.
    fn handle(&self, ctx: &ExecContext<'_>, payload: &[u8]) -> Result<Vec<u8>, AppRevert>;
}

impl<F> ApplicationLogic for F
where
    F: Fn(&ExecContext<'_>, &[u8]) -> Result<Vec<u8>, AppRevert>,
{
    fn handle(&self, ctx: &ExecContext<'_>, payload: &[u8]) -> Result<Vec<u8>, AppRevert> {
        self(ctx, payload)
    }
}

/// Deployed application logic keyed by address.
#[derive(Default)]
pub struct AppDirectory {
    apps: BTreeMap<PrincipalId, Box<dyn ApplicationLogic>>,
}

impl AppDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `logic` at `address`. Returns `false` if the address is
    /// already taken (the directory is unchanged).
    pub fn insert(&mut self, address: PrincipalId, logic: Box<dyn ApplicationLogic>) -> bool {
        if self.apps.contains_key(&address) {
            return false;
        }
        self.apps.insert(address, logic);
        true
    }

    /// Looks up the logic deployed at `address`.
    #[must_use]
    pub fn get(&self, address: &PrincipalId) -> Option<&dyn ApplicationLogic> {
        self.apps.get(address).map(Box::as_ref)
    }

    /// Returns `true` when logic is deployed at `address`.
    #[must_use]
    pub fn contains(&self, address: &PrincipalId) -> bool {
        self.apps.contains_key(address)
    }

    /// Number of deployed applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Returns `true` when nothing is deployed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl core::fmt::Debug for AppDirectory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppDirectory")
            .field("addresses", &self.apps.keys().collect::<Vec<_>>())
            .finish()
    }
}

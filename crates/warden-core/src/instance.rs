// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-instance metadata and its administrative lifecycle.
//!
//! Two principals govern an instance:
//! - the `updater` pauses/unpauses it and, only while paused, edits the
//!   allowed-callee set and swaps the initializer;
//! - the `caller` is the only principal that may execute against it, and the
//!   only one that may hand that right to someone else.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine_impl::EngineError;
use crate::ident::{InstanceId, PrincipalId};

/// Parameters for creating an instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceSpec {
    /// Principal with administrative rights.
    pub updater: PrincipalId,
    /// Whether `exec` may carry native value.
    pub is_payable: bool,
    /// Logic that populates the instance's initial storage.
    pub initializer: PrincipalId,
    /// Payload for the initializer call.
    pub init_calldata: Vec<u8>,
    /// Applications `exec` may target, in insertion order.
    pub allowed: Vec<PrincipalId>,
}

/// Metadata of one instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Instance id.
    pub id: InstanceId,
    /// Principal that created the instance.
    pub creator: PrincipalId,
    /// Paused instances reject `exec`.
    pub is_paused: bool,
    /// Set once initialization has committed.
    pub is_finalized: bool,
    /// Fixed at creation.
    pub is_payable: bool,
    /// Administrative principal.
    pub updater: PrincipalId,
    /// Execution principal.
    pub caller: PrincipalId,
    /// Initializer logic address.
    pub initializer: PrincipalId,
    /// Allowed callees, insertion-ordered, no duplicates.
    pub allowed: Vec<PrincipalId>,
}

impl InstanceRecord {
    /// Returns `true` when `target` may be executed against this instance.
    #[must_use]
    pub fn allows(&self, target: &PrincipalId) -> bool {
        self.allowed.contains(target)
    }
}

/// All instances, keyed by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceRegistry {
    records: BTreeMap<InstanceId, InstanceRecord>,
}

impl InstanceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an instance.
    #[must_use]
    pub fn get(&self, id: &InstanceId) -> Option<&InstanceRecord> {
        self.records.get(id)
    }

    /// Returns `true` when `id` is allocated.
    #[must_use]
    pub fn contains(&self, id: &InstanceId) -> bool {
        self.records.contains_key(id)
    }

    /// Iterate records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.records.values()
    }

    /// Number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no instance exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn insert(&mut self, record: InstanceRecord) {
        self.records.insert(record.id, record);
    }

    /// Pauses `id`. Only the updater; fails if already paused.
    pub(crate) fn pause(&mut self, sender: &PrincipalId, id: &InstanceId) -> Result<(), EngineError> {
        let record = self.as_updater(sender, id)?;
        if record.is_paused {
            return Err(EngineError::IsPaused);
        }
        record.is_paused = true;
        info!(instance = %id, "instance paused");
        Ok(())
    }

    /// Unpauses `id`. Only the updater; fails if not paused.
    pub(crate) fn unpause(&mut self, sender: &PrincipalId, id: &InstanceId) -> Result<(), EngineError> {
        let record = self.as_updater(sender, id)?;
        if !record.is_paused {
            return Err(EngineError::NotPaused);
        }
        record.is_paused = false;
        info!(instance = %id, "instance unpaused");
        Ok(())
    }

    /// Swaps the initializer. Only the updater, only while paused.
    pub(crate) fn change_initializer(
        &mut self,
        sender: &PrincipalId,
        id: &InstanceId,
        initializer: PrincipalId,
    ) -> Result<(), EngineError> {
        let record = self.as_paused_updater(sender, id)?;
        record.initializer = initializer;
        info!(instance = %id, initializer = %initializer, "initializer changed");
        Ok(())
    }

    /// Transfers execution rights. Only the current caller.
    pub(crate) fn change_caller(
        &mut self,
        sender: &PrincipalId,
        id: &InstanceId,
        caller: PrincipalId,
    ) -> Result<(), EngineError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or(EngineError::UnknownInstance(*id))?;
        if record.caller != *sender {
            return Err(EngineError::Unauthorized);
        }
        record.caller = caller;
        info!(instance = %id, caller = %caller, "caller changed");
        Ok(())
    }

    /// Adds callees not already allowed, preserving insertion order. Only
    /// the updater, only while paused.
    pub(crate) fn add_allowed(
        &mut self,
        sender: &PrincipalId,
        id: &InstanceId,
        addrs: &[PrincipalId],
    ) -> Result<(), EngineError> {
        let record = self.as_paused_updater(sender, id)?;
        for addr in addrs {
            if !record.allowed.contains(addr) {
                record.allowed.push(*addr);
            }
        }
        info!(instance = %id, allowed = record.allowed.len(), "allowed callees added");
        Ok(())
    }

    /// Removes callees; absent entries are ignored. Only the updater, only
    /// while paused.
    pub(crate) fn remove_allowed(
        &mut self,
        sender: &PrincipalId,
        id: &InstanceId,
        addrs: &[PrincipalId],
    ) -> Result<(), EngineError> {
        let record = self.as_paused_updater(sender, id)?;
        record.allowed.retain(|a| !addrs.contains(a));
        info!(instance = %id, allowed = record.allowed.len(), "allowed callees removed");
        Ok(())
    }

    fn as_updater(
        &mut self,
        sender: &PrincipalId,
        id: &InstanceId,
    ) -> Result<&mut InstanceRecord, EngineError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or(EngineError::UnknownInstance(*id))?;
        if record.updater != *sender {
            return Err(EngineError::Unauthorized);
        }
        Ok(record)
    }

    fn as_paused_updater(
        &mut self,
        sender: &PrincipalId,
        id: &InstanceId,
    ) -> Result<&mut InstanceRecord, EngineError> {
        let record = self.as_updater(sender, id)?;
        if !record.is_paused {
            return Err(EngineError::NotPaused);
        }
        Ok(record)
    }
}

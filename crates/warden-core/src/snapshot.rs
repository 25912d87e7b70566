// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent state capture and the canonical state root.
//!
//! State root encoding (all length prefixes are 8-byte little-endian, ids
//! and slots are raw 32-byte values):
//! - format version (`u16` LE), instance nonce (`u64` LE);
//! - slot count, then every `(true location, value)` in ascending location
//!   order;
//! - instance count, then every record in ascending id order: id, creator,
//!   flag byte (`paused | finalized << 1 | payable << 2`), updater, caller,
//!   initializer, allowed count, allowed ids in insertion order;
//! - balance count, then every `(principal, amount:u128 LE)` ascending;
//! - escrow (`u128` LE);
//! - rejecting count, then every principal ascending.
//!
//! Changing any of these rules changes every state root.
use std::collections::{BTreeMap, BTreeSet};

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::STATE_FORMAT_VERSION;
use crate::ident::{Hash, PrincipalId, StorageLocation};
use crate::instance::{InstanceRecord, InstanceRegistry};
use crate::ledger::Ledger;
use crate::slot::Slot;
use crate::store::KeyedStore;

/// Snapshot failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot was written by a different format version.
    #[error("unsupported snapshot format version {0}")]
    UnsupportedVersion(u16),
    /// CBOR encoding failed.
    #[error("snapshot encode failed: {0}")]
    Encode(String),
    /// CBOR decoding failed.
    #[error("snapshot decode failed: {0}")]
    Decode(String),
}

/// Serializable copy of an engine's persistent state.
///
/// Deployed application logic and the notification log are not part of a
/// snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Encoding version; see [`STATE_FORMAT_VERSION`].
    pub format_version: u16,
    /// Next instance-id nonce.
    pub nonce: u64,
    /// Every non-zero slot, keyed by true location, ascending.
    pub slots: Vec<(StorageLocation, Slot)>,
    /// Every instance record, ascending by id.
    pub instances: Vec<InstanceRecord>,
    /// Every non-zero balance, ascending by principal.
    pub balances: Vec<(PrincipalId, u128)>,
    /// Executor escrow.
    pub escrow: u128,
    /// Principals refusing payouts, ascending.
    pub rejecting: Vec<PrincipalId>,
}

impl StateSnapshot {
    pub(crate) fn capture(
        store: &KeyedStore,
        instances: &InstanceRegistry,
        ledger: &Ledger,
        nonce: u64,
    ) -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            nonce,
            slots: store.iter().map(|(l, v)| (*l, *v)).collect(),
            instances: instances.iter().cloned().collect(),
            balances: ledger.iter_balances().map(|(p, b)| (*p, *b)).collect(),
            escrow: ledger.escrow(),
            rejecting: ledger.iter_rejecting().copied().collect(),
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> Result<(KeyedStore, InstanceRegistry, Ledger, u64), SnapshotError> {
        if self.format_version != STATE_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.format_version));
        }
        let store = KeyedStore::from_entries(self.slots);
        let mut instances = InstanceRegistry::new();
        for record in self.instances {
            instances.insert(record);
        }
        let balances: BTreeMap<PrincipalId, u128> =
            self.balances.into_iter().filter(|(_, b)| *b != 0).collect();
        let rejecting: BTreeSet<PrincipalId> = self.rejecting.into_iter().collect();
        let ledger = Ledger::restore_parts(balances, self.escrow, rejecting);
        Ok((store, instances, ledger, self.nonce))
    }

    /// Encodes the snapshot as CBOR.
    ///
    /// # Errors
    /// [`SnapshotError::Encode`] if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|e| SnapshotError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Decodes a snapshot from CBOR.
    ///
    /// # Errors
    /// [`SnapshotError::Decode`] on malformed input.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, SnapshotError> {
        ciborium::de::from_reader(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}

pub(crate) fn compute_state_root(
    store: &KeyedStore,
    instances: &InstanceRegistry,
    ledger: &Ledger,
    nonce: u64,
) -> Hash {
    let mut h = Hasher::new();
    h.update(&STATE_FORMAT_VERSION.to_le_bytes());
    h.update(&nonce.to_le_bytes());

    h.update(&(store.len() as u64).to_le_bytes());
    for (location, value) in store.iter() {
        h.update(&location.0);
        h.update(&value.0);
    }

    h.update(&(instances.len() as u64).to_le_bytes());
    for record in instances.iter() {
        hash_record(&mut h, record);
    }

    let balances: Vec<_> = ledger.iter_balances().collect();
    h.update(&(balances.len() as u64).to_le_bytes());
    for (principal, amount) in balances {
        h.update(&principal.0);
        h.update(&amount.to_le_bytes());
    }
    h.update(&ledger.escrow().to_le_bytes());

    let rejecting: Vec<_> = ledger.iter_rejecting().collect();
    h.update(&(rejecting.len() as u64).to_le_bytes());
    for principal in rejecting {
        h.update(&principal.0);
    }
    h.finalize().into()
}

fn hash_record(h: &mut Hasher, record: &InstanceRecord) {
    h.update(&record.id.0);
    h.update(&record.creator.0);
    let flags = u8::from(record.is_paused)
        | (u8::from(record.is_finalized) << 1)
        | (u8::from(record.is_payable) << 2);
    h.update(&[flags]);
    h.update(&record.updater.0);
    h.update(&record.caller.0);
    h.update(&record.initializer.0);
    h.update(&(record.allowed.len() as u64).to_le_bytes());
    for addr in &record.allowed {
        h.update(&addr.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{make_principal_id, true_location, InstanceId};

    #[test]
    fn empty_state_root_is_stable() {
        let a = compute_state_root(&KeyedStore::new(), &InstanceRegistry::new(), &Ledger::new(), 0);
        let b = compute_state_root(&KeyedStore::new(), &InstanceRegistry::new(), &Ledger::new(), 0);
        assert_eq!(a, b);
    }

    #[test]
    fn slot_changes_move_the_root() {
        let mut store = KeyedStore::new();
        let empty = compute_state_root(&store, &InstanceRegistry::new(), &Ledger::new(), 0);
        store.write(&InstanceId([1u8; 32]), &true_location(b"k"), Slot::from_u128(1));
        let written = compute_state_root(&store, &InstanceRegistry::new(), &Ledger::new(), 0);
        assert_ne!(empty, written);
    }

    #[test]
    fn snapshot_round_trips_through_cbor() {
        let mut store = KeyedStore::new();
        store.write(&InstanceId([1u8; 32]), &true_location(b"k"), Slot::from_u128(9));
        let mut ledger = Ledger::new();
        assert!(ledger.deposit(make_principal_id("p"), u128::MAX).is_ok());
        ledger.set_rejects_payments(make_principal_id("r"), true);
        let snap = StateSnapshot::capture(&store, &InstanceRegistry::new(), &ledger, 3);
        let bytes = snap.to_cbor().unwrap_or_default();
        let back = StateSnapshot::from_cbor(&bytes);
        assert!(matches!(back, Ok(ref s) if *s == snap));
    }

    #[test]
    fn foreign_format_version_is_rejected() {
        let mut snap =
            StateSnapshot::capture(&KeyedStore::new(), &InstanceRegistry::new(), &Ledger::new(), 0);
        snap.format_version = STATE_FORMAT_VERSION + 1;
        assert!(matches!(
            snap.into_parts(),
            Err(SnapshotError::UnsupportedVersion(v)) if v == STATE_FORMAT_VERSION + 1
        ));
    }
}

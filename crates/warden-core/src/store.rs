// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Flat keyed slot storage shared by every instance.
//!
//! The backing map is keyed by true location. Namespaced reads and writes
//! resolve the caller's logical location through
//! [`namespaced_location`](crate::ident::namespaced_location), so two
//! instances using the same logical key never touch the same entry.
use std::collections::BTreeMap;

use crate::ident::{namespaced_location, InstanceId, StorageLocation};
use crate::slot::{Slot, SlotError, SlotValue, ValuePolicy};

/// In-memory slot store.
///
/// Zero slots are never materialised: writing zero removes the entry, so a
/// read of an unset location and a read of a stored zero both return
/// [`Slot::ZERO`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedStore {
    slots: BTreeMap<StorageLocation, Slot>,
}

impl KeyedStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-zero slots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no non-zero slot is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over `(true location, value)` in ascending location order.
    pub fn iter(&self) -> impl Iterator<Item = (&StorageLocation, &Slot)> {
        self.slots.iter()
    }

    /// Unconditionally overwrites the slot at a true location.
    pub fn write_true(&mut self, location: StorageLocation, value: Slot) {
        if value.is_zero() {
            self.slots.remove(&location);
        } else {
            self.slots.insert(location, value);
        }
    }

    /// Reads the slot at a true location.
    #[must_use]
    pub fn read_true(&self, location: &StorageLocation) -> Slot {
        self.slots.get(location).copied().unwrap_or(Slot::ZERO)
    }

    /// Writes `value` at `location` inside `instance`'s namespace.
    pub fn write(&mut self, instance: &InstanceId, location: &StorageLocation, value: Slot) {
        self.write_true(namespaced_location(instance, location), value);
    }

    /// Writes pairs in array order; later pairs win on duplicate locations.
    pub fn write_multi(&mut self, instance: &InstanceId, pairs: &[(StorageLocation, Slot)]) {
        for (location, value) in pairs {
            self.write(instance, location, *value);
        }
    }

    /// Encodes and writes a typed value.
    ///
    /// # Errors
    /// Propagates [`SlotError`] from [`SlotValue::encode`]; the store is
    /// unchanged on error.
    pub fn write_value(
        &mut self,
        instance: &InstanceId,
        location: &StorageLocation,
        value: &SlotValue,
        policy: &ValuePolicy,
    ) -> Result<(), SlotError> {
        let slot = value.encode(policy)?;
        self.write(instance, location, slot);
        Ok(())
    }

    /// Reads `location` inside `instance`'s namespace.
    #[must_use]
    pub fn read(&self, instance: &InstanceId, location: &StorageLocation) -> Slot {
        self.read_true(&namespaced_location(instance, location))
    }

    /// Reads each location in order.
    #[must_use]
    pub fn read_multi(&self, instance: &InstanceId, locations: &[StorageLocation]) -> Vec<Slot> {
        locations.iter().map(|l| self.read(instance, l)).collect()
    }

    pub(crate) fn from_entries(entries: impl IntoIterator<Item = (StorageLocation, Slot)>) -> Self {
        let mut store = Self::new();
        for (location, value) in entries {
            store.write_true(location, value);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::true_location;

    fn instance(byte: u8) -> InstanceId {
        InstanceId([byte; 32])
    }

    #[test]
    fn unset_and_zero_read_the_same() {
        let mut store = KeyedStore::new();
        let loc = true_location(b"count");
        assert_eq!(store.read(&instance(1), &loc), Slot::ZERO);
        store.write(&instance(1), &loc, Slot::from_u128(3));
        store.write(&instance(1), &loc, Slot::ZERO);
        assert_eq!(store.read(&instance(1), &loc), Slot::ZERO);
        assert!(store.is_empty());
    }

    #[test]
    fn write_multi_applies_in_order() {
        let mut store = KeyedStore::new();
        let loc = true_location(b"x");
        store.write_multi(
            &instance(1),
            &[(loc, Slot::from_u128(1)), (loc, Slot::from_u128(2))],
        );
        assert_eq!(store.read(&instance(1), &loc), Slot::from_u128(2));
    }

    #[test]
    fn read_multi_preserves_request_order() {
        let mut store = KeyedStore::new();
        let a = true_location(b"a");
        let b = true_location(b"b");
        store.write(&instance(2), &a, Slot::from_u128(10));
        store.write(&instance(2), &b, Slot::from_u128(20));
        let got = store.read_multi(&instance(2), &[b, a, b]);
        assert_eq!(
            got,
            vec![Slot::from_u128(20), Slot::from_u128(10), Slot::from_u128(20)]
        );
    }

    #[test]
    fn rejected_typed_write_leaves_store_untouched() {
        let mut store = KeyedStore::new();
        let loc = true_location(b"neg");
        let res = store.write_value(
            &instance(3),
            &loc,
            &SlotValue::Signed(-5),
            &ValuePolicy::default(),
        );
        assert!(res.is_err());
        assert!(store.is_empty());
    }
}

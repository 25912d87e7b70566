// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Execution receipts: what one call committed.
//!
//! A receipt pairs the effect counts returned to the caller with a canonical
//! digest over the committed effects, in commit order. Two engines that
//! commit the same effects for the same instance and target produce the
//! same digest regardless of slot iteration order or event sequence numbers.
use blake3::Hasher;

use crate::action::Effects;
use crate::constants::RECEIPT_FORMAT_VERSION;
use crate::ident::{Hash, InstanceId, PrincipalId};

/// Effect counts of one call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ExecSummary {
    /// Application events re-emitted.
    pub events_emitted: u64,
    /// Payouts made.
    pub addresses_paid: u64,
    /// Slots written.
    pub slots_written: u64,
}

impl ExecSummary {
    /// Returns `true` when nothing was applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How a call terminated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecDisposition {
    /// Effects were applied.
    Applied,
    /// The application reported a named exception; nothing was applied.
    Exception {
        /// The application's message.
        message: String,
    },
}

/// Outcome of one committed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecReceipt {
    instance: InstanceId,
    target: PrincipalId,
    disposition: ExecDisposition,
    summary: ExecSummary,
    digest: Hash,
}

impl ExecReceipt {
    pub(crate) fn applied(instance: InstanceId, target: PrincipalId, effects: &Effects) -> Self {
        let summary = ExecSummary {
            events_emitted: effects.emits.len() as u64,
            addresses_paid: effects.pays.len() as u64,
            slots_written: effects.stores.len() as u64,
        };
        let digest = applied_digest(&instance, &target, effects);
        Self {
            instance,
            target,
            disposition: ExecDisposition::Applied,
            summary,
            digest,
        }
    }

    pub(crate) fn exception(instance: InstanceId, target: PrincipalId, message: String) -> Self {
        let digest = exception_digest(&instance, &target, &message);
        Self {
            instance,
            target,
            disposition: ExecDisposition::Exception { message },
            summary: ExecSummary::default(),
            digest,
        }
    }

    /// Instance the call ran against.
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Application invoked.
    #[must_use]
    pub fn target(&self) -> PrincipalId {
        self.target
    }

    /// Terminal disposition.
    #[must_use]
    pub fn disposition(&self) -> &ExecDisposition {
        &self.disposition
    }

    /// Effect counts.
    #[must_use]
    pub fn summary(&self) -> ExecSummary {
        self.summary
    }

    /// Canonical digest over the committed effects.
    ///
    /// Covers the format version, instance, target, disposition, and every
    /// effect in commit order (stores, events, payouts). Event sequence
    /// numbers are not included.
    #[must_use]
    pub fn digest(&self) -> Hash {
        self.digest
    }
}

fn receipt_hasher(instance: &InstanceId, target: &PrincipalId, code: u8) -> Hasher {
    let mut h = Hasher::new();
    h.update(&RECEIPT_FORMAT_VERSION.to_le_bytes());
    h.update(&instance.0);
    h.update(&target.0);
    h.update(&[code]);
    h
}

fn exception_digest(instance: &InstanceId, target: &PrincipalId, message: &str) -> Hash {
    let mut h = receipt_hasher(instance, target, 2);
    h.update(&(message.len() as u64).to_le_bytes());
    h.update(message.as_bytes());
    h.finalize().into()
}

fn applied_digest(instance: &InstanceId, target: &PrincipalId, effects: &Effects) -> Hash {
    let mut h = receipt_hasher(instance, target, 1);
    h.update(&(effects.stores.len() as u64).to_le_bytes());
    for (location, value) in &effects.stores {
        h.update(&location.0);
        h.update(&value.0);
    }
    h.update(&(effects.emits.len() as u64).to_le_bytes());
    for event in &effects.emits {
        h.update(&(event.topics.len() as u64).to_le_bytes());
        for topic in &event.topics {
            h.update(topic);
        }
        h.update(&(event.data.len() as u64).to_le_bytes());
        h.update(&event.data);
    }
    h.update(&(effects.pays.len() as u64).to_le_bytes());
    for (destination, amount) in &effects.pays {
        h.update(&destination.0);
        h.update(&amount.to_le_bytes());
    }
    h.finalize().into()
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifiers and storage location derivation.
//!
//! Every identity in the engine is a 32-byte value. Storage locations are
//! derived with domain-separated BLAKE3 hashes so that a plain key and a
//! seeded key can never produce the same location, and so that two seeds
//! choosing the same logical key land in unrelated slots.
use blake3::Hasher;
use serde::{Deserialize, Serialize};

/// Canonical 256-bit hash used for locations, ids, and digests.
pub type Hash = [u8; 32];

macro_rules! short_hex_display {
    ($ty:ident) => {
        impl core::fmt::Display for $ty {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&hex::encode(&self.0[..8]))
            }
        }
    };
}

/// Opaque address-like identity: instance owners, callers, and application
/// targets all share this type. Only equality and ordering carry meaning.
#[repr(transparent)]
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct PrincipalId(pub Hash);

impl PrincipalId {
    /// The all-zero principal.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Returns `true` for the all-zero principal.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

short_hex_display!(PrincipalId);

/// Identifier of one execution instance.
///
/// Zero is reserved as invalid; [`make_instance_id`] never returns it in
/// practice and the executor rejects it explicitly.
#[repr(transparent)]
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct InstanceId(pub Hash);

impl InstanceId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Returns `true` for the reserved zero id.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

short_hex_display!(InstanceId);

/// A 256-bit storage address.
///
/// Locations are used both as map keys and as base offsets for multi-field
/// records (`loc + 1`, `loc + 2`, ...). The arithmetic is big-endian and
/// wraps at 2^256.
#[repr(transparent)]
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct StorageLocation(pub Hash);

impl StorageLocation {
    /// Returns the canonical byte representation of this location.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Returns the location `n` slots after `self`.
    #[must_use]
    pub fn offset(&self, n: u64) -> Self {
        let mut out = self.0;
        let mut carry = u128::from(n);
        for byte in out.iter_mut().rev() {
            if carry == 0 {
                break;
            }
            let sum = u128::from(*byte) + (carry & 0xff);
            // Truncation keeps the low byte; the rest moves into the carry.
            #[allow(clippy::cast_possible_truncation)]
            {
                *byte = sum as u8;
            }
            carry = (carry >> 8) + (sum >> 8);
        }
        Self(out)
    }
}

short_hex_display!(StorageLocation);

/// A 4-byte function selector taken from the head of a call payload.
#[repr(transparent)]
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// Width of a selector in bytes; also the minimum payload length.
    pub const WIDTH: usize = 4;

    /// Derives the selector of a human-readable signature such as
    /// `"transfer(bytes32,uint256)"`.
    #[must_use]
    pub fn from_signature(signature: &str) -> Self {
        let digest = blake3::hash(signature.as_bytes());
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest.as_bytes()[..4]);
        Self(out)
    }

    /// Reads the selector from the head of `payload`, if it is long enough.
    #[must_use]
    pub fn of_payload(payload: &[u8]) -> Option<Self> {
        let head: [u8; 4] = payload.get(..Self::WIDTH)?.try_into().ok()?;
        Some(Self(head))
    }
}

impl core::fmt::Display for Selector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Derives the true location of a logical key (prefix `b"loc:"`).
pub fn true_location(key: &[u8]) -> StorageLocation {
    let mut hasher = Hasher::new();
    hasher.update(b"loc:");
    hasher.update(key);
    StorageLocation(hasher.finalize().into())
}

/// Derives the location of `key` inside the namespace named by `seed`
/// (prefix `b"seeded:"`, length-prefixed key).
///
/// The key length prefix keeps `(key, seed)` pairs unambiguous when keys of
/// different lengths share a byte prefix.
pub fn location_with_seed(key: &[u8], seed: &Hash) -> StorageLocation {
    let mut hasher = Hasher::new();
    hasher.update(b"seeded:");
    hasher.update(&(key.len() as u64).to_le_bytes());
    hasher.update(key);
    hasher.update(seed);
    StorageLocation(hasher.finalize().into())
}

/// Resolves a logical location inside an instance namespace to its true
/// address in the shared backing map.
pub fn namespaced_location(instance: &InstanceId, location: &StorageLocation) -> StorageLocation {
    location_with_seed(location.as_bytes(), instance.as_bytes())
}

/// Produces a stable, domain-separated principal identifier (prefix
/// `b"principal:"`) from a label.
pub fn make_principal_id(label: &str) -> PrincipalId {
    let mut hasher = Hasher::new();
    hasher.update(b"principal:");
    hasher.update(label.as_bytes());
    PrincipalId(hasher.finalize().into())
}

/// Derives a fresh instance id from its creator, a per-engine nonce, and the
/// initializer (prefix `b"instance:"`).
pub fn make_instance_id(
    creator: &PrincipalId,
    nonce: u64,
    initializer: &PrincipalId,
) -> InstanceId {
    let mut hasher = Hasher::new();
    hasher.update(b"instance:");
    hasher.update(&creator.0);
    hasher.update(&nonce.to_le_bytes());
    hasher.update(&initializer.0);
    InstanceId(hasher.finalize().into())
}

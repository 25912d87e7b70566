// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-width value cells and typed value encoding.
//!
//! A [`Slot`] is 32 raw bytes with no retained type information. Typed
//! writes go through [`SlotValue::encode`], which applies a per-kind
//! [`ValuePolicy`] when a value does not fit the slot.
//!
//! The default policy is deliberately asymmetric: over-length text is
//! silently truncated while negative integers are rejected. Both behaviours
//! are configurable per kind; neither is implied by the other.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::PrincipalId;

/// Width of a storage slot in bytes.
pub const SLOT_WIDTH: usize = 32;

/// A 256-bit storage value. The zero slot is indistinguishable from an unset
/// slot.
#[repr(transparent)]
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct Slot(pub [u8; SLOT_WIDTH]);

impl Slot {
    /// The zero slot.
    pub const ZERO: Self = Self([0u8; SLOT_WIDTH]);

    /// Returns `true` when every byte is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; SLOT_WIDTH]
    }

    /// Big-endian unsigned integer in the low 16 bytes.
    #[must_use]
    pub fn from_u128(value: u128) -> Self {
        let mut out = [0u8; SLOT_WIDTH];
        out[16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    /// Reads the slot as an unsigned integer, or `None` when the high 16
    /// bytes are non-zero.
    #[must_use]
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// Stores a principal verbatim.
    #[must_use]
    pub fn from_principal(principal: &PrincipalId) -> Self {
        Self(principal.0)
    }

    /// Reinterprets the slot as a principal.
    #[must_use]
    pub fn to_principal(&self) -> PrincipalId {
        PrincipalId(self.0)
    }

    /// `1` for true, zero for false.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        Self::from_u128(u128::from(value))
    }

    /// Any non-zero slot reads as true.
    #[must_use]
    pub fn to_bool(&self) -> bool {
        !self.is_zero()
    }

    /// Returns the leading bytes up to the first zero, as written by
    /// [`SlotValue::Text`].
    #[must_use]
    pub fn text_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(SLOT_WIDTH);
        &self.0[..end]
    }
}

/// What to do with a value that does not fit in one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep what fits (text: leading bytes; signed: two's complement bits).
    Truncate,
    /// Refuse the write.
    Reject,
}

/// Per-kind overflow policy for typed writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuePolicy {
    /// Policy for text longer than [`SLOT_WIDTH`] bytes.
    pub text: OverflowPolicy,
    /// Policy for negative integers.
    pub signed: OverflowPolicy,
}

impl Default for ValuePolicy {
    fn default() -> Self {
        Self {
            text: OverflowPolicy::Truncate,
            signed: OverflowPolicy::Reject,
        }
    }
}

/// Errors produced when encoding a typed value into a slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Numeric value outside the unsigned range.
    #[error("invalid value: {0} is outside the unsigned range")]
    InvalidValue(i128),
    /// Text longer than the slot width under [`OverflowPolicy::Reject`].
    #[error("string of {len} bytes exceeds slot width")]
    StringTooLong {
        /// Byte length of the rejected string.
        len: usize,
    },
}

/// A typed value to be written into one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotValue {
    /// Raw bytes, stored as-is.
    Word([u8; SLOT_WIDTH]),
    /// Unsigned integer.
    Unsigned(u128),
    /// Signed integer; negative values are subject to [`ValuePolicy::signed`].
    Signed(i128),
    /// Short UTF-8 string, left-aligned and zero-padded.
    Text(String),
    /// Boolean flag.
    Bool(bool),
    /// Address-like identity.
    Principal(PrincipalId),
}

impl SlotValue {
    /// Encodes the value under `policy`.
    ///
    /// # Errors
    /// [`SlotError::InvalidValue`] for a negative integer under a rejecting
    /// policy; [`SlotError::StringTooLong`] for over-length text under a
    /// rejecting policy.
    pub fn encode(&self, policy: &ValuePolicy) -> Result<Slot, SlotError> {
        match self {
            Self::Word(bytes) => Ok(Slot(*bytes)),
            Self::Unsigned(v) => Ok(Slot::from_u128(*v)),
            Self::Signed(v) => {
                if let Ok(unsigned) = u128::try_from(*v) {
                    return Ok(Slot::from_u128(unsigned));
                }
                match policy.signed {
                    OverflowPolicy::Reject => Err(SlotError::InvalidValue(*v)),
                    OverflowPolicy::Truncate => {
                        // Sign-extend into the full 256-bit word.
                        let mut out = [0xffu8; SLOT_WIDTH];
                        out[16..].copy_from_slice(&v.to_be_bytes());
                        Ok(Slot(out))
                    }
                }
            }
            Self::Text(s) => {
                let bytes = s.as_bytes();
                if bytes.len() > SLOT_WIDTH && policy.text == OverflowPolicy::Reject {
                    return Err(SlotError::StringTooLong { len: bytes.len() });
                }
                let mut out = [0u8; SLOT_WIDTH];
                let n = bytes.len().min(SLOT_WIDTH);
                out[..n].copy_from_slice(&bytes[..n]);
                Ok(Slot(out))
            }
            Self::Bool(b) => Ok(Slot::from_bool(*b)),
            Self::Principal(p) => Ok(Slot::from_principal(p)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_truncates_by_default() {
        let text = "a".repeat(40);
        let slot = SlotValue::Text(text).encode(&ValuePolicy::default());
        assert_eq!(slot.map(|s| s.text_bytes().len()), Ok(SLOT_WIDTH));
    }

    #[test]
    fn long_text_rejected_when_configured() {
        let policy = ValuePolicy {
            text: OverflowPolicy::Reject,
            ..ValuePolicy::default()
        };
        let res = SlotValue::Text("b".repeat(33)).encode(&policy);
        assert_eq!(res, Err(SlotError::StringTooLong { len: 33 }));
    }

    #[test]
    fn negative_numbers_rejected_by_default() {
        let res = SlotValue::Signed(-1).encode(&ValuePolicy::default());
        assert_eq!(res, Err(SlotError::InvalidValue(-1)));
    }

    #[test]
    fn negative_numbers_sign_extend_when_truncating() {
        let policy = ValuePolicy {
            signed: OverflowPolicy::Truncate,
            ..ValuePolicy::default()
        };
        let res = SlotValue::Signed(-1).encode(&policy);
        assert_eq!(res, Ok(Slot([0xff; SLOT_WIDTH])));
    }

    #[test]
    fn non_negative_signed_matches_unsigned() {
        let policy = ValuePolicy::default();
        assert_eq!(
            SlotValue::Signed(42).encode(&policy),
            SlotValue::Unsigned(42).encode(&policy)
        );
    }

    #[test]
    fn u128_accessor_rejects_high_bytes() {
        assert_eq!(Slot::from_u128(7).to_u128(), Some(7));
        assert_eq!(Slot([1u8; SLOT_WIDTH]).to_u128(), None);
    }
}

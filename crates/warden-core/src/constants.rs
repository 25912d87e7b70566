// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire tags and digest format versions.

/// Action tag for slot writes (`b"STOR"` as little-endian `u32`).
pub const TAG_STORES: u32 = u32::from_le_bytes(*b"STOR");
/// Action tag for value payouts (`b"PAYS"`).
pub const TAG_PAYS: u32 = u32::from_le_bytes(*b"PAYS");
/// Action tag for application events (`b"EMIT"`).
pub const TAG_EMITS: u32 = u32::from_le_bytes(*b"EMIT");
/// Action tag for an application-level exception (`b"THRW"`).
pub const TAG_THROWS: u32 = u32::from_le_bytes(*b"THRW");

/// Byte length of one action header (`tag:u32 || count:u32`).
pub const ACTION_HEADER_LEN: usize = 8;

/// Maximum number of topics on one application event.
pub const MAX_EVENT_TOPICS: usize = 4;

/// Version tag committed into receipt digests.
pub const RECEIPT_FORMAT_VERSION: u16 = 1;

/// Version tag committed into state roots and snapshots.
pub const STATE_FORMAT_VERSION: u16 = 1;


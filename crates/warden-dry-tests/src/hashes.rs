// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hash ID generation helpers for tests.
//!
//! These centralize the deterministic ids tests use for principals and
//! logical storage keys.

use warden_core::{make_principal_id, true_location, Hash, PrincipalId, StorageLocation};

/// Principal id for a label, using the production derivation.
///
/// # Example
///
/// ```
/// use warden_dry_tests::make_principal;
///
/// assert_eq!(make_principal("alice"), make_principal("alice"));
/// assert_ne!(make_principal("alice"), make_principal("bob"));
/// ```
pub fn make_principal(label: &str) -> PrincipalId {
    make_principal_id(label)
}

/// Logical storage location for a label (`true_location(label)`).
pub fn make_location(label: &str) -> StorageLocation {
    true_location(label.as_bytes())
}

/// Generate a hash from a numeric seed (useful for loops and topics).
pub fn make_hash_from_seed(seed: u64) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"seed:");
    hasher.update(&seed.to_le_bytes());
    hasher.finalize().into()
}

/// Pre-defined principals for common roles.
pub mod presets {
    use super::{make_principal, PrincipalId};

    /// Engine admin (receives withdrawn escrow).
    pub fn admin() -> PrincipalId {
        make_principal("admin")
    }

    /// Instance creator and caller.
    pub fn caller() -> PrincipalId {
        make_principal("caller")
    }

    /// Instance updater.
    pub fn updater() -> PrincipalId {
        make_principal("updater")
    }

    /// Default initializer address.
    pub fn initializer() -> PrincipalId {
        make_principal("initializer")
    }

    /// Default application address.
    pub fn app() -> PrincipalId {
        make_principal("app")
    }

    /// A principal holding no role anywhere.
    pub fn stranger() -> PrincipalId {
        make_principal("stranger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_distinct() {
        let all = [
            presets::admin(),
            presets::caller(),
            presets::updater(),
            presets::initializer(),
            presets::app(),
            presets::stranger(),
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn seeded_hashes_differ() {
        assert_ne!(make_hash_from_seed(1), make_hash_from_seed(2));
    }
}

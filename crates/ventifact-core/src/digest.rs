//! C1: Blueprint Digest — 64-bit content-addressed IDs for tests and
//! test-sets. Pure function, no I/O.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::types::BlueprintId;

/// `H` — SHAKE256 XOF truncated to 8 bytes, interpreted as a signed 64-bit
/// big-endian integer. Every caller that computes or compares a digest must
/// agree on this convention for cross-lookup correctness.
fn shake256_i64(bytes: &[u8]) -> BlueprintId {
    let mut hasher = Shake256::default();
    hasher.update(bytes);
    let mut reader = hasher.finalize_xof();
    let mut out = [0u8; 8];
    reader.read(&mut out);
    i64::from_be_bytes(out)
}

/// `TestBlueprint.id = H(UTF-8 bytes of title)`.
#[must_use]
pub fn test_blueprint_id(title: &str) -> BlueprintId {
    shake256_i64(title.as_bytes())
}

/// `TestRunBlueprint.id = H(concat(member ids sorted ascending by raw
/// bytes))`. `members` is consumed in caller-supplied order; sorting (by
/// unsigned lexicographic byte order, not by the signed integer
/// value) happens here so the digest is independent of input order.
#[must_use]
pub fn test_run_blueprint_id(members: &[BlueprintId]) -> BlueprintId {
    let sorted = sort_members(members);
    let mut buf = Vec::with_capacity(sorted.len() * 8);
    for id in &sorted {
        buf.extend_from_slice(&id.to_be_bytes());
    }
    shake256_i64(&buf)
}

/// Canonical member ordering: ascending by raw digest bytes, unsigned
/// lexicographic, the sort key used for set-identity digests.
/// Interpreting the signed i64 column as big-endian bytes and comparing
/// those bytes unsigned is equivalent to comparing the values after
/// flipping the sign bit, which is exactly what `cmp` on the bit pattern
/// does if we sort by `(id as u64)`.
#[must_use]
pub fn sort_members(members: &[BlueprintId]) -> Vec<BlueprintId> {
    let mut sorted: Vec<BlueprintId> = members.to_vec();
    sorted.sort_by_key(|&id| id as u64);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_digest_is_deterministic() {
        let a = test_blueprint_id("boot sequence completes");
        let b = test_blueprint_id("boot sequence completes");
        assert_eq!(a, b);
    }

    #[test]
    fn title_digest_varies_by_title() {
        let a = test_blueprint_id("boot");
        let b = test_blueprint_id("ipc");
        assert_ne!(a, b);
    }

    #[test]
    fn run_blueprint_id_is_order_independent() {
        let a = test_blueprint_id("a");
        let b = test_blueprint_id("b");
        let c = test_blueprint_id("c");

        let forward = test_run_blueprint_id(&[a, b, c]);
        let shuffled = test_run_blueprint_id(&[c, a, b]);
        let reversed = test_run_blueprint_id(&[c, b, a]);

        assert_eq!(forward, shuffled);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn run_blueprint_id_changes_with_membership() {
        let a = test_blueprint_id("a");
        let b = test_blueprint_id("b");
        let c = test_blueprint_id("c");

        assert_ne!(test_run_blueprint_id(&[a, b]), test_run_blueprint_id(&[a, b, c]));
    }

    #[test]
    fn duplicate_titles_incorporate_multiplicity() {
        // Duplicate member ids are permitted and carried through as-is; the
        // digest incorporates the multiplicity (source behavior).
        let a = test_blueprint_id("a");
        assert_ne!(test_run_blueprint_id(&[a]), test_run_blueprint_id(&[a, a]));
    }

    #[test]
    fn sort_members_is_unsigned_lexicographic() {
        // -1 is 0xFFFF...F (largest as u64); 0 is smallest as u64.
        let sorted = sort_members(&[-1i64, 0i64]);
        assert_eq!(sorted, vec![0, -1]);
    }
}

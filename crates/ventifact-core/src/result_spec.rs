//! C2: Result Spec Codec — compact variant-tagged encoding of a run's
//! pass/fail vector, exploiting the near-universal pass rate.

use std::collections::HashSet;

use crate::error::{Result, VentifactError};
use crate::types::BlueprintId;

const PASSES_ENUMERATED: u8 = 1;
const FAILURES_ENUMERATED: u8 = 0;

/// Encode an ordered list of `(blueprint_id, passed)` pairs. Returns `None`
/// (persisted as SQL `NULL`) iff every result passed.
///
/// Output layout when `Some`: byte 0 is the variant tag, followed by the
/// 8-byte big-endian ids of the enumerated (minority-outcome) members in
/// input order.
#[must_use]
pub fn encode(results: &[(BlueprintId, bool)]) -> Option<Vec<u8>> {
    let failed = results.iter().filter(|(_, passed)| !passed).count();
    if failed == 0 {
        return None;
    }

    let passed = results.len() - failed;
    // Enumerate passes iff p < n/2, else enumerate failures.
    let enumerate_passes = passed * 2 < results.len();

    let tag = if enumerate_passes {
        PASSES_ENUMERATED
    } else {
        FAILURES_ENUMERATED
    };
    let target_outcome = enumerate_passes;

    let mut out = Vec::with_capacity(1 + 8 * results.len().min(passed.max(failed)));
    out.push(tag);
    for (id, result_passed) in results {
        if *result_passed == target_outcome {
            out.extend_from_slice(&id.to_be_bytes());
        }
    }
    Some(out)
}

/// Decode a `result_spec` payload against the run's member list, yielding a
/// `passed` boolean per member in `members` order. `payload = None` means
/// every member passed.
pub fn decode(
    payload: Option<&[u8]>,
    members: &[BlueprintId],
    run_label: &str,
) -> Result<Vec<bool>> {
    let Some(payload) = payload else {
        return Ok(vec![true; members.len()]);
    };

    if payload.is_empty() || (payload.len() - 1) % 8 != 0 {
        return Err(VentifactError::CorruptPayload(
            run_label.to_string(),
            payload.len(),
        ));
    }

    let tag = payload[0];
    let enumerate_passes = match tag {
        PASSES_ENUMERATED => true,
        FAILURES_ENUMERATED => false,
        _ => {
            return Err(VentifactError::CorruptPayload(
                run_label.to_string(),
                payload.len(),
            ))
        }
    };

    let mut enumerated: HashSet<BlueprintId> = HashSet::new();
    for chunk in payload[1..].chunks_exact(8) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        enumerated.insert(BlueprintId::from_be_bytes(buf));
    }

    Ok(members
        .iter()
        .map(|m| {
            let in_set = enumerated.contains(m);
            if enumerate_passes {
                in_set
            } else {
                !in_set
            }
        })
        .collect())
}

//! Deterministic Merkle root over a sequence of `sha256:`-prefixed leaf
//! hashes, as used by the daily integrity checkpoint.

use crate::canonical::sha256_hex;

/// Published sentinel root for a day with no events. Fixed across every
/// implementation so an empty day is auditable without ambiguity.
pub const EMPTY_MERKLE_ROOT: &str =
    "sha256:0000000000000000000000000000000000000000000000000000000000000000";

fn strip_prefix(leaf: &str) -> &str {
    leaf.strip_prefix("sha256:").unwrap_or(leaf)
}

/// Hashes the concatenation of two `sha256:`-prefixed leaves into their
/// parent node, preserving the `sha256:` prefix on the result.
fn pair_hash(left: &str, right: &str) -> String {
    let left_bytes = hex::decode(strip_prefix(left)).expect("leaf is valid hex");
    let right_bytes = hex::decode(strip_prefix(right)).expect("leaf is valid hex");
    let mut combined = Vec::with_capacity(left_bytes.len() + right_bytes.len());
    combined.extend_from_slice(&left_bytes);
    combined.extend_from_slice(&right_bytes);
    format!("sha256:{}", sha256_hex(&combined))
}

/// Builds a Merkle root over `leaves`. Odd levels duplicate their last node
/// before pairing. Returns [`EMPTY_MERKLE_ROOT`] when `leaves` is empty.
/// Deterministic: the same leaf sequence always yields the same root.
pub fn build_merkle_tree(leaves: &[String]) -> String {
    if leaves.is_empty() {
        return EMPTY_MERKLE_ROOT.to_string();
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level.last().unwrap().clone();
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| pair_hash(&pair[0], &pair[1]))
            .collect();
    }
    level.into_iter().next().unwrap()
}

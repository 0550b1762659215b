//! Multi-writer index (spec §4.6): many authors publish distinct values
//! under one logical key, each tagged by a stable per-identity
//! `value_id`; readers fetch all of them and merge.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use dna_envelope::signature::SignPublicKey;

/// Any payload whose large-vs-small threshold decides whether a
/// multi-writer publish goes inline (`put_signed`) or through the
/// chunked transport's `publish_as_mine` (Open Question #2, resolved in
/// `SPEC_FULL.md` §5: a single size-based rule).
pub const MULTIWRITER_INLINE_MAX: usize = 4096;

/// Derive a stable, non-zero `value_id` for `pk` by hashing the signing
/// public key bytes. Deterministic across sessions — no extra storage
/// needed to keep a writer's value stable at a shared key.
pub fn value_id_for_owner(pk: &SignPublicKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    pk.to_bytes().hash(&mut hasher);
    let id = hasher.finish();
    if id == 0 {
        1
    } else {
        id
    }
}

/// Something carrying an application-level dedup key and timestamp, so
/// [`merge`] can dedupe across writers by inner id and break ties by
/// inner timestamp.
pub trait InnerKeyed {
    fn inner_id(&self) -> &str;
    fn inner_timestamp_ms(&self) -> i64;
    /// `true` for a tombstone that should be filtered from merged output.
    fn is_tombstone(&self) -> bool {
        false
    }
}

/// Reader merge rule (spec §4.6, §4.7): iterate all writers' decoded
/// values, dedupe by `inner_id`, keep the one with the highest
/// `inner_timestamp_ms`, drop tombstones, sort descending by timestamp.
///
/// Idempotent: feeding the same input twice yields the same output
/// (spec §8 invariant 8), since this is a pure function of `items`.
pub fn merge<T: InnerKeyed + Clone>(items: Vec<T>) -> Vec<T> {
    use std::collections::HashMap;

    let mut best: HashMap<String, T> = HashMap::new();
    for item in items {
        match best.get(item.inner_id()) {
            Some(existing) if existing.inner_timestamp_ms() >= item.inner_timestamp_ms() => {}
            _ => {
                best.insert(item.inner_id().to_string(), item);
            }
        }
    }

    let mut merged: Vec<T> = best.into_values().filter(|item| !item.is_tombstone()).collect();
    merged.sort_by(|a, b| b.inner_timestamp_ms().cmp(&a.inner_timestamp_ms()));
    merged
}

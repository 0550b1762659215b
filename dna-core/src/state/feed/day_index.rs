//! Feed day-index (spec.md §4.7): a multi-writer, day-bucketed index of
//! posts, partitioned both by category and by an implicit "all" bucket
//! (`category = "all"`) so a reader can page either one category's feed
//! or the whole channel's.

use chrono::{TimeZone, Utc};
use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::kem::{KemPublicKey, KemSecretKey};
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::dht::Dht;
use crate::error::CoreError;
use crate::multiwriter::{self, InnerKeyed};
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::Application;
const VERSION: u8 = 1;
const KIND_TAG: &str = "feed_day_index";
/// TTL for a day-index bucket (spec.md §4.7): 30 days.
pub const TTL_SECONDS: u32 = 30 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayIndexEntry {
    pub post_id: String,
    pub posted_at_ms: i64,
}

impl InnerKeyed for DayIndexEntry {
    fn inner_id(&self) -> &str {
        &self.post_id
    }
    fn inner_timestamp_ms(&self) -> i64 {
        self.posted_at_ms
    }
}

/// Format a unix timestamp into spec.md's `yyyymmdd` bucket label.
fn yyyymmdd(timestamp_s: u64) -> String {
    Utc.timestamp_opt(timestamp_s as i64, 0)
        .single()
        .expect("timestamp in range")
        .format("%Y%m%d")
        .to_string()
}

fn key_base(category: &str, timestamp_s: u64) -> String {
    format!("dna:feed:idx:{category}:{}", yyyymmdd(timestamp_s))
}

pub async fn index_post(
    ctx: &CoreContext,
    category: &str,
    recipient_kem_pk: &KemPublicKey,
    entry: &DayIndexEntry,
    timestamp_s: u64,
) -> Result<(), CoreError> {
    common::publish_multiwriter(
        ctx,
        KIND,
        VERSION,
        &key_base(category, timestamp_s),
        recipient_kem_pk,
        entry,
        TTL_SECONDS,
        timestamp_s,
        KIND_TAG,
    )
    .await
}

pub async fn fetch_day(
    dht: &dyn Dht,
    category: &str,
    timestamp_s: u64,
    recipient_kem_sk: &KemSecretKey,
    resolve_author: impl Fn(u64) -> Option<SignPublicKey>,
    now_s: u64,
) -> Result<Vec<DayIndexEntry>, CoreError> {
    let raw = common::fetch_multiwriter_raw(
        dht,
        KIND,
        VERSION,
        VERSION,
        &key_base(category, timestamp_s),
        recipient_kem_sk,
        resolve_author,
        now_s,
    )
    .await?;

    let mut entries = Vec::with_capacity(raw.len());
    for bytes in raw {
        entries.push(serde_json::from_slice::<DayIndexEntry>(&bytes)?);
    }
    Ok(multiwriter::merge(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::InMemoryDht;
    use dna_identity::Identity;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn yyyymmdd_formats_a_known_timestamp() {
        assert_eq!(yyyymmdd(1_730_000_000), "20241026");
    }

    #[tokio::test]
    async fn two_posters_index_into_the_same_all_bucket() {
        let dht = Arc::new(InMemoryDht::new(1));
        let (recipient_pk, recipient_sk) = dna_envelope::kem::keygen();

        let alice = Arc::new(Identity::generate());
        let bob = Arc::new(Identity::generate());
        let ctx_a = CoreContext::new(dht.clone(), alice.clone());
        let ctx_b = CoreContext::new(dht.clone(), bob.clone());

        let entry_a = DayIndexEntry { post_id: "p1".to_string(), posted_at_ms: 1_000 };
        let entry_b = DayIndexEntry { post_id: "p2".to_string(), posted_at_ms: 2_000 };

        index_post(&ctx_a, "all", &recipient_pk, &entry_a, 1_730_000_000).await.expect("index a");
        index_post(&ctx_b, "all", &recipient_pk, &entry_b, 1_730_000_000).await.expect("index b");

        let mut authors: HashMap<u64, SignPublicKey> = HashMap::new();
        authors.insert(multiwriter::value_id_for_owner(&alice.sign_pk), alice.sign_pk.clone());
        authors.insert(multiwriter::value_id_for_owner(&bob.sign_pk), bob.sign_pk.clone());

        let fetched = fetch_day(dht.as_ref(), "all", 1_730_000_000, &recipient_sk, |id| authors.get(&id).cloned(), 0)
            .await
            .expect("fetch_day");
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].post_id, "p2");
        assert_eq!(fetched[1].post_id, "p1");
    }
}

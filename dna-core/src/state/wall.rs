//! Wall (spec.md §4.7): a per-owner "wall" made of two kinds — a
//! multi-writer contributor index naming everyone who has posted to a
//! given wall, and one single-writer chunked post bucket per contributor.

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
const CONTRIBUTOR_KIND_TAG: &str = "wall_contributor";
/// TTL for both wall kinds (spec.md §4.7): 30 days.
pub const TTL_SECONDS: u32 = 30 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub fingerprint: String,
    pub joined_at_ms: i64,
}

impl InnerKeyed for Contributor {
    fn inner_id(&self) -> &str {
        &self.fingerprint
    }
    fn inner_timestamp_ms(&self) -> i64 {
        self.joined_at_ms
    }
}

fn contributors_key_base(wall: &str) -> String {
    format!("{wall}:wall:contributors")
}

/// Add `ctx`'s own fingerprint to `wall`'s contributor index, self
/// re-adding idempotently (spec.md §4.7: "no version" — the index tracks
/// membership only, with no schema to migrate).
pub async fn join(ctx: &CoreContext, wall: &str, recipient_kem_pk: &KemPublicKey, timestamp_s: u64) -> Result<(), CoreError> {
    let contributor = Contributor {
        fingerprint: ctx.fingerprint(),
        joined_at_ms: (timestamp_s as i64) * 1000,
    };
    common::publish_multiwriter(
        ctx,
        KIND,
        VERSION,
        &contributors_key_base(wall),
        recipient_kem_pk,
        &contributor,
        TTL_SECONDS,
        timestamp_s,
        CONTRIBUTOR_KIND_TAG,
    )
    .await
}

pub async fn contributors(
    dht: &dyn Dht,
    wall: &str,
    recipient_kem_sk: &KemSecretKey,
    resolve_author: impl Fn(u64) -> Option<SignPublicKey>,
    now_s: u64,
) -> Result<Vec<Contributor>, CoreError> {
    let raw = common::fetch_multiwriter_raw(dht, KIND, VERSION, VERSION, &contributors_key_base(wall), recipient_kem_sk, resolve_author, now_s).await?;
    let mut contributors = Vec::with_capacity(raw.len());
    for bytes in raw {
        contributors.push(serde_json::from_slice::<Contributor>(&bytes)?);
    }
    Ok(multiwriter::merge(contributors))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallPost {
    pub post_id: String,
    pub body: String,
    pub posted_at_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PosterBucket {
    pub posts: Vec<WallPost>,
}

fn poster_bucket_key_base(wall: &str, poster_fingerprint: &str) -> String {
    format!("{wall}:wall:{poster_fingerprint}")
}

pub async fn publish_poster_bucket(ctx: &CoreContext, wall: &str, bucket: &PosterBucket, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, VERSION, &poster_bucket_key_base(wall, &ctx.fingerprint()), bucket, TTL_SECONDS, timestamp_s).await
}

pub async fn fetch_poster_bucket(
    ctx: &CoreContext,
    wall: &str,
    poster_fingerprint: &str,
    author_pk: &SignPublicKey,
    now_s: u64,
) -> Result<PosterBucket, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, VERSION, VERSION, &poster_bucket_key_base(wall, poster_fingerprint), author_pk, now_s).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::InMemoryDht;
    use dna_identity::Identity;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn two_contributors_join_the_same_wall() {
        let dht = Arc::new(InMemoryDht::new(1));
        let (recipient_pk, recipient_sk) = dna_envelope::kem::keygen();
        let alice = Arc::new(Identity::generate());
        let bob = Arc::new(Identity::generate());
        let ctx_a = CoreContext::new(dht.clone(), alice.clone());
        let ctx_b = CoreContext::new(dht.clone(), bob.clone());

        join(&ctx_a, "wall1", &recipient_pk, 1_000).await.expect("join a");
        join(&ctx_b, "wall1", &recipient_pk, 2_000).await.expect("join b");

        let mut authors: HashMap<u64, SignPublicKey> = HashMap::new();
        authors.insert(multiwriter::value_id_for_owner(&alice.sign_pk), alice.sign_pk.clone());
        authors.insert(multiwriter::value_id_for_owner(&bob.sign_pk), bob.sign_pk.clone());

        let found = contributors(dht.as_ref(), "wall1", &recipient_sk, |id| authors.get(&id).cloned(), 0)
            .await
            .expect("contributors");
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn poster_bucket_publish_and_fetch_round_trip() {
        let identity = Arc::new(Identity::generate());
        let fingerprint = identity.fingerprint();
        let sign_pk = identity.sign_pk.clone();
        let dht = Arc::new(InMemoryDht::new(1));
        let ctx = CoreContext::new(dht, identity);

        let bucket = PosterBucket {
            posts: vec![WallPost {
                post_id: "w1".to_string(),
                body: "hi wall".to_string(),
                posted_at_ms: 1_700_000_000_000,
            }],
        };
        publish_poster_bucket(&ctx, "wall1", &bucket, 1_000).await.expect("publish");
        let fetched = fetch_poster_bucket(&ctx, "wall1", &fingerprint, &sign_pk, 0).await.expect("fetch");
        assert_eq!(fetched, bucket);
    }
}

//! Shared plumbing for the state-kind adapters in this module: the
//! generic single-writer self-encrypted-chunked pipeline, the generic
//! multi-writer inline pipeline, and the day-bucket helper every
//! time-partitioned kind uses (spec.md §3 "Day bucket", §4.7).

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::kem::{KemPublicKey, KemSecretKey};
use dna_envelope::signature::SignPublicKey;
use dna_envelope::selfenc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::keyname::KeyName;
use crate::multiwriter::{self, MULTIWRITER_INLINE_MAX};
use crate::{chunk, dht::Dht};

/// UTC unix-day bucket for `timestamp_s` (spec.md §3: `base:<unix_day>`).
pub fn unix_day(timestamp_s: u64) -> i64 {
    (timestamp_s / 86_400) as i64
}

/// `JSON-encode -> sign -> self-encrypt -> envelope -> chunked publish`
/// (spec.md §2's write-path data flow) for a single-writer kind that
/// self-encrypts to the publishing identity's own key.
pub async fn publish_self_encrypted<T: Serialize + Sync>(
    ctx: &CoreContext,
    kind: EnvelopeKind,
    version: u8,
    key_base: &str,
    payload: &T,
    ttl_s: u32,
    timestamp_s: u64,
) -> Result<(), CoreError> {
    let json = serde_json::to_vec(payload)?;
    let expiry_s = timestamp_s + ttl_s as u64;
    let identity = ctx.self_encrypt_identity();
    let envelope_bytes = selfenc::seal(kind, version, &identity, &json, timestamp_s, expiry_s)?;
    chunk::publish(ctx.dht(), ctx.sign_sk(), key_base, &envelope_bytes, ttl_s, timestamp_s).await?;
    Ok(())
}

/// Inverse of [`publish_self_encrypted`]: fetch, reassemble, decrypt, and
/// parse back into `T`. `author_pk` is the publishing identity's signing
/// key (== the reader's own, for truly personal state).
pub async fn fetch_self_encrypted<T: DeserializeOwned>(
    ctx: &CoreContext,
    kind: EnvelopeKind,
    min_version: u8,
    max_version: u8,
    key_base: &str,
    author_pk: &SignPublicKey,
    now_s: u64,
) -> Result<T, CoreError> {
    let bytes = chunk::fetch(ctx.dht(), key_base, author_pk).await?;
    let identity = ctx.self_encrypt_identity();
    let plaintext = selfenc::open(kind, min_version, max_version, &identity, &bytes, now_s)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Publish one writer's entry at a multi-writer key (spec.md §4.6), self
/// encrypted to `recipient_kem_pk` (e.g. a group's shared KEM key) and
/// signed under the caller's own identity. Payloads under
/// [`MULTIWRITER_INLINE_MAX`] go straight to `Dht::put_signed`; at or
/// above that size they route through the chunked transport's
/// `publish_as_mine` instead, tagged with the same per-writer `value_id`
/// so a reader's `fetch_all_reassembled` can tell which chunks are whose
/// (spec.md §9 Open Question #2).
#[allow(clippy::too_many_arguments)]
pub async fn publish_multiwriter<T: Serialize + Sync>(
    ctx: &CoreContext,
    kind: EnvelopeKind,
    version: u8,
    key_base: &str,
    recipient_kem_pk: &KemPublicKey,
    payload: &T,
    ttl_s: u32,
    timestamp_s: u64,
    kind_tag: &str,
) -> Result<(), CoreError> {
    let json = serde_json::to_vec(payload)?;
    let expiry_s = timestamp_s + ttl_s as u64;
    let envelope_bytes = selfenc::seal_to(kind, version, recipient_kem_pk, ctx.sign_sk(), &json, timestamp_s, expiry_s)?;
    let value_id = multiwriter::value_id_for_owner(ctx.sign_pk());

    if json.len() < MULTIWRITER_INLINE_MAX {
        let key = KeyName::derive(key_base);
        ctx.dht().put_signed(&key, envelope_bytes, value_id, ttl_s, kind_tag).await?;
    } else {
        chunk::publish_as_mine(ctx.dht(), ctx.sign_sk(), value_id, key_base, &envelope_bytes, ttl_s, timestamp_s, kind_tag).await?;
    }
    Ok(())
}

/// Fetch every writer's entry at a multi-writer key, decode and
/// decrypt each with `recipient_kem_sk`, verifying each against its own
/// claimed author key via `resolve_author`. Entries that fail to decode,
/// decrypt, or verify are logged and skipped rather than failing the
/// whole read (spec.md §7: "integrity errors on a value in a multi-writer
/// set: logged, value skipped, aggregate continues").
pub async fn fetch_multiwriter_raw(
    dht: &dyn Dht,
    kind: EnvelopeKind,
    min_version: u8,
    max_version: u8,
    key_base: &str,
    recipient_kem_sk: &KemSecretKey,
    resolve_author: impl Fn(u64) -> Option<SignPublicKey>,
    now_s: u64,
) -> Result<Vec<Vec<u8>>, CoreError> {
    let all = chunk::fetch_all_reassembled(dht, key_base, &resolve_author).await?;
    let mut out = Vec::with_capacity(all.len());
    for (writer_id, bytes) in all {
        let Some(author_pk) = resolve_author(writer_id) else {
            tracing::warn!(writer_id, key_base, "skipping multi-writer value with unknown author");
            continue;
        };
        match selfenc::open_from(kind, min_version, max_version, recipient_kem_sk, &author_pk, None, &bytes, now_s) {
            Ok(plaintext) => out.push(plaintext),
            Err(err) => {
                tracing::warn!(writer_id, key_base, %err, "skipping undecodable multi-writer value");
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::InMemoryDht;
    use dna_identity::Identity;
    use serde::Deserialize;
    use std::sync::Arc;

    #[test]
    fn unix_day_buckets_by_86400_seconds() {
        assert_eq!(unix_day(0), 0);
        assert_eq!(unix_day(86_399), 0);
        assert_eq!(unix_day(86_400), 1);
        assert_eq!(unix_day(1_730_000_000), 1_730_000_000 / 86_400);
    }

    #[derive(serde::Serialize, Deserialize, PartialEq, Debug)]
    struct Payload {
        body: String,
    }

    #[tokio::test]
    async fn publish_multiwriter_routes_large_payload_through_chunked_transport() {
        let identity = Arc::new(Identity::generate());
        let dht: Arc<dyn Dht> = Arc::new(InMemoryDht::new(multiwriter::value_id_for_owner(&identity.sign_pk)));
        let ctx = CoreContext::new(dht.clone(), identity.clone());

        let payload = Payload {
            body: "x".repeat(MULTIWRITER_INLINE_MAX + 1024),
        };
        publish_multiwriter(
            &ctx,
            EnvelopeKind::Application,
            1,
            "test:mw-large",
            ctx.kem_pk(),
            &payload,
            3600,
            1_000,
            "kind",
        )
        .await
        .expect("publish_multiwriter");

        let value_id = multiwriter::value_id_for_owner(ctx.sign_pk());
        let sign_pk = ctx.sign_pk().clone();
        let resolve_author = move |writer_id: u64| -> Option<SignPublicKey> {
            if writer_id == value_id {
                Some(sign_pk.clone())
            } else {
                None
            }
        };
        let raw = fetch_multiwriter_raw(
            ctx.dht(),
            EnvelopeKind::Application,
            1,
            1,
            "test:mw-large",
            ctx.kem_sk(),
            resolve_author,
            1_000,
        )
        .await
        .expect("fetch_multiwriter_raw");

        assert_eq!(raw.len(), 1);
        let decoded: Payload = serde_json::from_slice(&raw[0]).expect("json");
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn publish_multiwriter_keeps_small_payload_inline() {
        let identity = Arc::new(Identity::generate());
        let dht: Arc<dyn Dht> = Arc::new(InMemoryDht::new(multiwriter::value_id_for_owner(&identity.sign_pk)));
        let ctx = CoreContext::new(dht.clone(), identity.clone());

        let payload = Payload { body: "small".to_string() };
        publish_multiwriter(
            &ctx,
            EnvelopeKind::Application,
            1,
            "test:mw-small",
            ctx.kem_pk(),
            &payload,
            3600,
            1_000,
            "kind",
        )
        .await
        .expect("publish_multiwriter");

        let key = KeyName::derive("test:mw-small");
        let stored = ctx.dht().get_all(&key).await.expect("get_all");
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].1.starts_with(b"CHNK"));
    }
}

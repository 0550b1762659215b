//! Message backup (spec.md §4.7): a single-writer chunked, self-encrypted
//! backup of an identity's message history, keyed by its own fingerprint.
//!
//! Unlike every other single-writer kind this one accepts two schema
//! versions, 3 and 4, reflecting a prior schema migration; anything
//! outside that range is rejected outright rather than partially salvaged
//! (Open Question #3, resolved in `SPEC_FULL.md` §5).

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::MessageBackup;
/// Oldest accepted schema version (spec.md §4.7).
pub const MIN_VERSION: u8 = 3;
/// Newest accepted schema version (spec.md §4.7).
pub const MAX_VERSION: u8 = 4;
/// Version this client writes going forward.
const WRITE_VERSION: u8 = MAX_VERSION;
/// TTL for message backups (spec.md §4.7): 7 days.
pub const TTL_SECONDS: u32 = 7 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackedUpMessage {
    pub message_id: String,
    pub conversation_id: String,
    pub sender_fingerprint: String,
    pub body: String,
    pub sent_at_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBackup {
    pub messages: Vec<BackedUpMessage>,
}

fn key_base(fingerprint: &str) -> String {
    format!("{fingerprint}:message_backup")
}

pub async fn publish(ctx: &CoreContext, backup: &MessageBackup, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, WRITE_VERSION, &key_base(&ctx.fingerprint()), backup, TTL_SECONDS, timestamp_s).await
}

/// Fetch and decode a message backup, accepting schema versions
/// [`MIN_VERSION`, `MAX_VERSION`] and rejecting anything else with
/// [`CoreError::Envelope`] (wrapping `DecodeError::UnsupportedVersion`).
pub async fn fetch(ctx: &CoreContext, fingerprint: &str, author_pk: &SignPublicKey, now_s: u64) -> Result<MessageBackup, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, MIN_VERSION, MAX_VERSION, &key_base(fingerprint), author_pk, now_s).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::InMemoryDht;
    use dna_identity::Identity;
    use std::sync::Arc;

    fn sample() -> MessageBackup {
        MessageBackup {
            messages: vec![BackedUpMessage {
                message_id: "m1".to_string(),
                conversation_id: "c1".to_string(),
                sender_fingerprint: "aa".repeat(64),
                body: "hello".to_string(),
                sent_at_ms: 1_700_000_000_000,
            }],
        }
    }

    #[tokio::test]
    async fn publish_then_fetch_round_trip() {
        let identity = Arc::new(Identity::generate());
        let fingerprint = identity.fingerprint();
        let sign_pk = identity.sign_pk.clone();
        let dht = Arc::new(InMemoryDht::new(1));
        let ctx = CoreContext::new(dht, identity);

        let backup = sample();
        publish(&ctx, &backup, 1_000).await.expect("publish");
        let fetched = fetch(&ctx, &fingerprint, &sign_pk, 0).await.expect("fetch");
        assert_eq!(fetched, backup);
    }

    #[tokio::test]
    async fn fetch_rejects_a_schema_version_outside_three_or_four() {
        let identity = Arc::new(Identity::generate());
        let fingerprint = identity.fingerprint();
        let sign_pk = identity.sign_pk.clone();
        let dht = Arc::new(InMemoryDht::new(1));
        let ctx = CoreContext::new(dht, identity);

        let backup = sample();
        let json = serde_json::to_vec(&backup).unwrap();
        let identity_box = ctx.self_encrypt_identity();
        let envelope_bytes = dna_envelope::selfenc::seal(KIND, 2, &identity_box, &json, 1_000, 1_000 + TTL_SECONDS as u64).unwrap();
        crate::chunk::publish(ctx.dht(), ctx.sign_sk(), &key_base(&fingerprint), &envelope_bytes, TTL_SECONDS, 1_000)
            .await
            .unwrap();

        let err = fetch(&ctx, &fingerprint, &sign_pk, 0).await.unwrap_err();
        assert!(matches!(err, CoreError::Envelope(_)));
    }
}

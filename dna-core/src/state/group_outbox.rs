//! Group day-outbox (spec.md §4.7): a multi-writer, day-bucketed queue of
//! messages sent to a group. Every member encrypts to the group's own
//! shared KEM key (distributed to members out of band — distribution
//! itself is explicitly out of scope) while signing under their own
//! identity, via [`dna_envelope::selfenc::seal_to`]/`open_from`.

use std::collections::HashMap;

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
const KIND_TAG: &str = "group_outbox";
/// Retention for a day's outbox bucket (spec.md §4.7, §9 Open Question #1): 7 days.
pub const TTL_SECONDS: u32 = 7 * 24 * 3600;

/// Mint a fresh group id for the `<uuid>` component of the day-outbox key
/// rule (spec.md §4.7).
pub fn new_group_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub message_id: String,
    pub sender_fingerprint: String,
    pub body: String,
    pub timestamp_ms: i64,
}

impl InnerKeyed for OutboxMessage {
    fn inner_id(&self) -> &str {
        &self.message_id
    }
    fn inner_timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

fn key_base(group_id: &str, day: i64) -> String {
    format!("dna:group:{group_id}:out:{day}")
}

pub async fn send(
    ctx: &CoreContext,
    group_id: &str,
    recipient_kem_pk: &KemPublicKey,
    message: &OutboxMessage,
    timestamp_s: u64,
) -> Result<(), CoreError> {
    let day = common::unix_day(timestamp_s);
    common::publish_multiwriter(
        ctx,
        KIND,
        VERSION,
        &key_base(group_id, day),
        recipient_kem_pk,
        message,
        TTL_SECONDS,
        timestamp_s,
        KIND_TAG,
    )
    .await
}

/// Fetch a day's outbox, merged and sorted into chronological (oldest
/// first) send order, the way a reader replays a conversation.
pub async fn fetch_day(
    dht: &dyn Dht,
    group_id: &str,
    day: i64,
    recipient_kem_sk: &KemSecretKey,
    resolve_author: impl Fn(u64) -> Option<SignPublicKey>,
    now_s: u64,
) -> Result<Vec<OutboxMessage>, CoreError> {
    let raw = common::fetch_multiwriter_raw(
        dht,
        KIND,
        VERSION,
        VERSION,
        &key_base(group_id, day),
        recipient_kem_sk,
        resolve_author,
        now_s,
    )
    .await?;

    let mut messages = Vec::with_capacity(raw.len());
    for bytes in raw {
        messages.push(serde_json::from_slice::<OutboxMessage>(&bytes)?);
    }

    let mut merged = multiwriter::merge(messages);
    merged.reverse();
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::InMemoryDht;
    use dna_identity::Identity;
    use std::sync::Arc;

    #[test]
    fn new_group_id_produces_a_parseable_uuid() {
        let id = new_group_id();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    // Scenario C (spec.md §8): three identities A, B, and C each send one
    // message to the same group day-outbox; a reader holding the group's
    // KEM secret key fetches, dedupes, and reassembles them in send order.
    #[tokio::test]
    async fn scenario_c_three_writers_merge_in_send_order() {
        let dht = Arc::new(InMemoryDht::new(1));
        let group_id = &new_group_id();
        let (group_kem_pk, group_kem_sk) = dna_envelope::kem::keygen();

        let alice = Arc::new(Identity::generate());
        let bob = Arc::new(Identity::generate());
        let carol = Arc::new(Identity::generate());

        let ctx_a = CoreContext::new(dht.clone(), alice.clone());
        let ctx_b = CoreContext::new(dht.clone(), bob.clone());
        let ctx_c = CoreContext::new(dht.clone(), carol.clone());

        let msg_a = OutboxMessage {
            message_id: "a1".to_string(),
            sender_fingerprint: alice.fingerprint(),
            body: "hello from alice".to_string(),
            timestamp_ms: 1_000,
        };
        let msg_b = OutboxMessage {
            message_id: "b1".to_string(),
            sender_fingerprint: bob.fingerprint(),
            body: "hello from bob".to_string(),
            timestamp_ms: 2_000,
        };
        let msg_c = OutboxMessage {
            message_id: "c1".to_string(),
            sender_fingerprint: carol.fingerprint(),
            body: "hello from carol".to_string(),
            timestamp_ms: 3_000,
        };

        send(&ctx_a, group_id, &group_kem_pk, &msg_a, 1_000).await.expect("send a");
        send(&ctx_b, group_id, &group_kem_pk, &msg_b, 1_000).await.expect("send b");
        send(&ctx_c, group_id, &group_kem_pk, &msg_c, 1_000).await.expect("send c");

        let mut authors: HashMap<u64, SignPublicKey> = HashMap::new();
        authors.insert(multiwriter::value_id_for_owner(&alice.sign_pk), alice.sign_pk.clone());
        authors.insert(multiwriter::value_id_for_owner(&bob.sign_pk), bob.sign_pk.clone());
        authors.insert(multiwriter::value_id_for_owner(&carol.sign_pk), carol.sign_pk.clone());

        let day = common::unix_day(1_000);
        let fetched = fetch_day(dht.as_ref(), group_id, day, &group_kem_sk, |id| authors.get(&id).cloned(), 0)
            .await
            .expect("fetch_day");

        let bodies: Vec<&str> = fetched.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hello from alice", "hello from bob", "hello from carol"]);
    }
}

//! Feed channel registry (spec.md §4.7): a single-writer chunked,
//! self-encrypted list of every channel an identity has created.

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::Application;
const VERSION: u8 = 1;
/// TTL for the feed registry (spec.md §4.7): 30 days.
pub const TTL_SECONDS: u32 = 30 * 24 * 3600;
const KEY_BASE: &str = "dna:feed:registry";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub channel_id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub channels: Vec<ChannelRef>,
}

pub async fn publish(ctx: &CoreContext, registry: &Registry, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, VERSION, KEY_BASE, registry, TTL_SECONDS, timestamp_s).await
}

pub async fn fetch(ctx: &CoreContext, author_pk: &SignPublicKey, now_s: u64) -> Result<Registry, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, VERSION, VERSION, KEY_BASE, author_pk, now_s).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::InMemoryDht;
    use dna_identity::Identity;
    use std::sync::Arc;

    #[tokio::test]
    async fn publish_then_fetch_round_trip() {
        let identity = Arc::new(Identity::generate());
        let sign_pk = identity.sign_pk.clone();
        let dht = Arc::new(InMemoryDht::new(1));
        let ctx = CoreContext::new(dht, identity);

        let registry = Registry {
            channels: vec![ChannelRef {
                channel_id: "news".to_string(),
                name: "News".to_string(),
                created_at: 1_700_000_000,
            }],
        };
        publish(&ctx, &registry, 1_000).await.expect("publish");
        let fetched = fetch(&ctx, &sign_pk, 0).await.expect("fetch");
        assert_eq!(fetched, registry);
    }
}

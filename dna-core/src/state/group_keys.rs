//! Group encryption keys, "GEKs" (spec.md §4.7): a single-writer chunked,
//! self-encrypted backup of the symmetric/KEM key material an identity
//! holds for its groups.
//!
//! Distributing a GEK set to *other* members of the same group is an
//! access-control question spec.md's Non-goals explicitly exclude; this
//! module only covers an identity escrowing its own keys for its own
//! later recovery, the same way [`crate::state::identity_backup`] does.

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::GroupKeys;
const VERSION: u8 = 1;
/// TTL for GEK backups (spec.md §4.7): 7 days.
pub const TTL_SECONDS: u32 = 7 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupKeyEntry {
    pub group_id: String,
    /// Hex-encoded symmetric key material for this group.
    pub key_hex: String,
    pub epoch: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupKeys {
    pub keys: Vec<GroupKeyEntry>,
}

fn key_base(owner_id: &str) -> String {
    format!("{owner_id}:geks")
}

pub async fn publish(ctx: &CoreContext, keys: &GroupKeys, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, VERSION, &key_base(&ctx.fingerprint()), keys, TTL_SECONDS, timestamp_s).await
}

pub async fn fetch(ctx: &CoreContext, owner_id: &str, author_pk: &SignPublicKey, now_s: u64) -> Result<GroupKeys, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, VERSION, VERSION, &key_base(owner_id), author_pk, now_s).await
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
        let fingerprint = identity.fingerprint();
        let sign_pk = identity.sign_pk.clone();
        let dht = Arc::new(InMemoryDht::new(1));
        let ctx = CoreContext::new(dht, identity);

        let keys = GroupKeys {
            keys: vec![GroupKeyEntry {
                group_id: "11111111-1111-1111-1111-111111111111".to_string(),
                key_hex: "00".repeat(32),
                epoch: 1,
            }],
        };
        publish(&ctx, &keys, 1_000).await.expect("publish");
        let fetched = fetch(&ctx, &fingerprint, &sign_pk, 0).await.expect("fetch");
        assert_eq!(fetched, keys);
    }
}

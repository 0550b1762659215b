//! Identity backup (spec.md §4.7's first table row): a single-writer
//! chunked publication of an identity's own self-encrypted export, keyed
//! by its own fingerprint. The only kind whose inner payload carries no
//! envelope at all — spec.md §6.2 calls this one out as "a simpler
//! concatenation" (`KEM_ct || iv || tag || ct`), built in
//! `dna_identity::backup::seal_self`/`open_self`. The *chunked transport*
//! still frames each chunk in its own transport-level envelope (spec §4.4)
//! regardless of kind; only this kind's own inner layer skips the outer
//! envelope spec.md §3's table otherwise requires.

use dna_identity::{backup, Identity};

use crate::chunk;
use crate::context::CoreContext;
use crate::error::CoreError;

/// Day-bucket-free TTL for identity backups (spec.md §4.7): 365 days.
pub const TTL_SECONDS: u32 = 365 * 24 * 3600;

fn key_base(fingerprint: &str) -> String {
    format!("{fingerprint}:dht_identity")
}

/// Publish `ctx`'s own identity backup under `kdf("<fp>:dht_identity")`.
pub async fn publish(ctx: &CoreContext, timestamp_s: u64) -> Result<(), CoreError> {
    let sealed = backup::seal_self(&ctx.identity)?;
    chunk::publish(ctx.dht(), ctx.sign_sk(), &key_base(&ctx.fingerprint()), &sealed, TTL_SECONDS, timestamp_s).await?;
    Ok(())
}

/// Fetch and recover the identity backup published for `fingerprint`.
/// `author_pk` must be the same identity's signing key, since the
/// chunked transport signs each chunk under the publishing identity.
pub async fn fetch(ctx: &CoreContext, fingerprint: &str, author_pk: &dna_envelope::signature::SignPublicKey) -> Result<Identity, CoreError> {
    let bytes = chunk::fetch(ctx.dht(), &key_base(fingerprint), author_pk).await?;
    Ok(backup::open_self(ctx.kem_sk(), &bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::InMemoryDht;
    use dna_identity::Identity;
    use std::sync::Arc;

    // Scenario A (spec.md §8): generate an identity, publish its backup
    // to the DHT, fetch it back, and confirm the recovered fingerprint
    // matches.
    #[tokio::test]
    async fn scenario_a_identity_backup_round_trip_via_dht() {
        let identity = Arc::new(Identity::generate());
        let fingerprint = identity.fingerprint();
        let dht = Arc::new(InMemoryDht::new(1));
        let ctx = CoreContext::new(dht, identity.clone());

        publish(&ctx, 1_000).await.expect("publish");
        let recovered = fetch(&ctx, &fingerprint, &identity.sign_pk).await.expect("fetch");
        assert_eq!(recovered.fingerprint(), fingerprint);
    }
}

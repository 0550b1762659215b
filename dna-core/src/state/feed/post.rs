//! Feed post (spec.md §4.7): a single-writer, self-encrypted record for
//! one post. Accepts schema versions 1 and 2 on read (a prior migration
//! added `category`); writes always use the current version.
//!
//! Engagement TTL (spec.md §4.7, §9): adding a comment or vote to a post
//! should refresh the post's own TTL so an actively-discussed post
//! doesn't expire out from under its replies. [`touch`] re-publishes an
//! already-fetched post unchanged except for its envelope timestamps,
//! rather than every reply re-deriving and re-signing new content —
//! callers invoke it best-effort after [`super::comment::add`] or
//! [`super::vote::cast`] succeeds.

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::Application;
/// Oldest accepted schema version (spec.md §4.7).
pub const MIN_VERSION: u8 = 1;
/// Newest accepted schema version (spec.md §4.7); also the version this
/// client writes.
pub const MAX_VERSION: u8 = 2;
/// TTL for a feed post (spec.md §4.7): 30 days.
pub const TTL_SECONDS: u32 = 30 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub channel_id: String,
    pub author_fingerprint: String,
    pub category: String,
    pub body: String,
    pub posted_at_ms: i64,
}

fn key_base(post_id: &str) -> String {
    format!("dna:feed:post:{post_id}")
}

pub async fn publish(ctx: &CoreContext, post: &Post, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, MAX_VERSION, &key_base(&post.post_id), post, TTL_SECONDS, timestamp_s).await
}

pub async fn fetch(ctx: &CoreContext, post_id: &str, author_pk: &SignPublicKey, now_s: u64) -> Result<Post, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, MIN_VERSION, MAX_VERSION, &key_base(post_id), author_pk, now_s).await
}

/// Best-effort TTL refresh: re-publish `post` with a fresh timestamp/expiry,
/// signed by its own author (`ctx` must be that author's context).
pub async fn touch(ctx: &CoreContext, post: &Post, timestamp_s: u64) -> Result<(), CoreError> {
    publish(ctx, post, timestamp_s).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::InMemoryDht;
    use dna_identity::Identity;
    use std::sync::Arc;

    fn sample(ctx: &CoreContext) -> Post {
        Post {
            post_id: "p1".to_string(),
            channel_id: "news".to_string(),
            author_fingerprint: ctx.fingerprint(),
            category: "general".to_string(),
            body: "hello feed".to_string(),
            posted_at_ms: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn publish_then_fetch_round_trip() {
        let identity = Arc::new(Identity::generate());
        let sign_pk = identity.sign_pk.clone();
        let dht = Arc::new(InMemoryDht::new(1));
        let ctx = CoreContext::new(dht, identity);

        let post = sample(&ctx);
        publish(&ctx, &post, 1_000).await.expect("publish");
        let fetched = fetch(&ctx, "p1", &sign_pk, 0).await.expect("fetch");
        assert_eq!(fetched, post);
    }

    #[tokio::test]
    async fn touch_refreshes_ttl_without_changing_content() {
        let identity = Arc::new(Identity::generate());
        let sign_pk = identity.sign_pk.clone();
        let dht = Arc::new(InMemoryDht::new(1));
        let ctx = CoreContext::new(dht, identity);

        let post = sample(&ctx);
        publish(&ctx, &post, 1_000).await.expect("publish");
        touch(&ctx, &post, 2_000).await.expect("touch");
        let fetched = fetch(&ctx, "p1", &sign_pk, 0).await.expect("fetch");
        assert_eq!(fetched, post);
    }
}

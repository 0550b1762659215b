//! Feed comments (spec.md §4.7): a multi-writer list of comments on one
//! post, encrypted to the post's recipient key (e.g. the channel owner's
//! KEM key, distributed out of band) the same way [`super::day_index`]
//! and [`super::vote`] are.
//!
//! §9's "cyclic threading references" redesign flag: rather than a
//! comment embedding a `parent_comment_id` that can form a cycle, replies
//! are modeled as a flat list ordered by `commented_at_ms`, with
//! `reply_to` naming a parent by id without the adapter itself ever
//! walking or validating that chain — acyclicity is a client-side
//! rendering concern, not a storage invariant this module enforces.

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
const KIND_TAG: &str = "feed_comment";
/// TTL for a post's comment set (spec.md §4.7): 30 days.
pub const TTL_SECONDS: u32 = 30 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub author_fingerprint: String,
    pub reply_to: Option<String>,
    pub body: String,
    pub commented_at_ms: i64,
}

impl InnerKeyed for Comment {
    fn inner_id(&self) -> &str {
        &self.comment_id
    }
    fn inner_timestamp_ms(&self) -> i64 {
        self.commented_at_ms
    }
}

fn key_base(post_id: &str) -> String {
    format!("dna:feed:post:{post_id}:comments")
}

pub async fn add(
    ctx: &CoreContext,
    post_id: &str,
    recipient_kem_pk: &KemPublicKey,
    comment: &Comment,
    timestamp_s: u64,
) -> Result<(), CoreError> {
    common::publish_multiwriter(
        ctx,
        KIND,
        VERSION,
        &key_base(post_id),
        recipient_kem_pk,
        comment,
        TTL_SECONDS,
        timestamp_s,
        KIND_TAG,
    )
    .await
}

/// Every comment on `post_id`, merged and sorted oldest-first.
pub async fn fetch_all(
    dht: &dyn Dht,
    post_id: &str,
    recipient_kem_sk: &KemSecretKey,
    resolve_author: impl Fn(u64) -> Option<SignPublicKey>,
    now_s: u64,
) -> Result<Vec<Comment>, CoreError> {
    let raw = common::fetch_multiwriter_raw(dht, KIND, VERSION, VERSION, &key_base(post_id), recipient_kem_sk, resolve_author, now_s).await?;
    let mut comments = Vec::with_capacity(raw.len());
    for bytes in raw {
        comments.push(serde_json::from_slice::<Comment>(&bytes)?);
    }
    let mut merged = multiwriter::merge(comments);
    merged.reverse();
    Ok(merged)
}

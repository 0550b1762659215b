//! Feed votes (spec.md §4.7): a multi-writer tally on a post or comment,
//! one entry per voter, encrypted to the target's recipient key.

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
const KIND_TAG: &str = "feed_vote";
/// TTL for a vote tally (spec.md §4.7): 30 days.
pub const TTL_SECONDS: u32 = 30 * 24 * 3600;

/// What's being voted on: a post or one of its comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteTarget {
    Post,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_fingerprint: String,
    /// `1` for upvote, `-1` for downvote; `0` clears a prior vote (a
    /// tombstone per [`InnerKeyed::is_tombstone`]).
    pub value: i8,
    pub cast_at_ms: i64,
}

impl InnerKeyed for Vote {
    fn inner_id(&self) -> &str {
        &self.voter_fingerprint
    }
    fn inner_timestamp_ms(&self) -> i64 {
        self.cast_at_ms
    }
    fn is_tombstone(&self) -> bool {
        self.value == 0
    }
}

fn key_base(target: VoteTarget, target_id: &str) -> String {
    match target {
        VoteTarget::Post => format!("dna:feed:post:{target_id}:votes"),
        VoteTarget::Comment => format!("dna:feed:comment:{target_id}:votes"),
    }
}

pub async fn cast(
    ctx: &CoreContext,
    target: VoteTarget,
    target_id: &str,
    recipient_kem_pk: &KemPublicKey,
    vote: &Vote,
    timestamp_s: u64,
) -> Result<(), CoreError> {
    common::publish_multiwriter(
        ctx,
        KIND,
        VERSION,
        &key_base(target, target_id),
        recipient_kem_pk,
        vote,
        TTL_SECONDS,
        timestamp_s,
        KIND_TAG,
    )
    .await
}

/// Every live (non-tombstoned) vote on `target_id`, one per voter.
pub async fn tally(
    dht: &dyn Dht,
    target: VoteTarget,
    target_id: &str,
    recipient_kem_sk: &KemSecretKey,
    resolve_author: impl Fn(u64) -> Option<SignPublicKey>,
    now_s: u64,
) -> Result<Vec<Vote>, CoreError> {
    let raw = common::fetch_multiwriter_raw(dht, KIND, VERSION, VERSION, &key_base(target, target_id), recipient_kem_sk, resolve_author, now_s).await?;
    let mut votes = Vec::with_capacity(raw.len());
    for bytes in raw {
        votes.push(serde_json::from_slice::<Vote>(&bytes)?);
    }
    Ok(multiwriter::merge(votes))
}

//! Feed channel metadata (spec.md §4.7): a single-writer chunked,
//! self-encrypted record describing one channel.

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::Application;
const VERSION: u8 = 1;
/// TTL for channel metadata (spec.md §4.7): 30 days.
pub const TTL_SECONDS: u32 = 30 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMeta {
    pub channel_id: String,
    pub name: String,
    pub description: String,
    pub owner_fingerprint: String,
    pub created_at: i64,
}

fn key_base(channel_id: &str) -> String {
    format!("dna:feed:{channel_id}:meta")
}

pub async fn publish(ctx: &CoreContext, meta: &ChannelMeta, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, VERSION, &key_base(&meta.channel_id), meta, TTL_SECONDS, timestamp_s).await
}

pub async fn fetch(ctx: &CoreContext, channel_id: &str, author_pk: &SignPublicKey, now_s: u64) -> Result<ChannelMeta, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, VERSION, VERSION, &key_base(channel_id), author_pk, now_s).await
}

//! Group list (spec.md §4.7): a single-writer chunked, self-encrypted
//! list of groups an identity belongs to.

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::GroupList;
const VERSION: u8 = 1;
/// TTL for group lists (spec.md §4.7): 7 days.
pub const TTL_SECONDS: u32 = 7 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group_id: String,
    pub display_name: String,
    pub joined_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupList {
    pub groups: Vec<GroupMembership>,
}

fn key_base(owner_id: &str) -> String {
    format!("{owner_id}:grouplist")
}

pub async fn publish(ctx: &CoreContext, list: &GroupList, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, VERSION, &key_base(&ctx.fingerprint()), list, TTL_SECONDS, timestamp_s).await
}

pub async fn fetch(ctx: &CoreContext, owner_id: &str, author_pk: &SignPublicKey, now_s: u64) -> Result<GroupList, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, VERSION, VERSION, &key_base(owner_id), author_pk, now_s).await
}

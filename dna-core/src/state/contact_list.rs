//! Contact list (spec.md §4.7): a single-writer chunked, self-encrypted
//! JSON list of an identity's contacts.

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::ContactList;
const VERSION: u8 = 1;
/// TTL for contact lists (spec.md §4.7): 7 days.
pub const TTL_SECONDS: u32 = 7 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub fingerprint: String,
    pub display_name: String,
    pub added_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactList {
    pub contacts: Vec<Contact>,
}

fn key_base(owner_id: &str) -> String {
    format!("{owner_id}:contactlist")
}

pub async fn publish(ctx: &CoreContext, list: &ContactList, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, VERSION, &key_base(&ctx.fingerprint()), list, TTL_SECONDS, timestamp_s).await
}

pub async fn fetch(ctx: &CoreContext, owner_id: &str, author_pk: &SignPublicKey, now_s: u64) -> Result<ContactList, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, VERSION, VERSION, &key_base(owner_id), author_pk, now_s).await
}

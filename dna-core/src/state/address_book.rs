//! Address book (spec.md §4.7): a single-writer chunked, self-encrypted
//! JSON list of addresses the owner has saved for other networks.

use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::signature::SignPublicKey;
use serde::{Deserialize, Serialize};

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::state::common;

const KIND: EnvelopeKind = EnvelopeKind::AddressBook;
const VERSION: u8 = 1;
/// TTL for address books (spec.md §4.7): 7 days.
pub const TTL_SECONDS: u32 = 7 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub address: String,
    pub label: String,
    pub network: String,
    pub notes: String,
    pub created_at: i64,
    pub last_used: i64,
    pub use_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressBook {
    pub entries: Vec<AddressEntry>,
}

fn key_base(owner_id: &str) -> String {
    format!("{owner_id}:addressbook")
}

pub async fn publish(ctx: &CoreContext, book: &AddressBook, timestamp_s: u64) -> Result<(), CoreError> {
    common::publish_self_encrypted(ctx, KIND, VERSION, &key_base(&ctx.fingerprint()), book, TTL_SECONDS, timestamp_s).await
}

pub async fn fetch(ctx: &CoreContext, owner_id: &str, author_pk: &SignPublicKey, now_s: u64) -> Result<AddressBook, CoreError> {
    common::fetch_self_encrypted(ctx, KIND, VERSION, VERSION, &key_base(owner_id), author_pk, now_s).await
}

//! Self-encryption protocol (spec.md §4.3): an identity encrypting state
//! to itself, for later recovery by the same identity and no one else.
//!
//! `seal` produces a fully signed [`crate::envelope`] whose payload is the
//! self-encrypted wire format from [`crate::wire`]; `open` is its inverse,
//! and additionally enforces that the envelope was authored by the same
//! identity that is opening it — two different identities never share a
//! self-encryption key pair, so a mismatch here means either corruption
//! or an attacker substituting someone else's envelope.

extern crate alloc;
use alloc::vec::Vec;

use crate::aead;
use crate::envelope::{self, Envelope, EnvelopeKind};
use crate::error::{DecodeError, EncodeError};
use crate::kdf;
use crate::kem::{KemPublicKey, KemSecretKey};
use crate::signature::{self, SignPublicKey, SignSecretKey};
use crate::wire;

/// Bytes covered by the signature carried in a self-encrypted envelope:
/// `plaintext || timestamp_s(BE)`. Computed over the plaintext, never the
/// ciphertext, so [`seal`] signs before encrypting and [`open`]/[`open_from`]
/// verify only after decrypting (spec.md §4.3).
fn signed_bytes(plaintext: &[u8], timestamp_s: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(plaintext.len() + 8);
    buf.extend_from_slice(plaintext);
    buf.extend_from_slice(&timestamp_s.to_be_bytes());
    buf
}

/// The four keys identifying one party able to self-encrypt/decrypt:
/// a KEM pair for confidentiality and a signature pair for authorship.
pub struct SelfEncryptIdentity<'a> {
    pub kem_pk: &'a KemPublicKey,
    pub kem_sk: &'a KemSecretKey,
    pub sign_pk: &'a SignPublicKey,
    pub sign_sk: &'a SignSecretKey,
}

/// Encrypt `plaintext` to `identity`'s own KEM key, sign the plaintext
/// under `identity`'s own signing key, and frame the result as an
/// envelope of `kind`/`version` ready to publish.
pub fn seal(
    kind: EnvelopeKind,
    version: u8,
    identity: &SelfEncryptIdentity<'_>,
    plaintext: &[u8],
    timestamp_s: u64,
    expiry_s: u64,
) -> Result<Vec<u8>, EncodeError> {
    let (shared_secret, kem_ct) = crate::kem::encapsulate(identity.kem_pk)?;
    let ct_hash = kdf::ct_hash(&kem_ct);
    let key = kdf::derive_key(&shared_secret, &ct_hash, timestamp_s)?;
    let nonce = aead::random_nonce()?;
    let aead_ct = aead::seal(&key, &nonce, plaintext, &[])?;
    let payload = wire::encode(&kem_ct, &nonce, &aead_ct);

    let sig = signature::sign(&signed_bytes(plaintext, timestamp_s), identity.sign_sk);

    envelope::encode(kind, version, timestamp_s, expiry_s, &payload, &sig).map_err(|_| EncodeError::CryptoFailure)
}

/// Encrypt `plaintext` to `recipient_kem_pk` and sign it under
/// `author_sign_sk`, without requiring the two to belong to the same
/// identity. Used by multi-writer state kinds where many distinct
/// authors each publish under one shared key, all encrypting to the same
/// recipient (e.g. a group's own KEM key) while authenticating under
/// their own personal signing key. [`open_from`] is this function's
/// inverse.
pub fn seal_to(
    kind: EnvelopeKind,
    version: u8,
    recipient_kem_pk: &KemPublicKey,
    author_sign_sk: &SignSecretKey,
    plaintext: &[u8],
    timestamp_s: u64,
    expiry_s: u64,
) -> Result<Vec<u8>, EncodeError> {
    let (shared_secret, kem_ct) = crate::kem::encapsulate(recipient_kem_pk)?;
    let ct_hash = kdf::ct_hash(&kem_ct);
    let key = kdf::derive_key(&shared_secret, &ct_hash, timestamp_s)?;
    let nonce = aead::random_nonce()?;
    let aead_ct = aead::seal(&key, &nonce, plaintext, &[])?;
    let payload = wire::encode(&kem_ct, &nonce, &aead_ct);

    let sig = signature::sign(&signed_bytes(plaintext, timestamp_s), author_sign_sk);

    envelope::encode(kind, version, timestamp_s, expiry_s, &payload, &sig).map_err(|_| EncodeError::CryptoFailure)
}

/// Decode, verify, and decrypt a self-encrypted envelope previously
/// produced by [`seal`] for the same `identity`. `now_s` is used for the
/// expiry check; pass `0` to skip it. The signature is checked against
/// the *decrypted* plaintext, never the ciphertext — see [`signed_bytes`].
pub fn open(
    kind: EnvelopeKind,
    min_version: u8,
    max_version: u8,
    identity: &SelfEncryptIdentity<'_>,
    envelope_bytes: &[u8],
    now_s: u64,
) -> Result<Vec<u8>, DecodeError> {
    let env: Envelope<'_> = envelope::decode(envelope_bytes, kind, min_version, max_version)?;

    if now_s != 0 && env.is_expired(now_s) {
        return Err(DecodeError::Expired);
    }

    let parts = wire::decode(env.payload)?;
    let shared_secret = crate::kem::decapsulate(identity.kem_sk, parts.kem_ciphertext)?;
    let ct_hash = kdf::ct_hash(parts.kem_ciphertext);
    let key = kdf::derive_key(&shared_secret, &ct_hash, env.timestamp_s)
        .map_err(|_| DecodeError::DecryptFail)?;
    let plaintext = aead::open(&key, parts.nonce, parts.aead_ciphertext, &[])?;

    if !signature::verify(env.signature, &signed_bytes(&plaintext, env.timestamp_s), identity.sign_pk) {
        return Err(DecodeError::SignatureInvalid);
    }

    Ok(plaintext)
}

/// Decode and verify a self-encrypted envelope as above, but against an
/// arbitrary author public key rather than `identity`'s own — used by
/// multi-writer state kinds where many authors publish under one shared
/// key and a reader only has the KEM secret key of one recipient
/// identity plus each author's signing public key.
///
/// Returns [`DecodeError::SenderMismatch`] when `expected_author` is
/// `Some` and disagrees with `author_pk`. Self-encryption proper always
/// passes the same identity's own `sign_pk` for both.
pub fn open_from(
    kind: EnvelopeKind,
    min_version: u8,
    max_version: u8,
    recipient_kem_sk: &KemSecretKey,
    author_pk: &SignPublicKey,
    expected_author: Option<&SignPublicKey>,
    envelope_bytes: &[u8],
    now_s: u64,
) -> Result<Vec<u8>, DecodeError> {
    if let Some(expected) = expected_author {
        if expected != author_pk {
            return Err(DecodeError::SenderMismatch);
        }
    }

    let env: Envelope<'_> = envelope::decode(envelope_bytes, kind, min_version, max_version)?;
    if now_s != 0 && env.is_expired(now_s) {
        return Err(DecodeError::Expired);
    }

    let parts = wire::decode(env.payload)?;
    let shared_secret = crate::kem::decapsulate(recipient_kem_sk, parts.kem_ciphertext)?;
    let ct_hash = kdf::ct_hash(parts.kem_ciphertext);
    let key = kdf::derive_key(&shared_secret, &ct_hash, env.timestamp_s)
        .map_err(|_| DecodeError::DecryptFail)?;
    let plaintext = aead::open(&key, parts.nonce, parts.aead_ciphertext, &[])?;

    if !signature::verify(env.signature, &signed_bytes(&plaintext, env.timestamp_s), author_pk) {
        return Err(DecodeError::SignatureInvalid);
    }

    Ok(plaintext)
}

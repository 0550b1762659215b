//! AEAD key derivation for the self-encryption codec.
//!
//! `info = PROTOCOL_ID || b"|aes|" || ct_hash || timestamp_s(BE)`
//! `key  = HKDF-SHA256(shared_secret, salt=None, info=info, len=32)`
//!
//! Binding the sender's claimed `timestamp_s` into the KDF info means a
//! replayed self-encrypted payload with a forged timestamp decrypts to
//! garbage rather than silently succeeding with the wrong key material —
//! the envelope's signature still covers `plaintext || timestamp_s`
//! independently, but this gives the AEAD layer its own domain separation.

extern crate alloc;
use alloc::vec::Vec;

use hkdf::Hkdf;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

use crate::error::EncodeError;

/// Domain-separation tag for this protocol version's AEAD key derivation.
pub const PROTOCOL_ID: &[u8] = b"dna-self-encrypt-v1";

pub fn ct_hash(kem_ct: &[u8]) -> [u8; 32] {
    let h = Sha3_256::digest(kem_ct);
    let mut out = [0u8; 32];
    out.copy_from_slice(&h);
    out
}

pub fn derive_key(shared_secret: &[u8], ct_hash: &[u8; 32], timestamp_s: u64) -> Result<[u8; 32], EncodeError> {
    let ts = timestamp_s.to_be_bytes();
    let mut info = Vec::with_capacity(PROTOCOL_ID.len() + 5 + 32 + ts.len());
    info.extend_from_slice(PROTOCOL_ID);
    info.extend_from_slice(b"|aes|");
    info.extend_from_slice(ct_hash);
    info.extend_from_slice(&ts);

    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut out = [0u8; 32];
    hk.expand(&info, &mut out).map_err(|_| EncodeError::CryptoFailure)?;
    Ok(out)
}

//! Wire format for the self-encrypted payload (spec §3 "Self-encrypted
//! payload"):
//!
//!   kem_ct[1568] || iv[12] || tag[16] || aead_ct
//!
//! No separate header is needed here — the component sizes are fixed by
//! the pinned suite (ML-KEM-1024), so there is nothing to self-describe.
//! The *outer* envelope (see [`crate::envelope`]) is where version/kind
//! negotiation lives; this inner layer stays a flat concatenation, as
//! spec.md §3 specifies it.

extern crate alloc;
use alloc::vec::Vec;

use crate::error::DecodeError;
use crate::kem::KEM_CIPHERTEXT_BYTES;

pub const NONCE_BYTES: usize = 12;
pub const AEAD_TAG_BYTES: usize = 16;
pub const AES_KEY_BYTES: usize = 32;

/// Minimum self-encrypted payload size: kem_ct + iv + tag (aead_ct may be
/// empty for a zero-length plaintext).
pub const MIN_SELF_ENCRYPTED_BYTES: usize = KEM_CIPHERTEXT_BYTES + NONCE_BYTES + AEAD_TAG_BYTES;

/// Borrowed view of a parsed self-encrypted payload.
pub struct SelfEncryptedParts<'a> {
    pub kem_ciphertext: &'a [u8],
    pub nonce: &'a [u8; NONCE_BYTES],
    /// AEAD ciphertext including its trailing 16-byte tag.
    pub aead_ciphertext: &'a [u8],
}

pub fn decode(data: &[u8]) -> Result<SelfEncryptedParts<'_>, DecodeError> {
    if data.len() < MIN_SELF_ENCRYPTED_BYTES {
        return Err(DecodeError::InvalidSize);
    }

    let kem_end = KEM_CIPHERTEXT_BYTES;
    let nonce_end = kem_end + NONCE_BYTES;

    let kem_ciphertext = &data[..kem_end];
    let nonce: &[u8; NONCE_BYTES] = data[kem_end..nonce_end]
        .try_into()
        .map_err(|_| DecodeError::InvalidSize)?;
    let aead_ciphertext = &data[nonce_end..];
    if aead_ciphertext.len() < AEAD_TAG_BYTES {
        return Err(DecodeError::InvalidSize);
    }

    Ok(SelfEncryptedParts {
        kem_ciphertext,
        nonce,
        aead_ciphertext,
    })
}

pub fn encode(kem_ct: &[u8], nonce: &[u8; NONCE_BYTES], aead_ct: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(kem_ct.len() + NONCE_BYTES + aead_ct.len());
    out.extend_from_slice(kem_ct);
    out.extend_from_slice(nonce);
    out.extend_from_slice(aead_ct);
    out
}

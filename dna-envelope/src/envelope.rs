//! Outer envelope codec (spec.md §3, §4.2).
//!
//! ```text
//! magic[4]        per-kind ASCII tag, e.g. b"CLST", b"MSGB"
//! version[1]
//! timestamp_s[8]  (u64, BE, seconds since UNIX epoch)
//! expiry_s[8]     (u64, BE; MUST be > timestamp_s)
//! payload_len[4]  (u32, BE)
//! payload[payload_len]
//! sig_len[4]      (u32, BE)
//! signature[sig_len]
//! ```
//!
//! `signature` covers `payload || timestamp_s(BE)` under the author's
//! ML-DSA-87 signing key — not the whole envelope, so the header fields
//! are authenticated only as inputs to that computation, never directly.
//! Any trailing bytes after `signature` make the envelope malformed.
//!
//! Every application state kind shares this one codec; what varies is
//! the magic tag, carried here as [`EnvelopeKind`] rather than a raw
//! 4-byte constant, so a caller can't transpose two kinds' tags by
//! fumbling a byte literal.

extern crate alloc;
use alloc::vec::Vec;

use crate::error::DecodeError;
use crate::signature::{self, SignPublicKey, SIGNATURE_BYTES};

pub const VERSION: u8 = 1;

const MAGIC_LEN: usize = 4;
const VERSION_LEN: usize = 1;
const TIMESTAMP_LEN: usize = 8;
const EXPIRY_LEN: usize = 8;
const PAYLOAD_LEN_LEN: usize = 4;
const SIG_LEN_LEN: usize = 4;

const HEADER_LEN: usize = MAGIC_LEN + VERSION_LEN + TIMESTAMP_LEN + EXPIRY_LEN + PAYLOAD_LEN_LEN;
const MIN_ENVELOPE_LEN: usize = HEADER_LEN + SIG_LEN_LEN;

/// Per-kind magic tags (spec.md §3's table), plus one generic tag for
/// the chunked transport's own chunk-level framing, which doesn't
/// participate in the state-kind taxonomy at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    ContactList,
    AddressBook,
    GroupList,
    GroupKeys,
    MessageBackup,
    /// Generic state kinds spec.md §4.7 leaves unnamed in its magic
    /// column (day-outbox entries, feed/wall records): any JSON payload
    /// that shares the envelope's framing but has no per-kind magic tag
    /// of its own.
    Application,
    /// Transport-level chunk framing (spec §6.2's chunk value wrapper).
    Transport,
}

impl EnvelopeKind {
    pub const fn magic(self) -> [u8; 4] {
        match self {
            EnvelopeKind::ContactList => *b"CLST",
            EnvelopeKind::AddressBook => *b"ADDR",
            EnvelopeKind::GroupList => *b"GRPL",
            EnvelopeKind::GroupKeys => *b"GEKS",
            EnvelopeKind::MessageBackup => *b"MSGB",
            EnvelopeKind::Application => *b"APPL",
            EnvelopeKind::Transport => *b"CHNK",
        }
    }
}

/// A decoded envelope, borrowing its payload and signature from the
/// original buffer.
#[derive(Debug)]
pub struct Envelope<'a> {
    pub kind: EnvelopeKind,
    pub version: u8,
    pub timestamp_s: u64,
    pub expiry_s: u64,
    pub payload: &'a [u8],
    pub signature: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// `true` if `now_s >= expiry_s`.
    pub fn is_expired(&self, now_s: u64) -> bool {
        now_s >= self.expiry_s
    }

    /// Bytes covered by the signature: `payload || timestamp_s(BE)`.
    fn signed_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.payload.len() + TIMESTAMP_LEN);
        buf.extend_from_slice(self.payload);
        buf.extend_from_slice(&self.timestamp_s.to_be_bytes());
        buf
    }

    /// Verify the envelope's signature against `author_pk`. Does not
    /// check expiry — callers check that separately against their own
    /// notion of "now".
    pub fn verify(&self, author_pk: &SignPublicKey) -> Result<(), DecodeError> {
        let signed = self.signed_bytes();
        if signature::verify(self.signature, &signed, author_pk) {
            Ok(())
        } else {
            Err(DecodeError::SignatureInvalid)
        }
    }
}

/// Frame `payload` and its already-computed `signature` under `kind` and
/// `version`. Content-agnostic: callers are responsible for producing
/// `signature` over whatever bytes their kind's contract specifies (the
/// chunk transport signs `payload || timestamp_s` directly; self-encrypted
/// state kinds sign `plaintext || timestamp_s` before encryption, so this
/// function never sees the plaintext at all — see `dna_envelope::selfenc`).
pub fn encode(
    kind: EnvelopeKind,
    version: u8,
    timestamp_s: u64,
    expiry_s: u64,
    payload: &[u8],
    signature: &[u8],
) -> Result<Vec<u8>, DecodeError> {
    if payload.len() > u32::MAX as usize {
        return Err(DecodeError::InvalidSize);
    }
    if signature.len() > u32::MAX as usize {
        return Err(DecodeError::InvalidSize);
    }

    let mut out = Vec::with_capacity(MIN_ENVELOPE_LEN + payload.len() + signature.len());
    out.extend_from_slice(&kind.magic());
    out.push(version);
    out.extend_from_slice(&timestamp_s.to_be_bytes());
    out.extend_from_slice(&expiry_s.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&(signature.len() as u32).to_be_bytes());
    out.extend_from_slice(signature);
    Ok(out)
}

/// Parse `data` into an [`Envelope`], checking that its magic matches
/// `expected_kind`, its version falls within `[min_version,
/// max_version]`, and that no trailing bytes remain. Does not verify the
/// signature or expiry — call [`Envelope::verify`] and
/// [`Envelope::is_expired`] after, once the caller has resolved the
/// author's signing key.
pub fn decode(data: &[u8], expected_kind: EnvelopeKind, min_version: u8, max_version: u8) -> Result<Envelope<'_>, DecodeError> {
    if data.len() < HEADER_LEN {
        return Err(DecodeError::InvalidSize);
    }

    let mut off = 0usize;
    let magic = &data[off..off + MAGIC_LEN];
    off += MAGIC_LEN;
    if magic != expected_kind.magic() {
        return Err(DecodeError::BadMagic);
    }

    let version = data[off];
    off += VERSION_LEN;
    if version < min_version || version > max_version {
        return Err(DecodeError::BadVersion);
    }

    let timestamp_s = u64::from_be_bytes(data[off..off + TIMESTAMP_LEN].try_into().unwrap());
    off += TIMESTAMP_LEN;

    let expiry_s = u64::from_be_bytes(data[off..off + EXPIRY_LEN].try_into().unwrap());
    off += EXPIRY_LEN;

    if expiry_s <= timestamp_s {
        return Err(DecodeError::Expired);
    }

    let payload_len =
        u32::from_be_bytes(data[off..off + PAYLOAD_LEN_LEN].try_into().unwrap()) as usize;
    off += PAYLOAD_LEN_LEN;

    if data.len() < off + payload_len + SIG_LEN_LEN {
        return Err(DecodeError::BadLength);
    }
    let payload = &data[off..off + payload_len];
    off += payload_len;

    let sig_len = u32::from_be_bytes(data[off..off + SIG_LEN_LEN].try_into().unwrap()) as usize;
    off += SIG_LEN_LEN;

    if sig_len != SIGNATURE_BYTES {
        return Err(DecodeError::BadLength);
    }
    if data.len() != off + sig_len {
        return Err(DecodeError::BadLength);
    }
    let sig = &data[off..off + sig_len];

    Ok(Envelope {
        kind: expected_kind,
        version,
        timestamp_s,
        expiry_s,
        payload,
        signature: sig,
    })
}

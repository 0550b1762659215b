//! Component-wide error taxonomy (spec §7). Transport and local errors
//! use `thiserror`; integrity errors reuse `dna_envelope`'s opaque decode
//! errors directly rather than wrapping them a second time.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DhtError {
    #[error("value not found")]
    NotFound,
    #[error("operation timed out")]
    Timeout,
    #[error("transient transport error: {0}")]
    Transient(String),
    #[error("listen token not found")]
    UnknownListenToken,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("fingerprint must be 128 hex characters")]
    InvalidFingerprintLength,
    #[error(transparent)]
    Envelope(#[from] dna_envelope::DecodeError),
    #[error("envelope encode failed: {0}")]
    EnvelopeEncode(dna_envelope::EncodeError),
    #[error(transparent)]
    Chunk(#[from] crate::chunk::ChunkError),
    #[error(transparent)]
    Dht(#[from] DhtError),
    #[error("json encode/decode failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("local io error: {0}")]
    Io(String),
    #[error("duplicate value")]
    Duplicate,
    #[error("value rejected: {0}")]
    Corrupt(String),
    #[error("unsupported schema version {found} (accepted [{min}, {max}])")]
    UnsupportedVersion { found: u8, min: u8, max: u8 },
    #[error("value not published: retries exhausted")]
    Unpublished,
}

impl From<dna_envelope::EncodeError> for CoreError {
    fn from(e: dna_envelope::EncodeError) -> Self {
        CoreError::EnvelopeEncode(e)
    }
}

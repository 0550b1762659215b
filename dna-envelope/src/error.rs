//! Error taxonomy for the envelope and self-encryption codecs.
//!
//! All decode-path failures collapse to one of these variants; none of them
//! reveal *why* a cryptographic operation failed beyond the category, so
//! callers can't build a decryption oracle out of error messages.

use core::fmt;

/// Failure producing a self-encrypted payload or an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// A length field would not fit its wire encoding (e.g. > u32::MAX).
    InvalidSize,
    /// The KEM or AEAD primitive itself rejected the operation.
    CryptoFailure,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "invalid size"),
            Self::CryptoFailure => write!(f, "crypto operation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Failure opening a self-encrypted payload or decoding an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer too short, or a declared length does not match what remains.
    InvalidSize,
    /// KEM decapsulation failed (malformed ciphertext).
    KemFail,
    /// AEAD authentication failed — wrong key, tampered ciphertext, or
    /// mismatched associated data.
    DecryptFail,
    /// Post-quantum signature did not verify.
    SignatureInvalid,
    /// Decrypted sender identity does not match the identity the caller
    /// expected (self-encryption identity check).
    SenderMismatch,
    /// Envelope magic tag does not match the expected application kind.
    BadMagic,
    /// Envelope version is outside `[min_supported, current]`.
    BadVersion,
    /// Declared field length is inconsistent with the buffer, or trailing
    /// bytes remain after the last declared field.
    BadLength,
    /// `expiry_s <= timestamp_s`, or `expiry_s <= now`.
    Expired,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "invalid size"),
            Self::KemFail => write!(f, "KEM decapsulation failed"),
            Self::DecryptFail => write!(f, "decryption failed"),
            Self::SignatureInvalid => write!(f, "signature invalid"),
            Self::SenderMismatch => write!(f, "sender identity mismatch"),
            Self::BadMagic => write!(f, "bad magic"),
            Self::BadVersion => write!(f, "bad version"),
            Self::BadLength => write!(f, "bad length"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Normalize encode errors into decode errors (uniform oracle discipline —
/// a caller threading a `Result<_, EncodeError>` into a decode-side `?`
/// never leaks which side failed).
impl From<EncodeError> for DecodeError {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::InvalidSize => Self::InvalidSize,
            EncodeError::CryptoFailure => Self::DecryptFail,
        }
    }
}

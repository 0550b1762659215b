//! Post-quantum envelope and self-encryption codec.
//!
//! This crate is the wire-format and cryptography layer underneath the
//! DHT application-state client: a signed, expiring envelope format
//! (see [`envelope`]) and a self-encryption protocol built on ML-KEM-1024
//! for confidentiality and ML-DSA-87 for authenticity (see [`selfenc`]).
//! It knows nothing about the DHT, identities, or state kinds built on
//! top of it — those live in `dna-identity` and `dna-core`.
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod aead;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod kem;
pub mod selfenc;
pub mod signature;
pub mod wire;

pub use envelope::{Envelope, EnvelopeKind, VERSION as ENVELOPE_VERSION};
pub use error::{DecodeError, EncodeError};
pub use kem::{KemPublicKey, KemSecretKey};
pub use selfenc::{SelfEncryptIdentity, open, open_from, seal, seal_to};
pub use signature::{SignPublicKey, SignSecretKey};

/// Protocol version carried in every envelope's `version` byte.
pub const PROTOCOL_VERSION: u8 = envelope::VERSION;

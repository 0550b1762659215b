//! KDF/Keyname (spec §4.1): derive a stable 64-byte DHT key from a
//! human-readable base string.

use sha3::{Digest, Sha3_512};

pub const KEY_NAME_BYTES: usize = 64;

/// A derived DHT key. Wraps the raw 64 bytes so call sites can't
/// accidentally pass a raw base string where a derived key is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyName([u8; KEY_NAME_BYTES]);

impl KeyName {
    /// Derive a `KeyName` from a human-readable base string:
    /// `SHA3-512(base.as_bytes())`. Pure and infallible.
    pub fn derive(base: &str) -> Self {
        let digest = Sha3_512::digest(base.as_bytes());
        let mut out = [0u8; KEY_NAME_BYTES];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Derive a sub-key by appending a suffix to the base before hashing,
    /// e.g. `kdf(base || ":chunk:" || index)`.
    pub fn derive_sub(base: &str, suffix: &str) -> Self {
        let mut combined = String::with_capacity(base.len() + suffix.len());
        combined.push_str(base);
        combined.push_str(suffix);
        Self::derive(&combined)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_NAME_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<KeyName> for Vec<u8> {
    fn from(k: KeyName) -> Self {
        k.0.to_vec()
    }
}

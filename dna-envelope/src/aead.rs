//! AEAD: AES-256-GCM.

extern crate alloc;
use alloc::vec::Vec;

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use getrandom::getrandom;

use crate::error::{DecodeError, EncodeError};

/// Draw a fresh random 12-byte nonce. Used on the encrypt path only — a
/// nonce MUST never be reused under the same key.
pub fn random_nonce() -> Result<[u8; 12], EncodeError> {
    let mut n = [0u8; 12];
    getrandom(&mut n).map_err(|_| EncodeError::CryptoFailure)?;
    Ok(n)
}

pub fn seal(key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncodeError::CryptoFailure)?;
    let n = Nonce::from_slice(nonce);
    let payload = Payload { msg: plaintext, aad };
    cipher.encrypt(n, payload).map_err(|_| EncodeError::CryptoFailure)
}

pub fn open(key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| DecodeError::DecryptFail)?;
    let n = Nonce::from_slice(nonce);
    let payload = Payload { msg: ciphertext, aad };
    cipher.decrypt(n, payload).map_err(|_| DecodeError::DecryptFail)
}

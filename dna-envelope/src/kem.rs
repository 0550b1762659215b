//! Post-quantum KEM: ML-KEM-1024 (FIPS 203, "Kyber-1024 class").
//!
//! The teacher's hybrid X25519+ML-KEM-768 construction fuses confidentiality
//! and domain separation into one combined shared secret with no
//! independent signature. Here the KEM is used for confidentiality only —
//! authenticity comes from a wholly separate signature keypair
//! (see [`crate::signature`]) — so there is no classical hybrid leg to
//! carry along. Built on the same `ml-kem` crate the teacher's hybrid
//! construction uses, rather than `pqcrypto-mlkem`, because key generation
//! here has to accept a caller-supplied RNG (see [`keygen_from_rng`]) and
//! `ml-kem`'s `KemCore::generate` takes one directly.

extern crate alloc;
use alloc::vec::Vec;

use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Ciphertext, EncodedSizeUser, KemCore, MlKem1024, MlKem1024Params};
use rand_core::{CryptoRngCore, OsRng};

use crate::error::{DecodeError, EncodeError};

type Ek = ml_kem::kem::EncapsulationKey<MlKem1024Params>;
type Dk = ml_kem::kem::DecapsulationKey<MlKem1024Params>;
type MlKemCt = Ciphertext<MlKem1024>;

/// ML-KEM-1024 encapsulation (public) key size in bytes.
pub const KEM_PUBLIC_KEY_BYTES: usize = 1568;
/// ML-KEM-1024 decapsulation (secret) key size in bytes.
pub const KEM_SECRET_KEY_BYTES: usize = 3168;
/// ML-KEM-1024 ciphertext size in bytes.
pub const KEM_CIPHERTEXT_BYTES: usize = 1568;
/// ML-KEM-1024 shared secret size in bytes.
pub const KEM_SHARED_SECRET_BYTES: usize = 32;

/// KEM public (encapsulation) key.
#[derive(Clone)]
pub struct KemPublicKey(Ek);

impl KemPublicKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != KEM_PUBLIC_KEY_BYTES {
            return Err(DecodeError::InvalidSize);
        }
        let fixed: [u8; KEM_PUBLIC_KEY_BYTES] = bytes.try_into().map_err(|_| DecodeError::InvalidSize)?;
        Ok(Self(Ek::from_bytes(&fixed.into())))
    }
}

/// KEM secret (decapsulation) key.
pub struct KemSecretKey(Dk);

impl KemSecretKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != KEM_SECRET_KEY_BYTES {
            return Err(DecodeError::InvalidSize);
        }
        let fixed: [u8; KEM_SECRET_KEY_BYTES] = bytes.try_into().map_err(|_| DecodeError::InvalidSize)?;
        Ok(Self(Dk::from_bytes(&fixed.into())))
    }
}

/// Generate a new ML-KEM-1024 keypair from the system CSPRNG.
pub fn keygen() -> (KemPublicKey, KemSecretKey) {
    keygen_from_rng(&mut OsRng)
}

/// Generate an ML-KEM-1024 keypair driven entirely by `rng`. Two calls
/// with RNGs seeded identically (e.g. two `ChaCha20Rng::from_seed`
/// instances built from the same 32-byte seed) produce the same keypair —
/// this is what makes [`dna_identity::Identity::generate_from_seed`]'s
/// recovery story actually hold for the key material, not just the
/// mnemonic wrapping it.
pub fn keygen_from_rng<R: CryptoRngCore>(rng: &mut R) -> (KemPublicKey, KemSecretKey) {
    let (dk, ek) = MlKem1024::generate(rng);
    (KemPublicKey(ek), KemSecretKey(dk))
}

/// Encapsulate against `pk`. Returns `(shared_secret, ciphertext)`.
pub fn encapsulate(pk: &KemPublicKey) -> Result<([u8; KEM_SHARED_SECRET_BYTES], Vec<u8>), EncodeError> {
    let (ct, ss) = pk.0.encapsulate(&mut OsRng).map_err(|_| EncodeError::CryptoFailure)?;
    let mut out = [0u8; KEM_SHARED_SECRET_BYTES];
    let ss_bytes = ss.as_slice();
    if ss_bytes.len() != KEM_SHARED_SECRET_BYTES {
        return Err(EncodeError::CryptoFailure);
    }
    out.copy_from_slice(ss_bytes);
    Ok((out, ct.as_slice().to_vec()))
}

/// Decapsulate `ct` using `sk`. Returns the shared secret.
pub fn decapsulate(sk: &KemSecretKey, ct: &[u8]) -> Result<[u8; KEM_SHARED_SECRET_BYTES], DecodeError> {
    if ct.len() != KEM_CIPHERTEXT_BYTES {
        return Err(DecodeError::InvalidSize);
    }
    let ct = MlKemCt::try_from(ct).map_err(|_| DecodeError::KemFail)?;
    let ss = sk.0.decapsulate(&ct).map_err(|_| DecodeError::KemFail)?;
    let ss_bytes = ss.as_slice();
    if ss_bytes.len() != KEM_SHARED_SECRET_BYTES {
        return Err(DecodeError::KemFail);
    }
    let mut out = [0u8; KEM_SHARED_SECRET_BYTES];
    out.copy_from_slice(ss_bytes);
    Ok(out)
}

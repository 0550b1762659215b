//! Post-quantum signatures: ML-DSA-87 (FIPS 204, "Dilithium5 class").
//!
//! Kept as its own module — rather than folded into the KEM the way the
//! teacher folds X25519 into its hybrid KEM — because here confidentiality
//! and authenticity are genuinely independent keypairs (Design Notes §9,
//! "post-quantum primitive identity"). Built on `ml-dsa`, the signature
//! counterpart to [`crate::kem`]'s `ml-kem`, rather than `pqcrypto-mldsa` —
//! same reasoning as the KEM module: key generation needs a caller-supplied
//! RNG, and `ml-dsa`'s `KeyGen::key_gen` takes one directly.

extern crate alloc;
use alloc::vec::Vec;

use ml_dsa::{EncodedSignature, EncodedSigningKey, EncodedVerifyingKey, KeyGen, MlDsa87, Signature, SigningKey, VerifyingKey};
use rand_core::{CryptoRngCore, OsRng};
use signature::{Signer, Verifier};

use crate::error::DecodeError;

/// ML-DSA-87 public (verifying) key size in bytes.
pub const SIGN_PUBLIC_KEY_BYTES: usize = 2592;
/// ML-DSA-87 secret (signing) key size in bytes.
pub const SIGN_SECRET_KEY_BYTES: usize = 4896;
/// ML-DSA-87 detached signature size in bytes.
pub const SIGNATURE_BYTES: usize = 4627;

/// Signature verifying key.
#[derive(Clone)]
pub struct SignPublicKey(VerifyingKey<MlDsa87>);

impl SignPublicKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.encode().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != SIGN_PUBLIC_KEY_BYTES {
            return Err(DecodeError::InvalidSize);
        }
        let fixed: [u8; SIGN_PUBLIC_KEY_BYTES] = bytes.try_into().map_err(|_| DecodeError::InvalidSize)?;
        let encoded: EncodedVerifyingKey<MlDsa87> = fixed.into();
        Ok(Self(VerifyingKey::decode(&encoded)))
    }
}

impl PartialEq for SignPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.encode() == other.0.encode()
    }
}
impl Eq for SignPublicKey {}

/// Signature signing key.
pub struct SignSecretKey(SigningKey<MlDsa87>);

impl SignSecretKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.encode().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != SIGN_SECRET_KEY_BYTES {
            return Err(DecodeError::InvalidSize);
        }
        let fixed: [u8; SIGN_SECRET_KEY_BYTES] = bytes.try_into().map_err(|_| DecodeError::InvalidSize)?;
        let encoded: EncodedSigningKey<MlDsa87> = fixed.into();
        Ok(Self(SigningKey::decode(&encoded)))
    }
}

/// Generate a new ML-DSA-87 signing keypair from the system CSPRNG.
pub fn keygen() -> (SignPublicKey, SignSecretKey) {
    keygen_from_rng(&mut OsRng)
}

/// Generate an ML-DSA-87 signing keypair driven entirely by `rng`. See
/// [`crate::kem::keygen_from_rng`] — same rationale, same caller
/// (`Identity::generate_from_seed`), same determinism guarantee.
pub fn keygen_from_rng<R: CryptoRngCore>(rng: &mut R) -> (SignPublicKey, SignSecretKey) {
    let kp = MlDsa87::key_gen(rng);
    (SignPublicKey(kp.verifying_key().clone()), SignSecretKey(kp.signing_key().clone()))
}

/// Sign `msg`, producing a detached signature.
pub fn sign(msg: &[u8], sk: &SignSecretKey) -> Vec<u8> {
    let sig: Signature<MlDsa87> = sk.0.sign(msg);
    sig.encode().to_vec()
}

/// Verify `sig` over `msg` against `pk`.
pub fn verify(sig: &[u8], msg: &[u8], pk: &SignPublicKey) -> bool {
    if sig.len() != SIGNATURE_BYTES {
        return false;
    }
    let Ok(fixed): Result<[u8; SIGNATURE_BYTES], _> = sig.try_into() else {
        return false;
    };
    let encoded: EncodedSignature<MlDsa87> = fixed.into();
    let Ok(sig) = Signature::<MlDsa87>::decode(&encoded) else {
        return false;
    };
    pk.0.verify(msg, &sig).is_ok()
}

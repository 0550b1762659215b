//! DHT identity: the KEM + signature keypair pair an operator uses to
//! publish and read their own application state (spec.md §5).
//!
//! An [`Identity`] is a plain value — generate as many as you like, keep
//! them in a `Vec`, pass them to tests. [`DhtIdentity`] is the
//! process-wide singleton wrapper the rest of the application talks to:
//! exactly one can be `start()`-ed at a time, matching the DHT client's
//! own one-identity-per-process model.

use std::sync::{Mutex, OnceLock};

use dna_envelope::kem::{KemPublicKey, KemSecretKey};
use dna_envelope::signature::{SignPublicKey, SignSecretKey};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use sha3::{Digest, Sha3_512};

use crate::error::IdentityError;

/// Length in bytes of an exported identity: kem_sk || kem_pk || sign_sk || sign_pk.
pub const EXPORTED_IDENTITY_BYTES: usize = dna_envelope::kem::KEM_SECRET_KEY_BYTES
    + dna_envelope::kem::KEM_PUBLIC_KEY_BYTES
    + dna_envelope::signature::SIGN_SECRET_KEY_BYTES
    + dna_envelope::signature::SIGN_PUBLIC_KEY_BYTES;

/// A single identity's full keypair material.
pub struct Identity {
    pub kem_pk: KemPublicKey,
    pub kem_sk: KemSecretKey,
    pub sign_pk: SignPublicKey,
    pub sign_sk: SignSecretKey,
}

impl Identity {
    /// Generate a fresh identity from the system CSPRNG.
    pub fn generate() -> Self {
        let (kem_pk, kem_sk) = dna_envelope::kem::keygen();
        let (sign_pk, sign_sk) = dna_envelope::signature::keygen();
        Self {
            kem_pk,
            kem_sk,
            sign_pk,
            sign_sk,
        }
    }

    /// Export this identity to its binary representation.
    pub fn export(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EXPORTED_IDENTITY_BYTES);
        out.extend_from_slice(&self.kem_sk.to_bytes());
        out.extend_from_slice(&self.kem_pk.to_bytes());
        out.extend_from_slice(&self.sign_sk.to_bytes());
        out.extend_from_slice(&self.sign_pk.to_bytes());
        out
    }

    /// Export this identity alongside a certificate vouching for its keys,
    /// in the wire format used to hand an identity to another device:
    /// `u32(priv_len) || priv || u32(pub_len) || pub || u32(cert_len) || cert`,
    /// where `priv` is `kem_sk || sign_sk` and `pub` is `kem_pk || sign_pk`.
    pub fn export_with_certificate(&self, certificate: &crate::certificate::Certificate) -> Vec<u8> {
        let mut priv_bytes = Vec::new();
        priv_bytes.extend_from_slice(&self.kem_sk.to_bytes());
        priv_bytes.extend_from_slice(&self.sign_sk.to_bytes());

        let mut pub_bytes = Vec::new();
        pub_bytes.extend_from_slice(&self.kem_pk.to_bytes());
        pub_bytes.extend_from_slice(&self.sign_pk.to_bytes());

        let cert_bytes = certificate.encode();

        let mut out = Vec::with_capacity(4 + priv_bytes.len() + 4 + pub_bytes.len() + 4 + cert_bytes.len());
        out.extend_from_slice(&(priv_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&priv_bytes);
        out.extend_from_slice(&(pub_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&pub_bytes);
        out.extend_from_slice(&(cert_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&cert_bytes);
        out
    }

    /// Inverse of [`Identity::export_with_certificate`]. Verifies the
    /// embedded certificate's self-signature and that it vouches for the
    /// same keys found in the private/public sections before returning.
    pub fn import_with_certificate(bytes: &[u8]) -> Result<(Self, crate::certificate::Certificate), IdentityError> {
        let mut off = 0;
        let priv_bytes = read_len_prefixed(bytes, &mut off)?;
        let pub_bytes = read_len_prefixed(bytes, &mut off)?;
        let cert_bytes = read_len_prefixed(bytes, &mut off)?;
        if off != bytes.len() {
            return Err(IdentityError::InvalidExport);
        }

        let kem_sk_len = dna_envelope::kem::KEM_SECRET_KEY_BYTES;
        let sign_sk_len = dna_envelope::signature::SIGN_SECRET_KEY_BYTES;
        let kem_pk_len = dna_envelope::kem::KEM_PUBLIC_KEY_BYTES;
        let sign_pk_len = dna_envelope::signature::SIGN_PUBLIC_KEY_BYTES;
        if priv_bytes.len() != kem_sk_len + sign_sk_len || pub_bytes.len() != kem_pk_len + sign_pk_len {
            return Err(IdentityError::InvalidExport);
        }

        let kem_sk = KemSecretKey::from_bytes(&priv_bytes[..kem_sk_len]).map_err(|_| IdentityError::InvalidExport)?;
        let sign_sk = SignSecretKey::from_bytes(&priv_bytes[kem_sk_len..]).map_err(|_| IdentityError::InvalidExport)?;
        let kem_pk = KemPublicKey::from_bytes(&pub_bytes[..kem_pk_len]).map_err(|_| IdentityError::InvalidExport)?;
        let sign_pk = SignPublicKey::from_bytes(&pub_bytes[kem_pk_len..]).map_err(|_| IdentityError::InvalidExport)?;

        let certificate = crate::certificate::Certificate::decode(cert_bytes)?;
        certificate.verify()?;
        if certificate.kem_pk.to_bytes() != kem_pk.to_bytes() || certificate.sign_pk.to_bytes() != sign_pk.to_bytes() {
            return Err(IdentityError::CertificateInvalid);
        }

        Ok((
            Self {
                kem_pk,
                kem_sk,
                sign_pk,
                sign_sk,
            },
            certificate,
        ))
    }

    /// Import a previously exported identity.
    pub fn import(bytes: &[u8]) -> Result<Self, IdentityError> {
        if bytes.len() != EXPORTED_IDENTITY_BYTES {
            return Err(IdentityError::InvalidExport);
        }
        let mut off = 0;
        let kem_sk_len = dna_envelope::kem::KEM_SECRET_KEY_BYTES;
        let kem_pk_len = dna_envelope::kem::KEM_PUBLIC_KEY_BYTES;
        let sign_sk_len = dna_envelope::signature::SIGN_SECRET_KEY_BYTES;
        let sign_pk_len = dna_envelope::signature::SIGN_PUBLIC_KEY_BYTES;

        let kem_sk = KemSecretKey::from_bytes(&bytes[off..off + kem_sk_len])
            .map_err(|_| IdentityError::InvalidExport)?;
        off += kem_sk_len;
        let kem_pk = KemPublicKey::from_bytes(&bytes[off..off + kem_pk_len])
            .map_err(|_| IdentityError::InvalidExport)?;
        off += kem_pk_len;
        let sign_sk = SignSecretKey::from_bytes(&bytes[off..off + sign_sk_len])
            .map_err(|_| IdentityError::InvalidExport)?;
        off += sign_sk_len;
        let sign_pk = SignPublicKey::from_bytes(&bytes[off..off + sign_pk_len])
            .map_err(|_| IdentityError::InvalidExport)?;

        Ok(Self {
            kem_pk,
            kem_sk,
            sign_pk,
            sign_sk,
        })
    }

    /// 128-hex-character fingerprint: `hex(SHA3-512(kem_pk || sign_pk))`.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha3_512::new();
        hasher.update(self.kem_pk.to_bytes());
        hasher.update(self.sign_pk.to_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate an identity deterministically from a 32-byte seed, for
    /// BIP-39-style recovery: the same seed reproduces the same keypair on
    /// any device, not merely the same recovery phrase. `seed` is both the
    /// BIP-39 entropy behind the returned mnemonic and the seed for a
    /// `ChaCha20Rng` that drives both keygens in sequence — KEM first,
    /// then signature — so two calls with the same seed are bit-identical
    /// in their key material, and therefore their [`Identity::fingerprint`].
    pub fn generate_from_seed(seed: &[u8; 32]) -> Result<(Self, String), IdentityError> {
        let mnemonic = bip39::Mnemonic::from_entropy(seed)
            .map_err(|e| IdentityError::InvalidSeedPhrase(e.to_string()))?;

        let mut rng = ChaCha20Rng::from_seed(*seed);
        let (kem_pk, kem_sk) = dna_envelope::kem::keygen_from_rng(&mut rng);
        let (sign_pk, sign_sk) = dna_envelope::signature::keygen_from_rng(&mut rng);

        Ok((
            Self {
                kem_pk,
                kem_sk,
                sign_pk,
                sign_sk,
            },
            mnemonic.to_string(),
        ))
    }
}

fn read_len_prefixed<'a>(bytes: &'a [u8], off: &mut usize) -> Result<&'a [u8], IdentityError> {
    if bytes.len() < *off + 4 {
        return Err(IdentityError::InvalidExport);
    }
    let len = u32::from_be_bytes(bytes[*off..*off + 4].try_into().unwrap()) as usize;
    *off += 4;
    let end = off.checked_add(len).ok_or(IdentityError::InvalidExport)?;
    if end > bytes.len() {
        return Err(IdentityError::InvalidExport);
    }
    let slice = &bytes[*off..end];
    *off = end;
    Ok(slice)
}

/// Lifecycle state of the process-wide [`DhtIdentity`] singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    New,
    Started,
    Shutdown,
}

struct Slot {
    state: LifecycleState,
    identity: Option<Identity>,
}

/// Process-wide identity singleton. The DHT client is one identity per
/// process, so unlike [`Identity`] itself (a plain value you can create
/// many of for tests), this type enforces the `new -> started ->
/// shutdown` lifecycle the rest of the application observes.
pub struct DhtIdentity;

static SLOT: OnceLock<Mutex<Slot>> = OnceLock::new();

fn slot() -> &'static Mutex<Slot> {
    SLOT.get_or_init(|| {
        Mutex::new(Slot {
            state: LifecycleState::New,
            identity: None,
        })
    })
}

impl DhtIdentity {
    /// Start the singleton with a freshly generated identity. Fails if
    /// already started.
    pub fn start_new() -> Result<(), IdentityError> {
        Self::start_with(Identity::generate())
    }

    /// Start the singleton with a caller-provided identity (e.g. one
    /// recovered from a backup or a seed phrase). Fails if already
    /// started.
    pub fn start_with(identity: Identity) -> Result<(), IdentityError> {
        let mut slot = slot().lock().expect("identity slot poisoned");
        if slot.state == LifecycleState::Started {
            return Err(IdentityError::AlreadyStarted);
        }
        slot.identity = Some(identity);
        slot.state = LifecycleState::Started;
        tracing::info!("dht identity started");
        Ok(())
    }

    /// Run `f` with a reference to the started identity.
    pub fn with<R>(f: impl FnOnce(&Identity) -> R) -> Result<R, IdentityError> {
        let slot = slot().lock().expect("identity slot poisoned");
        match (&slot.state, &slot.identity) {
            (LifecycleState::Started, Some(identity)) => Ok(f(identity)),
            _ => Err(IdentityError::NotStarted),
        }
    }

    /// Tear down the singleton, dropping its key material.
    pub fn shutdown() -> Result<(), IdentityError> {
        let mut slot = slot().lock().expect("identity slot poisoned");
        if slot.state != LifecycleState::Started {
            return Err(IdentityError::NotStarted);
        }
        slot.identity = None;
        slot.state = LifecycleState::Shutdown;
        tracing::info!("dht identity shut down");
        Ok(())
    }

    pub fn state() -> LifecycleState {
        slot().lock().expect("identity slot poisoned").state
    }
}

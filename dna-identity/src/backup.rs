//! Encrypted local identity backup.
//!
//! An [`Identity`] holds a recipient's own KEM secret key, so the normal
//! self-encryption protocol can't protect the identity's *own* backup —
//! decrypting it would require the very key it is trying to protect.
//! Instead the backup file is wrapped with a key derived from a BIP-39
//! recovery phrase (HKDF-SHA256 over the mnemonic seed), the same way a
//! passphrase-protected SSH key wraps its private key material. The
//! wrapped file is written with owner-only permissions as a second line
//! of defense.

use std::path::{Path, PathBuf};

use bip39::Mnemonic;
use dna_envelope::aead;
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::IdentityError;
use crate::identity::Identity;

const BACKUP_KDF_INFO: &[u8] = b"dna-identity-backup-v1";

fn derive_wrap_key(phrase: &str) -> Result<[u8; 32], IdentityError> {
    let mnemonic = Mnemonic::parse(phrase)
        .map_err(|e| IdentityError::InvalidSeedPhrase(e.to_string()))?;
    let seed = mnemonic.to_seed("");
    let hk = Hkdf::<Sha256>::new(None, &seed);
    let mut key = [0u8; 32];
    hk.expand(BACKUP_KDF_INFO, &mut key)
        .map_err(|_| IdentityError::InvalidSeedPhrase("HKDF expand failed".into()))?;
    Ok(key)
}

/// Wrap `identity`'s exported bytes with a key derived from `phrase`.
/// Format: `nonce[12] || aead_ct`.
pub fn wrap(identity: &Identity, phrase: &str) -> Result<Vec<u8>, IdentityError> {
    let key = derive_wrap_key(phrase)?;
    let nonce = aead::random_nonce()?;
    let plaintext = identity.export();
    let ct = aead::seal(&key, &nonce, &plaintext, identity.fingerprint().as_bytes())?;

    let mut out = Vec::with_capacity(12 + ct.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ct);
    Ok(out)
}

/// Inverse of [`wrap`]. `expected_fingerprint` is used as the associated
/// data that must match — it binds the wrapped blob to the identity it
/// claims to hold, so a swapped file fails loudly instead of silently
/// importing the wrong identity.
pub fn unwrap(bytes: &[u8], phrase: &str, expected_fingerprint: &str) -> Result<Identity, IdentityError> {
    if bytes.len() < 12 {
        return Err(IdentityError::InvalidExport);
    }
    let key = derive_wrap_key(phrase)?;
    let (nonce, ct) = bytes.split_at(12);
    let nonce: [u8; 12] = nonce.try_into().map_err(|_| IdentityError::InvalidExport)?;
    let plaintext = aead::open(&key, &nonce, ct, expected_fingerprint.as_bytes())?;
    Identity::import(&plaintext)
}

/// Self-encrypt `identity`'s exported bytes to its own KEM public key —
/// the literal wire format spec.md §6.2 calls "identity backup wrapping":
/// `kem_ct(1568) || iv(12) || tag(16) || aead_ct`, with no outer envelope
/// or extra signature (the AEAD tag is the only integrity check this kind
/// carries). This is the form published to the DHT (see
/// `dna-core`'s `state::identity_backup`); a device recovering an identity
/// must already hold a matching `kem_sk` (e.g. one it regenerated from the
/// same seed phrase via [`Identity::generate_from_seed`]'s returned phrase
/// plus a previously-escrowed [`wrap`]) before this blob becomes useful.
pub fn seal_self(identity: &Identity) -> Result<Vec<u8>, IdentityError> {
    let (shared_secret, kem_ct) = dna_envelope::kem::encapsulate(&identity.kem_pk)?;
    let nonce = aead::random_nonce()?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&shared_secret);
    let plaintext = identity.export();
    let aead_ct = aead::seal(&key, &nonce, &plaintext, &[])?;
    Ok(dna_envelope::wire::encode(&kem_ct, &nonce, &aead_ct))
}

/// Inverse of [`seal_self`]: decapsulate with `kem_sk`, open the AEAD, and
/// import the recovered identity bytes.
pub fn open_self(kem_sk: &dna_envelope::kem::KemSecretKey, bytes: &[u8]) -> Result<Identity, IdentityError> {
    let parts = dna_envelope::wire::decode(bytes)?;
    let shared_secret = dna_envelope::kem::decapsulate(kem_sk, parts.kem_ciphertext)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&shared_secret);
    let plaintext = aead::open(&key, parts.nonce, parts.aead_ciphertext, &[])?;
    Identity::import(&plaintext)
}

fn backup_dir(base_dir: Option<&Path>) -> Result<PathBuf, IdentityError> {
    if let Some(dir) = base_dir {
        return Ok(dir.to_path_buf());
    }
    let home = dirs::home_dir().ok_or(IdentityError::NoHomeDirectory)?;
    Ok(home.join(".dna"))
}

fn backup_path(dir: &Path, fingerprint: &str) -> PathBuf {
    dir.join(format!("{fingerprint}_dht_identity.enc"))
}

/// Write `identity`'s wrapped backup to `<base_dir or $HOME/.dna>/<fingerprint>_dht_identity.enc`.
pub async fn save(identity: &Identity, phrase: &str, base_dir: Option<&Path>) -> Result<PathBuf, IdentityError> {
    let dir = backup_dir(base_dir)?;
    tokio::fs::create_dir_all(&dir).await?;
    let path = backup_path(&dir, &identity.fingerprint());
    let wrapped = wrap(identity, phrase)?;

    tokio::fs::write(&path, &wrapped).await?;
    set_owner_only(&path).await?;

    tracing::info!(path = %path.display(), "identity backup written");
    Ok(path)
}

/// Load and unwrap a previously saved backup for `fingerprint`.
pub async fn load(fingerprint: &str, phrase: &str, base_dir: Option<&Path>) -> Result<Identity, IdentityError> {
    let dir = backup_dir(base_dir)?;
    let path = backup_path(&dir, fingerprint);
    let bytes = tokio::fs::read(&path).await?;
    unwrap(&bytes, phrase, fingerprint)
}

#[cfg(unix)]
async fn set_owner_only(path: &Path) -> Result<(), IdentityError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_owner_only(_path: &Path) -> Result<(), IdentityError> {
    Ok(())
}

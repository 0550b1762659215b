//! A self-attested certificate binding an identity's public keys to a
//! short human-readable node name, so peers can show something more
//! legible than a 128-character fingerprint while still being able to
//! verify it against the fingerprint if they care to.

use dna_envelope::kem::KemPublicKey;
use dna_envelope::signature::{self, SignPublicKey};

use crate::error::IdentityError;
use crate::identity::Identity;

/// Maximum byte length of a certificate's node name.
pub const MAX_NODE_NAME_BYTES: usize = 64;

pub struct Certificate {
    pub node_name: String,
    pub kem_pk: KemPublicKey,
    pub sign_pk: SignPublicKey,
    pub issued_at_s: u64,
    pub signature: Vec<u8>,
}

impl Certificate {
    fn signed_bytes(node_name: &str, kem_pk: &KemPublicKey, sign_pk: &SignPublicKey, issued_at_s: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(node_name.as_bytes());
        buf.extend_from_slice(&kem_pk.to_bytes());
        buf.extend_from_slice(&sign_pk.to_bytes());
        buf.extend_from_slice(&issued_at_s.to_be_bytes());
        buf
    }

    /// Verify the certificate's self-signature.
    pub fn verify(&self) -> Result<(), IdentityError> {
        let signed = Self::signed_bytes(&self.node_name, &self.kem_pk, &self.sign_pk, self.issued_at_s);
        if signature::verify(&self.signature, &signed, &self.sign_pk) {
            Ok(())
        } else {
            Err(IdentityError::CertificateInvalid)
        }
    }

    /// This certificate's fingerprint, computed the same way as
    /// [`Identity::fingerprint`] so the two are directly comparable.
    pub fn fingerprint(&self) -> String {
        use sha3::{Digest, Sha3_512};
        let mut hasher = Sha3_512::new();
        hasher.update(self.kem_pk.to_bytes());
        hasher.update(self.sign_pk.to_bytes());
        hex::encode(hasher.finalize())
    }

    /// Encode to bytes: `u16(name_len) || name || kem_pk || sign_pk ||
    /// issued_at_s[8] || u16(sig_len) || sig`.
    pub fn encode(&self) -> Vec<u8> {
        let name = self.node_name.as_bytes();
        let mut out = Vec::with_capacity(
            2 + name.len() + self.kem_pk.to_bytes().len() + self.sign_pk.to_bytes().len() + 8 + 2 + self.signature.len(),
        );
        out.extend_from_slice(&(name.len() as u16).to_be_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(&self.kem_pk.to_bytes());
        out.extend_from_slice(&self.sign_pk.to_bytes());
        out.extend_from_slice(&self.issued_at_s.to_be_bytes());
        out.extend_from_slice(&(self.signature.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.signature);
        out
    }

    /// Inverse of [`Certificate::encode`]. Does not verify the signature —
    /// call [`Certificate::verify`] once decoded.
    pub fn decode(bytes: &[u8]) -> Result<Self, IdentityError> {
        let mut off = 0;
        let name_len = read_u16(bytes, &mut off)? as usize;
        let node_name = read_bytes(bytes, &mut off, name_len)
            .and_then(|b| String::from_utf8(b.to_vec()).map_err(|_| IdentityError::InvalidExport))?;
        let kem_pk = KemPublicKey::from_bytes(read_bytes(bytes, &mut off, dna_envelope::kem::KEM_PUBLIC_KEY_BYTES)?)
            .map_err(|_| IdentityError::InvalidExport)?;
        let sign_pk = SignPublicKey::from_bytes(read_bytes(bytes, &mut off, dna_envelope::signature::SIGN_PUBLIC_KEY_BYTES)?)
            .map_err(|_| IdentityError::InvalidExport)?;
        let issued_at_s = u64::from_be_bytes(
            read_bytes(bytes, &mut off, 8)?
                .try_into()
                .map_err(|_| IdentityError::InvalidExport)?,
        );
        let sig_len = read_u16(bytes, &mut off)? as usize;
        let signature = read_bytes(bytes, &mut off, sig_len)?.to_vec();
        if off != bytes.len() {
            return Err(IdentityError::InvalidExport);
        }
        Ok(Certificate {
            node_name,
            kem_pk,
            sign_pk,
            issued_at_s,
            signature,
        })
    }
}

fn read_u16(bytes: &[u8], off: &mut usize) -> Result<u16, IdentityError> {
    let raw = read_bytes(bytes, off, 2)?;
    Ok(u16::from_be_bytes([raw[0], raw[1]]))
}

fn read_bytes<'a>(bytes: &'a [u8], off: &mut usize, len: usize) -> Result<&'a [u8], IdentityError> {
    let end = off.checked_add(len).ok_or(IdentityError::InvalidExport)?;
    if end > bytes.len() {
        return Err(IdentityError::InvalidExport);
    }
    let slice = &bytes[*off..end];
    *off = end;
    Ok(slice)
}

/// Issue a certificate for `identity`, truncating `node_name` to
/// [`MAX_NODE_NAME_BYTES`] bytes.
pub fn issue(identity: &Identity, node_name: &str, issued_at_s: u64) -> Certificate {
    let mut name = node_name.to_string();
    if name.len() > MAX_NODE_NAME_BYTES {
        name.truncate(MAX_NODE_NAME_BYTES);
    }
    let signed = Certificate::signed_bytes(&name, &identity.kem_pk, &identity.sign_pk, issued_at_s);
    let signature = signature::sign(&signed, &identity.sign_sk);
    Certificate {
        node_name: name,
        kem_pk: identity.kem_pk.clone(),
        sign_pk: identity.sign_pk.clone(),
        issued_at_s,
        signature,
    }
}

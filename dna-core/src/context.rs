//! `CoreContext` — the explicit replacement for the implicit
//! module-level globals (DHT client handle, identity, logger) the
//! original design note calls out. Constructed once at startup and
//! threaded through every state-kind and driver call; subsystems pull
//! only what they need from it.

use std::sync::Arc;

use dna_envelope::kem::{KemPublicKey, KemSecretKey};
use dna_envelope::signature::{SignPublicKey, SignSecretKey};
use dna_identity::Identity;

use crate::dht::Dht;

pub struct CoreContext {
    pub dht: Arc<dyn Dht>,
    pub identity: Arc<Identity>,
}

impl CoreContext {
    pub fn new(dht: Arc<dyn Dht>, identity: Arc<Identity>) -> Self {
        Self { dht, identity }
    }

    pub fn dht(&self) -> &dyn Dht {
        self.dht.as_ref()
    }

    pub fn kem_pk(&self) -> &KemPublicKey {
        &self.identity.kem_pk
    }

    pub fn kem_sk(&self) -> &KemSecretKey {
        &self.identity.kem_sk
    }

    pub fn sign_pk(&self) -> &SignPublicKey {
        &self.identity.sign_pk
    }

    pub fn sign_sk(&self) -> &SignSecretKey {
        &self.identity.sign_sk
    }

    pub fn fingerprint(&self) -> String {
        self.identity.fingerprint()
    }

    /// This context's own self-encryption identity view — both KEM and
    /// signature keypairs belong to the same identity, as self-encrypted
    /// state requires.
    pub fn self_encrypt_identity(&self) -> dna_envelope::SelfEncryptIdentity<'_> {
        dna_envelope::SelfEncryptIdentity {
            kem_pk: self.kem_pk(),
            kem_sk: self.kem_sk(),
            sign_pk: self.sign_pk(),
            sign_sk: self.sign_sk(),
        }
    }
}

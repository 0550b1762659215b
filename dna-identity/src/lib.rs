//! DHT identity lifecycle: keypair generation, binary export/import,
//! fingerprinting, self-attested certificates, and encrypted local
//! backup. Built on [`dna_envelope`]'s KEM and signature primitives.

pub mod backup;
pub mod certificate;
pub mod error;
pub mod identity;

pub use certificate::{issue as issue_certificate, Certificate};
pub use error::IdentityError;
pub use identity::{DhtIdentity, Identity, LifecycleState};

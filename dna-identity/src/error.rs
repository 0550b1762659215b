use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity already started")]
    AlreadyStarted,
    #[error("identity not started")]
    NotStarted,
    #[error("invalid exported identity bytes")]
    InvalidExport,
    #[error("bip39 seed phrase invalid: {0}")]
    InvalidSeedPhrase(String),
    #[error("backup directory could not be resolved")]
    NoHomeDirectory,
    #[error("backup io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backup envelope decode failed: {0}")]
    Decode(#[from] dna_envelope::DecodeError),
    #[error("backup envelope encode failed: {0}")]
    Encode(#[from] dna_envelope::EncodeError),
    #[error("certificate signature invalid")]
    CertificateInvalid,
}

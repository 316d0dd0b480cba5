//! Envelope error types

use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Every decryption failure collapses into this variant, whatever the cause.
    #[error("Wrong passphrase")]
    WrongPassphrase,

    #[error("Invalid key derivation parameters: {0}")]
    InvalidParams(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Encryption failed")]
    Encryption,
}

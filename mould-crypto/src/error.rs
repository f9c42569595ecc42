//! Credential codec error types.

use thiserror::Error;

/// Result type for codec operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while sealing or opening a credential envelope.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid PIN: {0}")]
    InvalidPin(String),

    #[error("credential field must not be empty: {0}")]
    EmptyField(&'static str),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("malformed envelope: {0}")]
    Envelope(String),

    #[error("invalid base64 in envelope field `{field}`: {reason}")]
    Base64 { field: &'static str, reason: String },

    #[error("invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    CiphertextLength(usize),

    #[error("invalid padding (wrong PIN or tampered envelope)")]
    Padding,

    #[error("invalid credential payload: {0}")]
    Payload(String),

    #[error("self-test failed: {0}")]
    SelfTest(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

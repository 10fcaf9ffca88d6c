//! Error types for the notary core.

use thiserror::Error;

/// Core errors raised while parsing or verifying primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid document hash: {0}")]
    InvalidDocumentHash(String),

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("invalid session token: {0}")]
    InvalidToken(String),

    #[error("incomplete notarization record: missing {0}")]
    IncompleteRecord(&'static str),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

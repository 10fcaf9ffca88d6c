//! Error types for the envelope module.

use thiserror::Error;

/// Errors that can occur while sealing or opening envelopes.
///
/// Opening never says why it failed: wrong recipient, wrong sender key,
/// forged signature and tampered ciphertext all collapse into `Rejected`.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope did not open under the given keys.
    #[error("envelope rejected")]
    Rejected,

    /// The envelope bytes could not be parsed.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// Encryption failed while sealing.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Plaintext (de)serialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Invalid public identity encoding.
    #[error("invalid public identity: {0}")]
    InvalidIdentity(String),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;

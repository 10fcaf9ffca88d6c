//! # Notary Envelope
//!
//! Sender-authenticated encryption for notary requests and responses.
//!
//! ## Design
//!
//! - Each account holds an Ed25519 signing key and an X25519 exchange key
//!   ([`PublicIdentity`]); its address is derived from both.
//! - Sealing uses a fresh ephemeral X25519 key, Blake3 key derivation and
//!   ChaCha20-Poly1305, then signs the transcript with the sender's key.
//! - Opening checks address binding and signature before decrypting. Every
//!   failure is the same [`EnvelopeError::Rejected`].

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod identity;

pub use crypto::{EncryptionNonce, X25519PublicKey, X25519StaticSecret};
pub use envelope::{SecureEnvelope, ENVELOPE_VERSION};
pub use error::{EnvelopeError, Result};
pub use identity::{EnvelopeIdentity, PublicIdentity};

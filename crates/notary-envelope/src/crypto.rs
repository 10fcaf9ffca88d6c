//! Key agreement and authenticated encryption for envelopes.
//!
//! Each envelope gets its own key. The sender agrees a one-time X25519
//! secret with the recipient's exchange key; both sides then derive the
//! ChaCha20-Poly1305 key with Blake3, bound to the sender address and both
//! public keys.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret, StaticSecret};

use notary_core::Address;

use crate::error::{EnvelopeError, Result};

/// Blake3 derive-key context for envelope encryption keys.
const KDF_CONTEXT: &str = "notary-envelope-v1 encryption";

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Pub({})", &hex::encode(self.0)[..16])
    }
}

/// The secret half of an identity's exchange key.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(StaticSecret::from(bytes))
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(*PublicKey::from(&self.0).as_bytes())
    }
}

/// The 96-bit AEAD nonce carried in an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    fn random() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// The symmetric key of a single envelope.
pub(crate) struct EnvelopeKey([u8; 32]);

impl EnvelopeKey {
    /// Sender side: agree a fresh ephemeral secret with `recipient`.
    ///
    /// Returns the ephemeral public key to ship in the envelope.
    pub(crate) fn for_recipient(
        sender: &Address,
        recipient: &X25519PublicKey,
    ) -> Result<(X25519PublicKey, Self)> {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral = X25519PublicKey(*PublicKey::from(&secret).as_bytes());
        let shared = secret.diffie_hellman(&PublicKey::from(recipient.0));

        let key = Self::derive(&shared, sender, &ephemeral, recipient).ok_or_else(|| {
            EnvelopeError::EncryptionError("recipient exchange key is low-order".into())
        })?;
        Ok((ephemeral, key))
    }

    /// Recipient side: recover the key from the envelope's ephemeral key.
    pub(crate) fn from_ephemeral(
        recipient: &X25519StaticSecret,
        sender: &Address,
        ephemeral: &X25519PublicKey,
    ) -> Result<Self> {
        let shared = recipient.0.diffie_hellman(&PublicKey::from(ephemeral.0));
        Self::derive(&shared, sender, ephemeral, &recipient.public_key())
            .ok_or(EnvelopeError::Rejected)
    }

    /// `None` when the peer key is a low-order point.
    fn derive(
        shared: &SharedSecret,
        sender: &Address,
        ephemeral: &X25519PublicKey,
        recipient: &X25519PublicKey,
    ) -> Option<Self> {
        if !shared.was_contributory() {
            return None;
        }

        let sender = sender.as_str().as_bytes();
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
        hasher.update(shared.as_bytes());
        hasher.update(&(sender.len() as u16).to_be_bytes());
        hasher.update(sender);
        hasher.update(ephemeral.as_bytes());
        hasher.update(recipient.as_bytes());
        Some(Self(*hasher.finalize().as_bytes()))
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Encrypt under a fresh random nonce.
    pub(crate) fn encrypt(&self, plaintext: &[u8]) -> Result<(EncryptionNonce, Vec<u8>)> {
        let nonce = EncryptionNonce::random();
        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| EnvelopeError::EncryptionError(e.to_string()))?;
        Ok((nonce, ciphertext))
    }

    /// Any failure, including a tag mismatch, is [`EnvelopeError::Rejected`].
    pub(crate) fn decrypt(&self, nonce: &EncryptionNonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| EnvelopeError::Rejected)
    }
}

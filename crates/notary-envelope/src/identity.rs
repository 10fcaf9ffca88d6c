//! Account key material.
//!
//! An account is known by two public keys: an Ed25519 key that signs
//! envelopes and an X25519 key that envelopes are encrypted to. Its
//! [`Address`] is derived from both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use notary_core::{Address, Ed25519PublicKey, Ed25519Signature, Keypair};

use crate::crypto::{X25519PublicKey, X25519StaticSecret};
use crate::error::EnvelopeError;

/// Blake3 derive-key context for the exchange secret of a seeded identity.
const EXCHANGE_SEED_CONTEXT: &str = "notary-envelope-v1 exchange seed";

/// The public half of an account identity.
///
/// Encoded as 128 hex characters: signing key followed by exchange key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicIdentity {
    /// Verifies envelope signatures.
    pub signing: Ed25519PublicKey,
    /// Envelopes to this identity are encrypted against it.
    pub exchange: X25519PublicKey,
}

impl PublicIdentity {
    /// Pair up a signing key and an exchange key.
    pub const fn new(signing: Ed25519PublicKey, exchange: X25519PublicKey) -> Self {
        Self { signing, exchange }
    }

    /// The address this identity owns.
    pub fn address(&self) -> Address {
        Address::derive(&self.signing, self.exchange.as_bytes())
    }

    /// Check that `address` was derived from this identity.
    pub fn owns(&self, address: &Address) -> bool {
        self.address() == *address
    }

    /// Encode as 128 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(128);
        out.push_str(&self.signing.to_hex());
        out.push_str(&hex::encode(self.exchange.as_bytes()));
        out
    }

    /// Parse the 128-character hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, EnvelopeError> {
        let mut raw = [0u8; 64];
        hex::decode_to_slice(s, &mut raw)
            .map_err(|e| EnvelopeError::InvalidIdentity(e.to_string()))?;

        let mut signing = [0u8; 32];
        let mut exchange = [0u8; 32];
        signing.copy_from_slice(&raw[..32]);
        exchange.copy_from_slice(&raw[32..]);

        Ok(Self {
            signing: Ed25519PublicKey::from_bytes(signing),
            exchange: X25519PublicKey::from_bytes(exchange),
        })
    }
}

impl fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicIdentity")
            .field("signing", &self.signing)
            .field("exchange", &self.exchange)
            .finish()
    }
}

impl fmt::Display for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PublicIdentity {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for PublicIdentity {
    type Error = EnvelopeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<PublicIdentity> for String {
    fn from(id: PublicIdentity) -> Self {
        id.to_hex()
    }
}

/// A full identity: signing keypair plus exchange secret.
///
/// Held by the server for its own key and by clients for theirs.
pub struct EnvelopeIdentity {
    signing: Keypair,
    exchange: X25519StaticSecret,
}

impl EnvelopeIdentity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self {
            signing: Keypair::generate(),
            exchange: X25519StaticSecret::generate(),
        }
    }

    /// Deterministically derive an identity from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let exchange_seed = blake3::derive_key(EXCHANGE_SEED_CONTEXT, seed);
        Self {
            signing: Keypair::from_seed(seed),
            exchange: X25519StaticSecret::from_bytes(exchange_seed),
        }
    }

    /// Build from existing key material.
    pub fn from_parts(signing: Keypair, exchange: X25519StaticSecret) -> Self {
        Self { signing, exchange }
    }

    /// The public half.
    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity::new(self.signing.public_key(), self.exchange.public_key())
    }

    /// The address this identity owns.
    pub fn address(&self) -> Address {
        self.public_identity().address()
    }

    /// Sign a message with the signing key.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.signing.sign(message)
    }

    /// The signing keypair.
    pub fn keypair(&self) -> &Keypair {
        &self.signing
    }

    pub(crate) fn exchange_secret(&self) -> &X25519StaticSecret {
        &self.exchange
    }
}

impl fmt::Debug for EnvelopeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvelopeIdentity({})", self.address())
    }
}

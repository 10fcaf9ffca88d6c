//! Sender-authenticated encrypted envelopes.
//!
//! Every sensitive request and response body travels inside a
//! [`SecureEnvelope`]. Sealing encrypts to the recipient's exchange key with
//! a one-time ephemeral key and signs the result with the sender's signing
//! key. Opening is a single check that fails closed: the caller supplies the
//! identity it resolved for the claimed sender address, and any mismatch
//! yields [`EnvelopeError::Rejected`].
//!
//! ## Wire format
//!
//! CBOR map of `version`, `sender`, `ephemeral`, `nonce`, `ciphertext` and
//! `signature`. The signature covers
//!
//! ```text
//! "notary-envelope-v1 signature" || version || len(sender) || sender
//!   || recipient_exchange || ephemeral || nonce || ciphertext
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use notary_core::{Address, Ed25519Signature};

use crate::crypto::{EncryptionNonce, EnvelopeKey, X25519PublicKey};
use crate::error::{EnvelopeError, Result};
use crate::identity::{EnvelopeIdentity, PublicIdentity};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

const SIGNATURE_DOMAIN: &[u8] = b"notary-envelope-v1 signature";

/// An encrypted, sender-bound container for a request or response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureEnvelope {
    /// Format version.
    pub version: u8,

    /// Address the sender claims to own.
    pub sender: Address,

    /// One-time X25519 public key used for this envelope.
    pub ephemeral: X25519PublicKey,

    /// AEAD nonce.
    pub nonce: EncryptionNonce,

    /// ChaCha20-Poly1305 ciphertext including the tag.
    pub ciphertext: Vec<u8>,

    /// Sender's Ed25519 signature over the transcript.
    pub signature: Ed25519Signature,
}

impl SecureEnvelope {
    /// Seal `plaintext` from `sender` to `recipient`.
    pub fn seal(
        sender: &EnvelopeIdentity,
        recipient: &PublicIdentity,
        plaintext: &[u8],
    ) -> Result<Self> {
        let sender_address = sender.address();
        let (ephemeral_public, key) =
            EnvelopeKey::for_recipient(&sender_address, &recipient.exchange)?;
        let (nonce, ciphertext) = key.encrypt(plaintext)?;

        let transcript = transcript(
            ENVELOPE_VERSION,
            &sender_address,
            &recipient.exchange,
            &ephemeral_public,
            &nonce,
            &ciphertext,
        );
        let signature = sender.sign(&transcript);

        Ok(Self {
            version: ENVELOPE_VERSION,
            sender: sender_address,
            ephemeral: ephemeral_public,
            nonce,
            ciphertext,
            signature,
        })
    }

    /// Serialize `value` as JSON and seal it.
    pub fn seal_json<T: Serialize>(
        sender: &EnvelopeIdentity,
        recipient: &PublicIdentity,
        value: &T,
    ) -> Result<Self> {
        let plaintext = serde_json::to_vec(value)
            .map_err(|e| EnvelopeError::SerializationError(e.to_string()))?;
        Self::seal(sender, recipient, &plaintext)
    }

    /// Open an envelope addressed to `recipient`, claimed to come from the
    /// holder of `sender_identity`.
    ///
    /// The signature is checked before any decryption is attempted.
    pub fn open(
        &self,
        recipient: &EnvelopeIdentity,
        sender_identity: &PublicIdentity,
    ) -> Result<Vec<u8>> {
        if self.version != ENVELOPE_VERSION {
            return Err(EnvelopeError::Rejected);
        }
        if !sender_identity.owns(&self.sender) {
            return Err(EnvelopeError::Rejected);
        }

        let recipient_exchange = recipient.public_identity().exchange;
        let transcript = transcript(
            self.version,
            &self.sender,
            &recipient_exchange,
            &self.ephemeral,
            &self.nonce,
            &self.ciphertext,
        );
        sender_identity
            .signing
            .verify(&transcript, &self.signature)
            .map_err(|_| EnvelopeError::Rejected)?;

        EnvelopeKey::from_ephemeral(recipient.exchange_secret(), &self.sender, &self.ephemeral)?
            .decrypt(&self.nonce, &self.ciphertext)
    }

    /// Open and parse a JSON body.
    ///
    /// A body that decrypts but does not parse is also `Rejected`.
    pub fn open_json<T: DeserializeOwned>(
        &self,
        recipient: &EnvelopeIdentity,
        sender_identity: &PublicIdentity,
    ) -> Result<T> {
        let plaintext = self.open(recipient, sender_identity)?;
        serde_json::from_slice(&plaintext).map_err(|_| EnvelopeError::Rejected)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| EnvelopeError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }
}

fn transcript(
    version: u8,
    sender: &Address,
    recipient_exchange: &X25519PublicKey,
    ephemeral: &X25519PublicKey,
    nonce: &EncryptionNonce,
    ciphertext: &[u8],
) -> Vec<u8> {
    let sender = sender.as_str().as_bytes();
    let mut buf = Vec::with_capacity(
        SIGNATURE_DOMAIN.len() + 3 + sender.len() + 64 + 12 + ciphertext.len(),
    );
    buf.extend_from_slice(SIGNATURE_DOMAIN);
    buf.push(version);
    buf.extend_from_slice(&(sender.len() as u16).to_be_bytes());
    buf.extend_from_slice(sender);
    buf.extend_from_slice(recipient_exchange.as_bytes());
    buf.extend_from_slice(ephemeral.as_bytes());
    buf.extend_from_slice(nonce.as_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pair() -> (EnvelopeIdentity, EnvelopeIdentity) {
        (
            EnvelopeIdentity::from_seed(&[1u8; 32]),
            EnvelopeIdentity::from_seed(&[2u8; 32]),
        )
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (client, server) = pair();
        let envelope =
            SecureEnvelope::seal(&client, &server.public_identity(), b"hello notary").unwrap();

        assert_eq!(envelope.sender, client.address());
        let opened = envelope.open(&server, &client.public_identity()).unwrap();
        assert_eq!(opened, b"hello notary");
    }

    #[test]
    fn test_wrong_recipient_rejected() {
        let (client, server) = pair();
        let eve = EnvelopeIdentity::generate();
        let envelope = SecureEnvelope::seal(&client, &server.public_identity(), b"x").unwrap();

        assert!(matches!(
            envelope.open(&eve, &client.public_identity()),
            Err(EnvelopeError::Rejected)
        ));
    }

    #[test]
    fn test_wrong_sender_key_rejected() {
        let (client, server) = pair();
        let other = EnvelopeIdentity::generate();
        let envelope = SecureEnvelope::seal(&client, &server.public_identity(), b"x").unwrap();

        assert!(matches!(
            envelope.open(&server, &other.public_identity()),
            Err(EnvelopeError::Rejected)
        ));
    }

    #[test]
    fn test_forged_sender_address_rejected() {
        let (client, server) = pair();
        let victim = EnvelopeIdentity::generate();

        // Attacker seals with its own key but claims the victim's address.
        let mut envelope =
            SecureEnvelope::seal(&client, &server.public_identity(), b"x").unwrap();
        envelope.sender = victim.address();

        assert!(envelope.open(&server, &victim.public_identity()).is_err());
        assert!(envelope.open(&server, &client.public_identity()).is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let (client, server) = pair();
        let mut envelope = SecureEnvelope::seal(&client, &server.public_identity(), b"x").unwrap();
        envelope.version = 2;

        assert!(matches!(
            envelope.open(&server, &client.public_identity()),
            Err(EnvelopeError::Rejected)
        ));
    }

    #[test]
    fn test_cbor_roundtrip() {
        let (client, server) = pair();
        let envelope =
            SecureEnvelope::seal(&client, &server.public_identity(), b"payload").unwrap();

        let bytes = envelope.to_bytes().unwrap();
        let recovered = SecureEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(recovered, envelope);
        assert_eq!(
            recovered.open(&server, &client.public_identity()).unwrap(),
            b"payload"
        );
    }

    #[test]
    fn test_garbage_bytes_are_malformed() {
        assert!(matches!(
            SecureEnvelope::from_bytes(&[0xff, 0x00, 0x13]),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn test_json_body_roundtrip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Body {
            nonce: String,
        }

        let (client, server) = pair();
        let body = Body {
            nonce: "abc".into(),
        };
        let envelope =
            SecureEnvelope::seal_json(&client, &server.public_identity(), &body).unwrap();

        let opened: Body = envelope
            .open_json(&server, &client.public_identity())
            .unwrap();
        assert_eq!(opened, body);
    }

    #[test]
    fn test_non_json_body_rejected() {
        let (client, server) = pair();
        let envelope =
            SecureEnvelope::seal(&client, &server.public_identity(), b"not json").unwrap();

        let result: Result<serde_json::Value> =
            envelope.open_json(&server, &client.public_identity());
        assert!(matches!(result, Err(EnvelopeError::Rejected)));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let (client, server) = pair();
            let envelope =
                SecureEnvelope::seal(&client, &server.public_identity(), &plaintext).unwrap();
            let opened = envelope.open(&server, &client.public_identity()).unwrap();
            prop_assert_eq!(opened, plaintext);
        }

        #[test]
        fn prop_ciphertext_bit_flip_rejected(
            plaintext in proptest::collection::vec(any::<u8>(), 1..128),
            index in any::<proptest::sample::Index>(),
            bit in 0u8..8,
        ) {
            let (client, server) = pair();
            let mut envelope =
                SecureEnvelope::seal(&client, &server.public_identity(), &plaintext).unwrap();

            let i = index.index(envelope.ciphertext.len());
            envelope.ciphertext[i] ^= 1 << bit;

            prop_assert!(envelope.open(&server, &client.public_identity()).is_err());
        }

        #[test]
        fn prop_nonce_or_ephemeral_bit_flip_rejected(
            index in 0usize..12,
            bit in 0u8..8,
            flip_ephemeral in any::<bool>(),
        ) {
            let (client, server) = pair();
            let mut envelope =
                SecureEnvelope::seal(&client, &server.public_identity(), b"body").unwrap();

            if flip_ephemeral {
                envelope.ephemeral.0[index] ^= 1 << bit;
            } else {
                envelope.nonce.0[index] ^= 1 << bit;
            }

            prop_assert!(envelope.open(&server, &client.public_identity()).is_err());
        }
    }
}

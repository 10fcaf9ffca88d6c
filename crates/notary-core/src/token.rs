//! Session token derivation.
//!
//! A session token is never stored. It is recomputed on every request as
//! `H(H(nonce) || H(fingerprint))`, so rotating the account nonce
//! invalidates every token issued before.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::crypto::Sha256Hash;
use crate::error::CoreError;
use crate::types::{Fingerprint, Nonce};

/// An opaque, transport-encoded session token.
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken([u8; 32]);

impl SessionToken {
    /// Derive the token for a nonce and a caller fingerprint.
    pub fn derive(nonce: &Nonce, fingerprint: &Fingerprint) -> Self {
        Self(Sha256Hash::hash_pair(nonce.as_bytes(), fingerprint.as_bytes()).0)
    }

    /// Check whether this token was derived from `nonce` and `fingerprint`.
    pub fn matches(&self, nonce: &Nonce, fingerprint: &Fingerprint) -> bool {
        *self == Self::derive(nonce, fingerprint)
    }

    /// Encode for transport (lowercase hex).
    pub fn encode(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode a transport value.
    pub fn decode(s: &str) -> Result<Self, CoreError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut arr)
            .map_err(|e| CoreError::InvalidToken(e.to_string()))?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PartialEq for SessionToken {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SessionToken {}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({}...)", &self.encode()[..8])
    }
}

impl TryFrom<String> for SessionToken {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::decode(&s)
    }
}

impl From<SessionToken> for String {
    fn from(t: SessionToken) -> Self {
        t.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_token_layout() {
        let nonce = Nonce::from_bytes([0x11; 32]);
        let fp = Fingerprint::new("agent", "127.0.0.1");

        let mut inner = Vec::new();
        inner.extend_from_slice(Sha256Hash::hash(nonce.as_bytes()).as_bytes());
        inner.extend_from_slice(Sha256Hash::hash(fp.as_bytes()).as_bytes());

        assert_eq!(
            SessionToken::derive(&nonce, &fp).as_bytes(),
            Sha256Hash::hash(&inner).as_bytes()
        );
    }

    #[test]
    fn test_token_encode_decode() {
        let token = SessionToken::derive(&Nonce::generate(), &Fingerprint::from_raw("x"));
        let decoded = SessionToken::decode(&token.encode()).unwrap();
        assert_eq!(token, decoded);
        assert!(SessionToken::decode("nothex").is_err());
    }

    proptest! {
        #[test]
        fn token_is_deterministic(nonce in any::<[u8; 32]>(), fp in ".{0,64}") {
            let nonce = Nonce::from_bytes(nonce);
            let fp = Fingerprint::from_raw(fp);
            prop_assert_eq!(SessionToken::derive(&nonce, &fp), SessionToken::derive(&nonce, &fp));
        }

        #[test]
        fn token_changes_with_nonce(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            prop_assume!(a != b);
            let fp = Fingerprint::from_raw("agent");
            prop_assert_ne!(
                SessionToken::derive(&Nonce::from_bytes(a), &fp),
                SessionToken::derive(&Nonce::from_bytes(b), &fp)
            );
        }

        #[test]
        fn token_changes_with_fingerprint(a in "[a-z]{1,16}", b in "[a-z]{1,16}") {
            prop_assume!(a != b);
            let nonce = Nonce::from_bytes([9u8; 32]);
            prop_assert_ne!(
                SessionToken::derive(&nonce, &Fingerprint::from_raw(a)),
                SessionToken::derive(&nonce, &Fingerprint::from_raw(b))
            );
        }
    }
}

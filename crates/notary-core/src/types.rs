//! Strong type definitions for the notary.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

use crate::crypto::{Ed25519PublicKey, Sha256Hash};
use crate::error::CoreError;

/// Prefix carried by every address string.
pub const ADDRESS_PREFIX: char = 'N';

/// Number of hash bytes kept in an address.
pub const ADDRESS_BYTES: usize = 20;

/// A public ledger address identifying an account.
///
/// Derived from the account's public key material, so the binding between
/// an address and its key can always be recomputed by the recipient.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Derive the address for a signing key and key-agreement key.
    ///
    /// `address = "N" || hex(H(signing || exchange)[..20])`
    pub fn derive(signing: &Ed25519PublicKey, exchange: &[u8; 32]) -> Self {
        let mut material = Vec::with_capacity(64);
        material.extend_from_slice(signing.as_bytes());
        material.extend_from_slice(exchange);
        let digest = Sha256Hash::hash(&material);
        Self(format!(
            "{}{}",
            ADDRESS_PREFIX,
            hex::encode(&digest.as_bytes()[..ADDRESS_BYTES])
        ))
    }

    /// Parse and validate an address string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| CoreError::InvalidAddress(format!("missing prefix: {s}")))?;
        if body.len() != ADDRESS_BYTES * 2
            || !body.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(CoreError::InvalidAddress(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

/// The hash of a notarized document (32 bytes, lowercase hex on the wire).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentHash([u8; 32]);

impl DocumentHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a document's contents.
    pub fn of_document(contents: &[u8]) -> Self {
        Self(Sha256Hash::hash(contents).0)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, accepting either case.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr)
            .map_err(|e| CoreError::InvalidDocumentHash(format!("{s}: {e}")))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for DocumentHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for DocumentHash {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<DocumentHash> for String {
    fn from(h: DocumentHash) -> Self {
        h.to_hex()
    }
}

/// A single-use challenge nonce bound to one account.
///
/// Equality is constant-time.
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nonce([u8; 32]);

impl Nonce {
    /// Generate a fresh random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr).map_err(|e| CoreError::InvalidNonce(e.to_string()))?;
        Ok(Self(arr))
    }
}

impl PartialEq for Nonce {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Nonce {}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({}...)", &self.to_hex()[..8])
    }
}

impl TryFrom<String> for Nonce {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Nonce> for String {
    fn from(n: Nonce) -> Self {
        n.to_hex()
    }
}

/// Reference to a ledger transaction, as returned by the ledger client.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionRef(String);

impl TransactionRef {
    /// Wrap a ledger reference. Empty references are rejected.
    pub fn new(reference: impl Into<String>) -> Result<Self, CoreError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(CoreError::IncompleteRecord("transaction_reference"));
        }
        Ok(Self(reference))
    }

    /// Get the reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionRef({})", self.0)
    }
}

impl fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TransactionRef {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TransactionRef> for String {
    fn from(t: TransactionRef) -> Self {
        t.0
    }
}

/// Caller-identifying channel metadata a session token is bound to.
///
/// Built from the client-declared identity (user agent) and network
/// origin. This is not a cryptographic channel binding.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build from the declared client identity and network origin.
    pub fn new(user_agent: &str, origin: &str) -> Self {
        Self(format!("{user_agent}{origin}"))
    }

    /// Use a pre-built fingerprint string as-is.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Get the fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digest = Sha256Hash::hash(self.0.as_bytes());
        write!(f, "Fingerprint({})", &digest.to_hex()[..8])
    }
}

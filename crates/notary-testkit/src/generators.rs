//! Proptest generators for property-based testing.

use proptest::prelude::*;

use notary_core::{DocumentHash, Fingerprint, Keypair, Nonce, SessionToken};
use notary_envelope::EnvelopeIdentity;

/// Generate a random signing keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random envelope identity.
pub fn identity() -> impl Strategy<Value = EnvelopeIdentity> {
    any::<[u8; 32]>().prop_map(|seed| EnvelopeIdentity::from_seed(&seed))
}

/// Generate a random document hash.
pub fn document_hash() -> impl Strategy<Value = DocumentHash> {
    any::<[u8; 32]>().prop_map(DocumentHash::from_bytes)
}

/// Generate a random nonce.
pub fn nonce() -> impl Strategy<Value = Nonce> {
    any::<[u8; 32]>().prop_map(Nonce::from_bytes)
}

/// Generate a fingerprint from a plausible user agent and origin.
pub fn fingerprint() -> impl Strategy<Value = Fingerprint> {
    ("[A-Za-z]{1,12}/[0-9]\\.[0-9]", "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}")
        .prop_map(|(agent, origin)| Fingerprint::new(&agent, &origin))
}

/// Generate a session token for a random nonce and fingerprint.
pub fn session_token() -> impl Strategy<Value = SessionToken> {
    (nonce(), fingerprint()).prop_map(|(n, fp)| SessionToken::derive(&n, &fp))
}

/// Generate an envelope body of at most `max_len` bytes.
pub fn body(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

//! Envelope bodies exchanged with clients.
//!
//! All bodies are JSON inside a [`notary_envelope::SecureEnvelope`].

use serde::{Deserialize, Serialize};

use notary_core::{DocumentHash, Nonce};

/// Server to client: the challenge nonce. Client to server: the same nonce,
/// echoed back to prove the client could open the challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeBody {
    pub nonce: Nonce,
}

/// Client to server: register the sending identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationBody {
    #[serde(default)]
    pub email: Option<String>,
}

/// Client to server: the document an authenticated request is about.
///
/// Used by both notarization and status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBody {
    pub document_hash: DocumentHash,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_body_accepts_uppercase_hash() {
        let json = format!("{{\"document_hash\":\"{}\"}}", "AB".repeat(32));
        let body: DocumentBody = serde_json::from_str(&json).unwrap();
        assert_eq!(body.document_hash.to_hex(), "ab".repeat(32));
    }

    #[test]
    fn test_registration_email_optional() {
        let body: RegistrationBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.email, None);
    }
}

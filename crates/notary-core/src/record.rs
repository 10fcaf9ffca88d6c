//! Notarization records and the notary hash.
//!
//! The notary hash is the value committed to the ledger:
//! `notary_hash = H(H(signature) || H(document_hash))`, where the signature
//! is the notary wallet's signature over the document hash bytes.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{Ed25519Signature, Sha256Hash};
use crate::error::{CoreError, Result};
use crate::types::{Address, DocumentHash, TransactionRef};

/// Compute the notary hash for a signed document hash.
pub fn notary_hash(signature: &Ed25519Signature, document_hash: &DocumentHash) -> Sha256Hash {
    Sha256Hash::hash_pair(signature.as_bytes(), document_hash.as_bytes())
}

/// A completed notarization.
///
/// Only ever built once the ledger has returned a transaction reference.
/// At most one record exists per document hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarizationRecord {
    /// The notarized document's hash (primary key).
    pub document_hash: DocumentHash,

    /// The value committed to the ledger.
    pub notary_hash: Sha256Hash,

    /// Address of the requesting account.
    pub address: Address,

    /// Ledger transaction carrying the notary hash.
    pub transaction_reference: TransactionRef,

    /// When the record was created (ISO-8601 on the wire).
    pub created_at: DateTime<Utc>,
}

impl NotarizationRecord {
    /// Assemble a record from a successful ledger submission.
    ///
    /// Timestamps are truncated to microseconds so the record survives a
    /// storage roundtrip unchanged.
    pub fn new(
        document_hash: DocumentHash,
        notary_hash: Sha256Hash,
        address: Address,
        transaction_reference: TransactionRef,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            document_hash,
            notary_hash,
            address,
            transaction_reference,
            created_at: created_at.trunc_subsecs(6),
        }
    }

    /// Check that every field is populated.
    pub fn validate(&self) -> Result<()> {
        if self.address.as_str().is_empty() {
            return Err(CoreError::IncompleteRecord("address"));
        }
        if self.transaction_reference.as_str().trim().is_empty() {
            return Err(CoreError::IncompleteRecord("transaction_reference"));
        }
        Ok(())
    }

    /// The creation time as an RFC 3339 string.
    pub fn created_at_iso(&self) -> String {
        self.created_at
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use chrono::TimeZone;

    fn sample_record() -> NotarizationRecord {
        let wallet = Keypair::from_seed(&[3u8; 32]);
        let doc = DocumentHash::of_document(b"contract.pdf");
        let sig = wallet.sign(doc.as_bytes());
        NotarizationRecord::new(
            doc,
            notary_hash(&sig, &doc),
            Address::derive(&wallet.public_key(), &[4u8; 32]),
            TransactionRef::new("tx-1").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_notary_hash_layout() {
        let wallet = Keypair::from_seed(&[3u8; 32]);
        let doc = DocumentHash::from_bytes([0xab; 32]);
        let sig = wallet.sign(doc.as_bytes());

        let expected = Sha256Hash::hash_pair(sig.as_bytes(), doc.as_bytes());
        assert_eq!(notary_hash(&sig, &doc), expected);
    }

    #[test]
    fn test_notary_hash_depends_on_signer() {
        let doc = DocumentHash::from_bytes([0xab; 32]);
        let a = Keypair::from_seed(&[1u8; 32]).sign(doc.as_bytes());
        let b = Keypair::from_seed(&[2u8; 32]).sign(doc.as_bytes());
        assert_ne!(notary_hash(&a, &doc), notary_hash(&b, &doc));
    }

    #[test]
    fn test_record_validates() {
        sample_record().validate().unwrap();
    }

    #[test]
    fn test_record_json_shape() {
        let record = sample_record();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["document_hash"], record.document_hash.to_hex());
        assert_eq!(json["transaction_reference"], "tx-1");
        assert_eq!(json["created_at"], "2024-05-01T12:30:00Z");

        let back: NotarizationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_created_at_iso() {
        assert_eq!(sample_record().created_at_iso(), "2024-05-01T12:30:00.000000Z");
    }
}

//! Error types for the notary.

use notary_core::{Address, DocumentHash, NotarizationRecord};
use notary_ledger::LedgerError;
use notary_store::StoreError;
use thiserror::Error;

/// How an error should be presented to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    /// Authentication failed; nothing changed.
    Unauthenticated,
    /// The requested thing does not exist.
    NotFound,
    /// The request conflicts with existing state; no ledger call was made.
    Conflict,
    /// The request was malformed.
    BadRequest,
    /// A dependency is down; the same request may succeed later.
    Retryable,
    /// A server-side fault.
    Internal,
}

/// Errors that can occur during notary operations.
#[derive(Debug, Error)]
pub enum NotaryError {
    /// No account is registered under this address.
    #[error("unknown account: {0}")]
    UnknownAccount(Address),

    /// Authentication failed. Deliberately carries no reason.
    #[error("authentication failed")]
    AuthFailure,

    /// The document hash already has a notarization record. Carries the
    /// existing record, unchanged.
    #[error(
        "document already notarized: {} in {}",
        .0.document_hash,
        .0.transaction_reference
    )]
    AlreadyNotarized(Box<NotarizationRecord>),

    /// Another notarization of this document hash is in flight.
    #[error("notarization already in progress: {0}")]
    AnchorInProgress(DocumentHash),

    /// No notarization record exists for this document hash.
    #[error("notarization not found: {0}")]
    NotFound(DocumentHash),

    /// The ledger could not be reached or did not answer in time.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(#[from] LedgerError),

    /// A store could not be reached or did not answer in time.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The ledger committed the notary hash but the record was not
    /// persisted. Carries everything needed to reconcile it.
    #[error("anchored on ledger as {} but record not persisted", .0.transaction_reference)]
    OrphanedAnchor(Box<NotarizationRecord>),

    /// A record was missing required fields.
    #[error("invalid notarization record: {0}")]
    InvalidRecord(String),

    /// An account is already registered under this address.
    #[error("account already exists: {0}")]
    AccountExists(Address),

    /// The request body was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// An internal operation failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NotaryError {
    /// Map this error onto a caller-facing status.
    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::AuthFailure => ErrorStatus::Unauthenticated,
            Self::UnknownAccount(_) | Self::NotFound(_) => ErrorStatus::NotFound,
            Self::AlreadyNotarized(_) | Self::AnchorInProgress(_) | Self::AccountExists(_) => {
                ErrorStatus::Conflict
            }
            Self::InvalidRequest(_) => ErrorStatus::BadRequest,
            Self::LedgerUnavailable(_) | Self::StoreUnavailable(_) => ErrorStatus::Retryable,
            Self::OrphanedAnchor(_) | Self::InvalidRecord(_) | Self::Config(_) | Self::Internal(_) => {
                ErrorStatus::Internal
            }
        }
    }

    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        self.status() == ErrorStatus::Retryable
    }
}

/// Build an [`NotaryError::AuthFailure`], logging the real reason at debug.
pub(crate) fn auth_failure(reason: &'static str) -> NotaryError {
    tracing::debug!(reason, "authentication failed");
    NotaryError::AuthFailure
}

/// Result type for notary operations.
pub type Result<T> = std::result::Result<T, NotaryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use notary_core::{Keypair, Sha256Hash, TransactionRef};

    fn record(document_hash: DocumentHash) -> NotarizationRecord {
        NotarizationRecord::new(
            document_hash,
            Sha256Hash::hash(b"notary"),
            Address::derive(&Keypair::from_seed(&[3; 32]).public_key(), &[4; 32]),
            TransactionRef::new("tx-1").unwrap(),
            chrono::Utc::now(),
        )
    }

    #[test]
    fn test_auth_failure_reveals_nothing() {
        assert_eq!(NotaryError::AuthFailure.to_string(), "authentication failed");
        assert_eq!(
            auth_failure("nonce mismatch").to_string(),
            "authentication failed"
        );
    }

    #[test]
    fn test_status_mapping() {
        let doc = DocumentHash::from_bytes([1; 32]);

        assert_eq!(
            NotaryError::AuthFailure.status(),
            ErrorStatus::Unauthenticated
        );
        assert_eq!(
            NotaryError::AlreadyNotarized(Box::new(record(doc))).status(),
            ErrorStatus::Conflict
        );
        assert_eq!(
            NotaryError::AnchorInProgress(doc).status(),
            ErrorStatus::Conflict
        );
        assert_eq!(NotaryError::NotFound(doc).status(), ErrorStatus::NotFound);
        assert_eq!(
            NotaryError::InvalidRequest("x".into()).status(),
            ErrorStatus::BadRequest
        );
    }

    #[test]
    fn test_outages_are_retryable() {
        let ledger: NotaryError = LedgerError::Unavailable("down".into()).into();
        let store: NotaryError = StoreError::Timeout("slow".into()).into();

        assert!(ledger.is_retryable());
        assert!(store.is_retryable());
        assert!(!NotaryError::AuthFailure.is_retryable());
        let existing = record(DocumentHash::from_bytes([0; 32]));
        assert!(!NotaryError::AlreadyNotarized(Box::new(existing)).is_retryable());
    }
}

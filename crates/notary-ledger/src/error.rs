//! Error types for ledger operations.

use thiserror::Error;

/// Errors that can occur while submitting to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The submission did not complete in time.
    #[error("ledger timeout: {0}")]
    Timeout(String),

    /// The ledger refused the submission.
    #[error("ledger rejected submission: {0}")]
    Rejected(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

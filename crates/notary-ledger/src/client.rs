//! Ledger client abstraction.
//!
//! The notary only needs one thing from a ledger: commit a 32-byte hash and
//! hand back a transaction reference. Broadcast, fees and confirmation
//! tracking belong to the implementation.

use async_trait::async_trait;

use notary_core::{Sha256Hash, TransactionRef};

use crate::error::Result;

/// Submits notary hashes to an append-only public ledger.
///
/// Implementations must be thread-safe (Send + Sync). A successful return
/// means the hash is irreversibly committed.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Commit `notary_hash` and return the transaction carrying it.
    async fn submit(&self, notary_hash: &Sha256Hash) -> Result<TransactionRef>;
}

/// An in-memory ledger for testing.
///
/// Records every accepted submission and can be told to fail or stall.
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::RwLock;

    use crate::error::LedgerError;

    /// A submission accepted by [`MemoryLedger`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Submission {
        /// The committed hash.
        pub notary_hash: Sha256Hash,
        /// The reference returned for it.
        pub transaction: TransactionRef,
    }

    /// In-memory ledger implementation.
    #[derive(Default)]
    pub struct MemoryLedger {
        submissions: RwLock<Vec<Submission>>,
        failing: AtomicBool,
        delay: RwLock<Option<Duration>>,
    }

    impl MemoryLedger {
        /// Create an empty ledger that accepts everything.
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent submissions fail with `Unavailable`.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Delay every subsequent submission by `delay`.
        pub async fn set_delay(&self, delay: Option<Duration>) {
            *self.delay.write().await = delay;
        }

        /// All accepted submissions in order.
        pub async fn submissions(&self) -> Vec<Submission> {
            self.submissions.read().await.clone()
        }

        /// Number of accepted submissions.
        pub async fn submission_count(&self) -> usize {
            self.submissions.read().await.len()
        }

        /// Whether `notary_hash` was ever committed.
        pub async fn contains(&self, notary_hash: &Sha256Hash) -> bool {
            self.submissions
                .read()
                .await
                .iter()
                .any(|s| s.notary_hash == *notary_hash)
        }
    }

    #[async_trait]
    impl LedgerClient for MemoryLedger {
        async fn submit(&self, notary_hash: &Sha256Hash) -> Result<TransactionRef> {
            let delay = *self.delay.read().await;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if self.failing.load(Ordering::SeqCst) {
                return Err(LedgerError::Unavailable("connection refused".into()));
            }

            let mut submissions = self.submissions.write().await;
            let reference = format!(
                "tx{:04}-{}",
                submissions.len() + 1,
                &notary_hash.to_hex()[..16]
            );
            let transaction =
                TransactionRef::new(reference).map_err(|e| LedgerError::Rejected(e.to_string()))?;

            submissions.push(Submission {
                notary_hash: *notary_hash,
                transaction: transaction.clone(),
            });
            tracing::debug!(%transaction, "memory ledger accepted submission");

            Ok(transaction)
        }
    }

}

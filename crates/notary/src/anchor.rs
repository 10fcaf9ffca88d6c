//! The notarization workflow: sign, anchor, persist.
//!
//! For one document hash, [`NotarizationAnchor::notarize`] runs
//!
//! 1. `claim` the hash in the store (rejects existing records and in-flight
//!    claims before anything is signed),
//! 2. sign the hash with the wallet and derive the notary hash,
//! 3. submit the notary hash to the ledger, bounded by a timeout,
//! 4. persist the record, which replaces the claim.
//!
//! A record never exists without a ledger transaction behind it, and the
//! claim guarantees at most one ledger submission per document hash.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use notary_core::{notary_hash, DocumentHash, NotarizationRecord};
use notary_ledger::{LedgerClient, LedgerError, SigningWallet};
use notary_store::{ClaimOutcome, InsertOutcome, NotarizationStore, PendingClaim, StoreError};

use crate::config::AnchorConfig;
use crate::error::{NotaryError, Result};
use crate::session::Session;

/// Signs document hashes, anchors them on the ledger and records the result.
pub struct NotarizationAnchor {
    store: Arc<dyn NotarizationStore>,
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn SigningWallet>,
    config: AnchorConfig,
}

impl NotarizationAnchor {
    /// Create an anchor from its adapters.
    pub fn new(
        store: Arc<dyn NotarizationStore>,
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn SigningWallet>,
        config: AnchorConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            wallet,
            config,
        }
    }

    /// Notarize `document_hash` on behalf of an authenticated session.
    #[tracing::instrument(skip_all, fields(address = %session.address(), document = %document_hash))]
    pub async fn notarize(
        &self,
        session: &Session,
        document_hash: &DocumentHash,
    ) -> Result<NotarizationRecord> {
        let address = session.address();

        match self
            .bounded(self.store.claim(document_hash, address, Utc::now()))
            .await?
        {
            ClaimOutcome::Claimed => {}
            ClaimOutcome::Completed(existing) => {
                return Err(NotaryError::AlreadyNotarized(Box::new(existing)));
            }
            ClaimOutcome::Pending(claim) => {
                tracing::warn!(claimed_by = %claim.address, "notarization already in flight");
                return Err(NotaryError::AnchorInProgress(*document_hash));
            }
        }

        let signature = self.wallet.sign(document_hash.as_bytes());
        let notary_hash = notary_hash(&signature, document_hash);

        let transaction = match tokio::time::timeout(
            self.config.ledger_timeout,
            self.ledger.submit(&notary_hash),
        )
        .await
        {
            Ok(Ok(transaction)) => transaction,
            Ok(Err(e)) => {
                // The ledger refused outright, so nothing was committed.
                self.release_claim(document_hash).await;
                tracing::warn!(error = %e, "ledger submission failed");
                return Err(NotaryError::LedgerUnavailable(e));
            }
            Err(_) => {
                // Outcome unknown: keep the claim so the hash cannot be
                // anchored a second time before someone reconciles it.
                tracing::warn!(
                    timeout_ms = self.config.ledger_timeout.as_millis() as u64,
                    %notary_hash,
                    "ledger submission timed out; claim left pending"
                );
                return Err(NotaryError::LedgerUnavailable(LedgerError::Timeout(
                    format!("no answer within {:?}", self.config.ledger_timeout),
                )));
            }
        };

        let record = NotarizationRecord::new(
            *document_hash,
            notary_hash,
            address.clone(),
            transaction,
            Utc::now(),
        );
        if let Err(e) = record.validate() {
            tracing::error!(?record, error = %e, "anchored record failed validation");
            return Err(NotaryError::InvalidRecord(e.to_string()));
        }

        match self.bounded(self.store.complete(&record)).await {
            Ok(InsertOutcome::Inserted) => {
                tracing::info!(
                    transaction = %record.transaction_reference,
                    notary_hash = %record.notary_hash,
                    "document notarized"
                );
                Ok(record)
            }
            Ok(InsertOutcome::AlreadyExists) => {
                tracing::error!(?record, "record appeared for claimed document; anchor orphaned");
                Err(NotaryError::OrphanedAnchor(Box::new(record)))
            }
            Err(e) => {
                tracing::error!(
                    ?record,
                    created_at = %record.created_at_iso(),
                    error = %e,
                    "anchored on ledger but record not persisted"
                );
                Err(NotaryError::OrphanedAnchor(Box::new(record)))
            }
        }
    }

    /// Look up the record for `document_hash`.
    pub async fn status(&self, document_hash: &DocumentHash) -> Result<NotarizationRecord> {
        self.bounded(self.store.get_notarization(document_hash))
            .await?
            .ok_or(NotaryError::NotFound(*document_hash))
    }

    /// Persist a record whose ledger submission already succeeded.
    ///
    /// Used to repair [`NotaryError::OrphanedAnchor`]s. Never touches the
    /// ledger. Calling it again for the same record is harmless.
    #[tracing::instrument(skip_all, fields(document = %record.document_hash))]
    pub async fn reconcile(&self, record: &NotarizationRecord) -> Result<InsertOutcome> {
        record
            .validate()
            .map_err(|e| NotaryError::InvalidRecord(e.to_string()))?;

        let outcome = self.bounded(self.store.complete(record)).await?;
        match outcome {
            InsertOutcome::Inserted => {
                tracing::info!(transaction = %record.transaction_reference, "orphaned anchor reconciled")
            }
            InsertOutcome::AlreadyExists => {
                tracing::debug!("record already present")
            }
        }
        Ok(outcome)
    }

    /// Claims that never completed: in-flight, timed out, or orphaned.
    pub async fn pending_claims(&self) -> Result<Vec<PendingClaim>> {
        self.bounded(self.store.pending_claims()).await
    }

    /// Drop a pending claim so the document can be notarized again.
    ///
    /// Only safe once the ledger is known not to hold the notary hash.
    pub async fn abandon_claim(&self, document_hash: &DocumentHash) -> Result<()> {
        self.bounded(self.store.release(document_hash)).await
    }

    async fn release_claim(&self, document_hash: &DocumentHash) {
        if let Err(e) = self.bounded(self.store.release(document_hash)).await {
            tracing::warn!(error = %e, "could not release claim after ledger failure");
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = notary_store::Result<T>>,
    {
        with_deadline(self.config.store_timeout, op).await
    }
}

async fn with_deadline<T, F>(deadline: Duration, op: F) -> Result<T>
where
    F: Future<Output = notary_store::Result<T>>,
{
    match tokio::time::timeout(deadline, op).await {
        Ok(result) => result.map_err(NotaryError::from),
        Err(_) => Err(NotaryError::StoreUnavailable(StoreError::Timeout(format!(
            "no answer within {:?}",
            deadline
        )))),
    }
}

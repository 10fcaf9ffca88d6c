//! Ledger outages, timeouts and records lost after anchoring.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use notary::{AnchorConfig, ErrorStatus, NotaryConfig, NotaryError};
use notary_core::{Address, DocumentHash, NotarizationRecord};
use notary_ledger::memory::MemoryLedger;
use notary_store::{
    ClaimOutcome, InsertOutcome, MemoryStore, NotarizationStore, PendingClaim, StoreError,
};
use notary_testkit::TestFixture;

/// Delegates to a [`MemoryStore`] but can refuse to persist records.
struct LossyStore {
    inner: Arc<MemoryStore>,
    drop_records: AtomicBool,
}

#[async_trait]
impl NotarizationStore for LossyStore {
    async fn claim(
        &self,
        document_hash: &DocumentHash,
        address: &Address,
        at: DateTime<Utc>,
    ) -> notary_store::Result<ClaimOutcome> {
        self.inner.claim(document_hash, address, at).await
    }

    async fn complete(&self, record: &NotarizationRecord) -> notary_store::Result<InsertOutcome> {
        if self.drop_records.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout("replica lagging".into()));
        }
        self.inner.complete(record).await
    }

    async fn release(&self, document_hash: &DocumentHash) -> notary_store::Result<()> {
        self.inner.release(document_hash).await
    }

    async fn get_notarization(
        &self,
        document_hash: &DocumentHash,
    ) -> notary_store::Result<Option<NotarizationRecord>> {
        self.inner.get_notarization(document_hash).await
    }

    async fn pending_claims(&self) -> notary_store::Result<Vec<PendingClaim>> {
        self.inner.pending_claims().await
    }
}

fn lossy_fixture(config: NotaryConfig) -> (TestFixture, Arc<LossyStore>) {
    let inner = Arc::new(MemoryStore::new());
    let lossy = Arc::new(LossyStore {
        inner: inner.clone(),
        drop_records: AtomicBool::new(false),
    });
    let fixture = TestFixture::with_parts(
        inner,
        lossy.clone(),
        Arc::new(MemoryLedger::new()),
        config,
    );
    (fixture, lossy)
}

fn short_timeouts() -> NotaryConfig {
    NotaryConfig {
        anchor: AnchorConfig {
            ledger_timeout: Duration::from_millis(50),
            store_timeout: Duration::from_secs(1),
        },
        ..NotaryConfig::default()
    }
}

#[tokio::test]
async fn orphaned_anchor_is_reported_and_reconciled() {
    common::init_tracing();
    let (fixture, lossy) = lossy_fixture(NotaryConfig::default());
    let mut client = fixture.logged_in_client(1).await.unwrap();
    let doc = DocumentHash::of_document(b"lost on write");

    lossy.drop_records.store(true, Ordering::SeqCst);
    let err = client.notarize(&fixture.notary, &doc).await.unwrap_err();

    let orphan = match err {
        NotaryError::OrphanedAnchor(record) => *record,
        other => panic!("expected OrphanedAnchor, got {other:?}"),
    };
    assert_eq!(orphan.document_hash, doc);
    assert!(fixture.ledger.contains(&orphan.notary_hash).await);

    // The claim blocks a second anchoring while the record is missing.
    let pending = fixture.notary.anchor().pending_claims().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].document_hash, doc);
    let retry = client.notarize(&fixture.notary, &doc).await.unwrap_err();
    assert!(matches!(retry, NotaryError::AnchorInProgress(_)));
    assert_eq!(fixture.ledger.submission_count().await, 1);

    // Repair.
    lossy.drop_records.store(false, Ordering::SeqCst);
    let anchor = fixture.notary.anchor();
    assert_eq!(anchor.reconcile(&orphan).await.unwrap(), InsertOutcome::Inserted);
    assert_eq!(
        anchor.reconcile(&orphan).await.unwrap(),
        InsertOutcome::AlreadyExists
    );
    assert!(anchor.pending_claims().await.unwrap().is_empty());

    let record = client.status(&fixture.notary, &doc).await.unwrap();
    assert_eq!(record, orphan);
    assert_eq!(fixture.ledger.submission_count().await, 1);
}

#[tokio::test]
async fn ledger_outage_leaves_nothing_behind() {
    let fixture = TestFixture::new();
    let mut client = fixture.logged_in_client(2).await.unwrap();
    let doc = DocumentHash::of_document(b"during outage");

    fixture.ledger.set_failing(true);
    let err = client.notarize(&fixture.notary, &doc).await.unwrap_err();

    assert!(matches!(err, NotaryError::LedgerUnavailable(_)));
    assert_eq!(err.status(), ErrorStatus::Retryable);
    assert!(fixture.notary.anchor().pending_claims().await.unwrap().is_empty());
    assert!(matches!(
        fixture.notary.anchor().status(&doc).await,
        Err(NotaryError::NotFound(_))
    ));

    // Once the ledger is back the same document goes through.
    fixture.ledger.set_failing(false);
    let record = client.notarize(&fixture.notary, &doc).await.unwrap();
    assert_eq!(record.document_hash, doc);
    assert_eq!(fixture.ledger.submission_count().await, 1);
}

#[tokio::test]
async fn ledger_timeout_keeps_claim_until_abandoned() {
    let fixture = TestFixture::with_config(short_timeouts());
    let mut client = fixture.logged_in_client(3).await.unwrap();
    let doc = DocumentHash::of_document(b"slow ledger");

    fixture
        .ledger
        .set_delay(Some(Duration::from_millis(500)))
        .await;
    let err = client.notarize(&fixture.notary, &doc).await.unwrap_err();

    assert!(matches!(err, NotaryError::LedgerUnavailable(_)));
    assert!(err.is_retryable());
    assert!(matches!(
        fixture.notary.anchor().status(&doc).await,
        Err(NotaryError::NotFound(_))
    ));

    // Outcome unknown, so the document stays reserved.
    fixture.ledger.set_delay(None).await;
    let blocked = client.notarize(&fixture.notary, &doc).await.unwrap_err();
    assert!(matches!(blocked, NotaryError::AnchorInProgress(_)));

    // An operator who checked the ledger releases it.
    fixture.notary.anchor().abandon_claim(&doc).await.unwrap();
    let record = client.notarize(&fixture.notary, &doc).await.unwrap();
    assert_eq!(record.document_hash, doc);
    assert_eq!(fixture.ledger.submission_count().await, 1);
}

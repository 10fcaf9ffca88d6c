//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite; every operation runs under `tokio::task::spawn_blocking` against a
//! mutex-guarded connection.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, TransactionBehavior};

use notary_core::{Address, DocumentHash, NotarizationRecord, Nonce, Sha256Hash, TransactionRef};
use notary_envelope::PublicIdentity;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{
    Account, AccountStore, ClaimOutcome, InsertOutcome, NotarizationStore, PendingClaim,
};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Cloning shares the connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let address: String = row.get(0)?;
    let public_key: String = row.get(1)?;
    let nonce: String = row.get(2)?;

    Ok(Account {
        address: Address::parse(&address).map_err(|e| conversion_error(0, e))?,
        public_key: PublicIdentity::from_hex(&public_key).map_err(|e| conversion_error(1, e))?,
        nonce: Nonce::from_hex(&nonce).map_err(|e| conversion_error(2, e))?,
        confirmed: row.get(3)?,
        email: row.get(4)?,
        confirmation: row
            .get::<_, Option<String>>(5)?
            .map(|code| Nonce::from_hex(&code).map_err(|e| conversion_error(5, e)))
            .transpose()?,
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotarizationRecord> {
    let document_hash: String = row.get(0)?;
    let notary_hash: String = row.get(1)?;
    let address: String = row.get(2)?;
    let transaction_reference: String = row.get(3)?;
    let created_at: String = row.get(4)?;

    Ok(NotarizationRecord {
        document_hash: DocumentHash::from_hex(&document_hash)
            .map_err(|e| conversion_error(0, e))?,
        notary_hash: Sha256Hash::from_hex(&notary_hash).map_err(|e| conversion_error(1, e))?,
        address: Address::parse(&address).map_err(|e| conversion_error(2, e))?,
        transaction_reference: TransactionRef::new(transaction_reference)
            .map_err(|e| conversion_error(3, e))?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

fn row_to_claim(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingClaim> {
    let document_hash: String = row.get(0)?;
    let address: String = row.get(1)?;
    let claimed_at: String = row.get(2)?;

    Ok(PendingClaim {
        document_hash: DocumentHash::from_hex(&document_hash)
            .map_err(|e| conversion_error(0, e))?,
        address: Address::parse(&address).map_err(|e| conversion_error(1, e))?,
        claimed_at: parse_timestamp(2, &claimed_at)?,
    })
}

const SELECT_RECORD: &str = "SELECT document_hash, notary_hash, address, transaction_reference, created_at
     FROM notarizations WHERE document_hash = ?1";

#[async_trait]
impl AccountStore for SqliteStore {
    async fn get_account(&self, address: &Address) -> Result<Option<Account>> {
        let address = address.clone();

        self.run(move |conn| {
            conn.query_row(
                "SELECT address, public_key, nonce, confirmed, email, confirmation
                 FROM accounts WHERE address = ?1",
                params![address.as_str()],
                row_to_account,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn create_account(&self, account: &Account) -> Result<InsertOutcome> {
        let account = account.clone();

        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO accounts
                    (address, public_key, nonce, confirmed, email, confirmation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.address.as_str(),
                    account.public_key.to_hex(),
                    account.nonce.to_hex(),
                    account.confirmed,
                    account.email,
                    account.confirmation.map(|code| code.to_hex()),
                ],
            )?;

            Ok(if changed == 1 {
                InsertOutcome::Inserted
            } else {
                InsertOutcome::AlreadyExists
            })
        })
        .await
    }

    async fn set_nonce(&self, address: &Address, nonce: &Nonce) -> Result<bool> {
        let address = address.clone();
        let nonce = *nonce;

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE accounts SET nonce = ?1 WHERE address = ?2",
                params![nonce.to_hex(), address.as_str()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn rotate_nonce_if(
        &self,
        address: &Address,
        expected: &Nonce,
        next: &Nonce,
    ) -> Result<bool> {
        let address = address.clone();
        let expected = *expected;
        let next = *next;

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE accounts SET nonce = ?1 WHERE address = ?2 AND nonce = ?3",
                params![next.to_hex(), address.as_str(), expected.to_hex()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn confirm_account(&self, address: &Address, code: &Nonce) -> Result<bool> {
        let address = address.clone();
        let code = *code;

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE accounts SET confirmed = 1, confirmation = NULL
                 WHERE address = ?1 AND confirmation = ?2",
                params![address.as_str(), code.to_hex()],
            )?;
            Ok(changed == 1)
        })
        .await
    }
}

#[async_trait]
impl NotarizationStore for SqliteStore {
    async fn claim(
        &self,
        document_hash: &DocumentHash,
        address: &Address,
        at: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let document_hash = *document_hash;
        let address = address.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let key = document_hash.to_hex();

            let existing = tx
                .query_row(SELECT_RECORD, params![key], row_to_record)
                .optional()?;
            if let Some(record) = existing {
                return Ok(ClaimOutcome::Completed(record));
            }

            let pending = tx
                .query_row(
                    "SELECT document_hash, address, claimed_at
                     FROM notarization_claims WHERE document_hash = ?1",
                    params![key],
                    row_to_claim,
                )
                .optional()?;
            if let Some(claim) = pending {
                return Ok(ClaimOutcome::Pending(claim));
            }

            tx.execute(
                "INSERT INTO notarization_claims (document_hash, address, claimed_at)
                 VALUES (?1, ?2, ?3)",
                params![key, address.as_str(), timestamp(&at)],
            )?;
            tx.commit()?;

            Ok(ClaimOutcome::Claimed)
        })
        .await
    }

    async fn complete(&self, record: &NotarizationRecord) -> Result<InsertOutcome> {
        let record = record.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let key = record.document_hash.to_hex();

            let changed = tx.execute(
                "INSERT OR IGNORE INTO notarizations
                    (document_hash, notary_hash, address, transaction_reference, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    key,
                    record.notary_hash.to_hex(),
                    record.address.as_str(),
                    record.transaction_reference.as_str(),
                    record.created_at_iso(),
                ],
            )?;
            if changed == 0 {
                return Ok(InsertOutcome::AlreadyExists);
            }

            tx.execute(
                "DELETE FROM notarization_claims WHERE document_hash = ?1",
                params![key],
            )?;
            tx.commit()?;

            Ok(InsertOutcome::Inserted)
        })
        .await
    }

    async fn release(&self, document_hash: &DocumentHash) -> Result<()> {
        let key = document_hash.to_hex();

        self.run(move |conn| {
            conn.execute(
                "DELETE FROM notarization_claims WHERE document_hash = ?1",
                params![key],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_notarization(
        &self,
        document_hash: &DocumentHash,
    ) -> Result<Option<NotarizationRecord>> {
        let key = document_hash.to_hex();

        self.run(move |conn| {
            conn.query_row(SELECT_RECORD, params![key], row_to_record)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn pending_claims(&self) -> Result<Vec<PendingClaim>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT document_hash, address, claimed_at
                 FROM notarization_claims ORDER BY claimed_at ASC",
            )?;
            let claims = stmt
                .query_map([], row_to_claim)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(claims)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_envelope::EnvelopeIdentity;

    fn test_account(seed: u8) -> Account {
        Account::new(
            EnvelopeIdentity::from_seed(&[seed; 32]).public_identity(),
            Some(format!("user{seed}@example.com")),
        )
    }

    fn test_record(doc: DocumentHash, address: &Address, tx: &str) -> NotarizationRecord {
        NotarizationRecord::new(
            doc,
            Sha256Hash::hash(doc.as_bytes()),
            address.clone(),
            TransactionRef::new(tx).unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_account_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let account = test_account(1);

        assert_eq!(
            store.create_account(&account).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.create_account(&account).await.unwrap(),
            InsertOutcome::AlreadyExists
        );

        let stored = store.get_account(&account.address).await.unwrap().unwrap();
        assert_eq!(stored, account);
    }

    #[tokio::test]
    async fn test_rotate_nonce_if() {
        let store = SqliteStore::open_memory().unwrap();
        let account = test_account(2);
        store.create_account(&account).await.unwrap();

        let next = Nonce::generate();
        assert!(store
            .rotate_nonce_if(&account.address, &account.nonce, &next)
            .await
            .unwrap());
        assert!(!store
            .rotate_nonce_if(&account.address, &account.nonce, &Nonce::generate())
            .await
            .unwrap());

        let stored = store.get_account(&account.address).await.unwrap().unwrap();
        assert_eq!(stored.nonce, next);
    }

    #[tokio::test]
    async fn test_confirm_account() {
        let store = SqliteStore::open_memory().unwrap();
        let account = test_account(3);
        let code = account.confirmation.unwrap();
        store.create_account(&account).await.unwrap();

        // A challenge in between neither reveals nor replaces the code.
        store
            .set_nonce(&account.address, &Nonce::generate())
            .await
            .unwrap();
        let challenged = store.get_account(&account.address).await.unwrap().unwrap();
        assert!(!store
            .confirm_account(&account.address, &challenged.nonce)
            .await
            .unwrap());

        assert!(store.confirm_account(&account.address, &code).await.unwrap());
        let stored = store.get_account(&account.address).await.unwrap().unwrap();
        assert!(stored.confirmed);
        assert_eq!(stored.confirmation, None);
        assert_eq!(stored.nonce, challenged.nonce);
        assert!(!store.confirm_account(&account.address, &code).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_and_complete() {
        let store = SqliteStore::open_memory().unwrap();
        let address = test_account(4).address;
        let doc = DocumentHash::of_document(b"lease");

        assert_eq!(
            store.claim(&doc, &address, Utc::now()).await.unwrap(),
            ClaimOutcome::Claimed
        );
        assert!(matches!(
            store.claim(&doc, &address, Utc::now()).await.unwrap(),
            ClaimOutcome::Pending(_)
        ));
        assert!(store.get_notarization(&doc).await.unwrap().is_none());

        let record = test_record(doc, &address, "tx-lease");
        assert_eq!(
            store.complete(&record).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(store.get_notarization(&doc).await.unwrap(), Some(record.clone()));
        assert!(store.pending_claims().await.unwrap().is_empty());

        let again = test_record(doc, &address, "tx-other");
        assert_eq!(
            store.complete(&again).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(store.get_notarization(&doc).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_pending_claims_ordered() {
        let store = SqliteStore::open_memory().unwrap();
        let address = test_account(5).address;
        let early = DocumentHash::of_document(b"early");
        let late = DocumentHash::of_document(b"late");

        let now = Utc::now();
        store
            .claim(&late, &address, now + chrono::Duration::seconds(5))
            .await
            .unwrap();
        store.claim(&early, &address, now).await.unwrap();

        let claims = store.pending_claims().await.unwrap();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].document_hash, early);
        assert_eq!(claims[1].document_hash, late);

        store.release(&early).await.unwrap();
        assert_eq!(store.pending_claims().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notary.db");
        let account = test_account(6);
        let doc = DocumentHash::of_document(b"persisted");
        let record = test_record(doc, &account.address, "tx-persist");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_account(&account).await.unwrap();
            store.claim(&doc, &account.address, Utc::now()).await.unwrap();
            store.complete(&record).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get_account(&account.address).await.unwrap(),
            Some(account)
        );
        assert_eq!(store.get_notarization(&doc).await.unwrap(), Some(record));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotate_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notary.db");
        let account = test_account(7);
        SqliteStore::open(&path)
            .unwrap()
            .create_account(&account)
            .await
            .unwrap();

        // One connection per task, so the compare-and-set is decided by SQLite.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = SqliteStore::open(&path).unwrap();
            let address = account.address.clone();
            let expected = account.nonce;
            handles.push(tokio::spawn(async move {
                store
                    .rotate_nonce_if(&address, &expected, &Nonce::generate())
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claim_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notary.db");
        SqliteStore::open(&path).unwrap();
        let doc = DocumentHash::of_document(b"contested");

        let mut handles = Vec::new();
        for seed in 0..8u8 {
            let store = SqliteStore::open(&path).unwrap();
            let address = test_account(20 + seed).address;
            handles.push(tokio::spawn(async move {
                store.claim(&doc, &address, Utc::now()).await.unwrap()
            }));
        }

        let mut claimed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                ClaimOutcome::Claimed => claimed += 1,
                ClaimOutcome::Pending(claim) => assert_eq!(claim.document_hash, doc),
                ClaimOutcome::Completed(record) => panic!("nothing was completed: {record:?}"),
            }
        }
        assert_eq!(claimed, 1);

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.pending_claims().await.unwrap().len(), 1);
    }
}

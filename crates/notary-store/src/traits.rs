//! Store traits: the abstract interface for account and notarization
//! persistence.
//!
//! The notary core never touches a database directly. Both traits are
//! implemented by [`crate::SqliteStore`] (primary) and
//! [`crate::MemoryStore`] (tests, embedding).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use notary_core::{Address, DocumentHash, NotarizationRecord, Nonce};
use notary_envelope::PublicIdentity;

use crate::error::Result;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Public ledger address; derived from `public_key`.
    pub address: Address,

    /// Signing and exchange keys.
    pub public_key: PublicIdentity,

    /// Current challenge nonce. Last issued wins.
    pub nonce: Nonce,

    /// Whether the account has been confirmed.
    pub confirmed: bool,

    /// Confirmation code issued at registration, cleared once used.
    ///
    /// Independent of `nonce`: challenges never reveal or replace it.
    pub confirmation: Option<Nonce>,

    /// Registration contact, never interpreted by the notary.
    pub email: Option<String>,
}

impl Account {
    /// A new, unconfirmed account with a fresh nonce and confirmation code.
    pub fn new(public_key: PublicIdentity, email: Option<String>) -> Self {
        Self {
            address: public_key.address(),
            public_key,
            nonce: Nonce::generate(),
            confirmed: false,
            confirmation: Some(Nonce::generate()),
            email,
        }
    }
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was inserted.
    Inserted,
    /// A row with the same key already existed and was left untouched.
    AlreadyExists,
}

/// A reservation of a document hash while its ledger submission is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingClaim {
    /// The claimed document.
    pub document_hash: DocumentHash,
    /// Who claimed it.
    pub address: Address,
    /// When the claim was taken.
    pub claimed_at: DateTime<Utc>,
}

/// Result of [`NotarizationStore::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller now owns the document hash and may submit it.
    Claimed,
    /// The document is already notarized.
    Completed(NotarizationRecord),
    /// Someone else holds an uncompleted claim.
    Pending(PendingClaim),
}

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by address.
    async fn get_account(&self, address: &Address) -> Result<Option<Account>>;

    /// Insert a new account. Existing accounts are never overwritten.
    async fn create_account(&self, account: &Account) -> Result<InsertOutcome>;

    /// Unconditionally replace the account's nonce.
    ///
    /// Returns `false` if the account does not exist.
    async fn set_nonce(&self, address: &Address, nonce: &Nonce) -> Result<bool>;

    /// Replace the nonce only if it currently equals `expected`.
    ///
    /// This is one atomic compare-and-set: of two concurrent callers with
    /// the same `expected`, at most one sees `true`.
    async fn rotate_nonce_if(
        &self,
        address: &Address,
        expected: &Nonce,
        next: &Nonce,
    ) -> Result<bool>;

    /// Mark the account confirmed if `code` is its outstanding confirmation
    /// code.
    ///
    /// The code is cleared on success so it cannot be replayed. The challenge
    /// nonce is not read or written.
    async fn confirm_account(&self, address: &Address, code: &Nonce) -> Result<bool>;
}

/// Notarization persistence with an explicit claim protocol.
///
/// `claim` and `complete` together behave as a single insert-if-absent
/// spanning the ledger submission: at most one caller ever gets
/// [`ClaimOutcome::Claimed`] for a document hash, and records are never
/// overwritten.
#[async_trait]
pub trait NotarizationStore: Send + Sync {
    /// Atomically reserve `document_hash` for `address`.
    async fn claim(
        &self,
        document_hash: &DocumentHash,
        address: &Address,
        at: DateTime<Utc>,
    ) -> Result<ClaimOutcome>;

    /// Persist the record for a claimed document and drop the claim.
    ///
    /// Returns `AlreadyExists` (and changes nothing) if a record exists.
    async fn complete(&self, record: &NotarizationRecord) -> Result<InsertOutcome>;

    /// Drop a claim without recording anything.
    async fn release(&self, document_hash: &DocumentHash) -> Result<()>;

    /// Look up a completed notarization. Claims are never returned.
    async fn get_notarization(
        &self,
        document_hash: &DocumentHash,
    ) -> Result<Option<NotarizationRecord>>;

    /// All claims that have not completed, oldest first.
    async fn pending_claims(&self) -> Result<Vec<PendingClaim>>;
}

//! In-memory implementation of the store traits.
//!
//! Same semantics as SQLite, but nothing survives the process. Every
//! operation takes the lock once, so compare-and-set and claim are atomic.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use notary_core::{Address, DocumentHash, NotarizationRecord, Nonce};

use crate::error::{Result, StoreError};
use crate::traits::{
    Account, AccountStore, ClaimOutcome, InsertOutcome, NotarizationStore, PendingClaim,
};

/// In-memory store implementation.
///
/// Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    accounts: HashMap<Address, Account>,
    notarizations: HashMap<DocumentHash, NotarizationRecord>,
    claims: HashMap<DocumentHash, PendingClaim>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, address: &Address) -> Result<Option<Account>> {
        Ok(self.read()?.accounts.get(address).cloned())
    }

    async fn create_account(&self, account: &Account) -> Result<InsertOutcome> {
        let mut inner = self.write()?;
        if inner.accounts.contains_key(&account.address) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        inner
            .accounts
            .insert(account.address.clone(), account.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn set_nonce(&self, address: &Address, nonce: &Nonce) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.accounts.get_mut(address) {
            Some(account) => {
                account.nonce = *nonce;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate_nonce_if(
        &self,
        address: &Address,
        expected: &Nonce,
        next: &Nonce,
    ) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.accounts.get_mut(address) {
            Some(account) if account.nonce == *expected => {
                account.nonce = *next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn confirm_account(&self, address: &Address, code: &Nonce) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.accounts.get_mut(address) {
            Some(account) if account.confirmation.as_ref() == Some(code) => {
                account.confirmed = true;
                account.confirmation = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl NotarizationStore for MemoryStore {
    async fn claim(
        &self,
        document_hash: &DocumentHash,
        address: &Address,
        at: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let mut inner = self.write()?;

        if let Some(record) = inner.notarizations.get(document_hash) {
            return Ok(ClaimOutcome::Completed(record.clone()));
        }
        if let Some(claim) = inner.claims.get(document_hash) {
            return Ok(ClaimOutcome::Pending(claim.clone()));
        }

        inner.claims.insert(
            *document_hash,
            PendingClaim {
                document_hash: *document_hash,
                address: address.clone(),
                claimed_at: at,
            },
        );
        Ok(ClaimOutcome::Claimed)
    }

    async fn complete(&self, record: &NotarizationRecord) -> Result<InsertOutcome> {
        let mut inner = self.write()?;

        if inner.notarizations.contains_key(&record.document_hash) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        inner
            .notarizations
            .insert(record.document_hash, record.clone());
        inner.claims.remove(&record.document_hash);
        Ok(InsertOutcome::Inserted)
    }

    async fn release(&self, document_hash: &DocumentHash) -> Result<()> {
        self.write()?.claims.remove(document_hash);
        Ok(())
    }

    async fn get_notarization(
        &self,
        document_hash: &DocumentHash,
    ) -> Result<Option<NotarizationRecord>> {
        Ok(self.read()?.notarizations.get(document_hash).cloned())
    }

    async fn pending_claims(&self) -> Result<Vec<PendingClaim>> {
        let inner = self.read()?;
        let mut claims: Vec<PendingClaim> = inner.claims.values().cloned().collect();
        claims.sort_by_key(|c| c.claimed_at);
        Ok(claims)
    }
}

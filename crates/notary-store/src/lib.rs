//! # Notary Store
//!
//! Storage abstraction for the notary. Accounts and notarization records sit
//! behind the [`AccountStore`] and [`NotarizationStore`] traits so the core
//! never depends on a particular database.
//!
//! ## Key Types
//!
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`Account`] - A registered account and its current nonce
//! - [`ClaimOutcome`] - Result of reserving a document hash
//!
//! ## Usage
//!
//! ```rust,no_run
//! use notary_store::{NotarizationStore, SqliteStore};
//! use notary_core::DocumentHash;
//!
//! async fn example() {
//!     let store = SqliteStore::open("notary.db").unwrap();
//!     let doc = DocumentHash::of_document(b"contract");
//!     let record = store.get_notarization(&doc).await.unwrap();
//!     assert!(record.is_none());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic nonce rotation**: `rotate_nonce_if` is a single compare-and-set
//! - **Insert-if-absent**: accounts and records are never overwritten
//! - **Claims**: a document hash is reserved before its ledger submission and
//!   the reservation is replaced by the record once the ledger answers

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    Account, AccountStore, ClaimOutcome, InsertOutcome, NotarizationStore, PendingClaim,
};

//! # Notary
//!
//! Authenticated document notarization.
//!
//! ## Overview
//!
//! Clients prove ownership of an address, then ask the notary to anchor a
//! document hash on a public ledger:
//!
//! - **Envelopes**: every sensitive body is encrypted to its recipient and
//!   signed by its sender; the recipient checks the sender's address against
//!   the key it resolved itself
//! - **Sessions**: a challenge nonce, echoed back inside an envelope, buys a
//!   session token bound to the nonce and the caller's fingerprint. Every
//!   authenticated call spends the token and returns a new one
//! - **Anchoring**: the notary signs the document hash, commits
//!   `H(H(signature) || H(document_hash))` to the ledger and only then
//!   records the notarization. One record per document hash, ever
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use notary::{Notary, NotaryConfig};
//! use notary::envelope::EnvelopeIdentity;
//! use notary::ledger::{memory::MemoryLedger, KeypairWallet};
//! use notary::store::SqliteStore;
//!
//! let store = Arc::new(SqliteStore::open("notary.db").unwrap());
//! let notary = Notary::new(
//!     EnvelopeIdentity::generate(),
//!     store.clone(),
//!     store,
//!     Arc::new(MemoryLedger::new()),
//!     Arc::new(KeypairWallet::generate()),
//!     NotaryConfig::default(),
//! );
//! println!("server key: {}", notary.server_public_key());
//! ```
//!
//! ## Re-exports
//!
//! - `notary::core` - hashes, keys, addresses, tokens, records
//! - `notary::envelope` - sealed envelopes and identities
//! - `notary::store` - account and notarization storage
//! - `notary::ledger` - ledger client and signing wallet

pub mod anchor;
pub mod config;
pub mod error;
pub mod messages;
pub mod pipeline;
pub mod service;
pub mod session;

// Re-export component crates
pub use notary_core as core;
pub use notary_envelope as envelope;
pub use notary_ledger as ledger;
pub use notary_store as store;

pub use anchor::NotarizationAnchor;
pub use config::{AnchorConfig, NotaryConfig, SessionConfig};
pub use error::{ErrorStatus, NotaryError, Result};
pub use messages::{ChallengeBody, DocumentBody, RegistrationBody};
pub use pipeline::{Authorized, Pipeline, Request, RequestContext, Step};
pub use service::{Authenticated, Notary};
pub use session::{Session, SessionAuthenticator};

pub use notary_core::{
    Address, DocumentHash, Fingerprint, NotarizationRecord, Nonce, SessionToken, TransactionRef,
};
pub use notary_envelope::{EnvelopeIdentity, PublicIdentity, SecureEnvelope};

//! # Notary Ledger
//!
//! Interfaces to the outside world that the notarization workflow depends
//! on: a [`LedgerClient`] that commits notary hashes, and a
//! [`SigningWallet`] that signs document hashes.
//!
//! [`memory::MemoryLedger`] is a test double that records submissions.

pub mod client;
pub mod error;
pub mod wallet;

pub use client::{memory, LedgerClient};
pub use error::{LedgerError, Result};
pub use wallet::{KeypairWallet, SigningWallet};

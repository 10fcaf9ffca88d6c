//! # Notary Core
//!
//! Pure primitives for the notary: hashes, keys, addresses, session tokens
//! and notarization records.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Address`] - Account identifier derived from its public key material
//! - [`Nonce`] - Single-use challenge value, compared in constant time
//! - [`SessionToken`] - `H(H(nonce) || H(fingerprint))`, never stored
//! - [`NotarizationRecord`] - A completed, ledger-anchored notarization
//!
//! ## Hashing
//!
//! `H` is SHA-256 throughout. See [`Sha256Hash::hash_pair`].

pub mod crypto;
pub mod error;
pub mod record;
pub mod token;
pub mod types;

pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Hash};
pub use error::{CoreError, Result};
pub use record::{notary_hash, NotarizationRecord};
pub use token::SessionToken;
pub use types::{Address, DocumentHash, Fingerprint, Nonce, TransactionRef};

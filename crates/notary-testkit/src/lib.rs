//! # Notary Testkit
//!
//! Testing utilities for the notary.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed inputs with expected session tokens and notary
//!   hashes, for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: a notary on in-memory adapters and a scripted client
//!
//! ## Golden Vectors
//!
//! ```rust
//! use notary_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use notary_core::DocumentHash;
//! use notary_testkit::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let mut client = fixture.logged_in_client(1).await?;
//! let record = client
//!     .notarize(&fixture.notary, &DocumentHash::of_document(b"contract"))
//!     .await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{logged_in_clients, ClientFixture, TestFixture};
pub use vectors::{notary_vectors, token_vectors, verify_all_vectors, NotaryVector, TokenVector};

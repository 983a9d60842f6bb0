#![deny(missing_docs)]

//! # attest-core: Foundational Types for the Attest Registry
//!
//! This crate defines the primitives that every other crate in the workspace
//! builds on. It has no internal crate dependencies: only `serde`,
//! `serde_json`, `thiserror`, `chrono`, and `sha2` from the ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`CredentialId`] cannot be passed
//!    where a [`ProofId`] is expected, and a [`Did`] is never a bare string.
//!    Constructors validate; the store key delimiter `/` is rejected in every
//!    identifier so composite index keys stay unambiguous.
//!
//! 2. **Ledger time is integer seconds.** [`Timestamp`] wraps epoch seconds
//!    and treats `0` as "unset", matching the persisted record layout.
//!
//! 3. **[`CanonicalBytes`] is the sole path to structured digests.** Sorted
//!    keys, compact separators, floats rejected.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_raw, ContentDigest, DigestAlgorithm, Sha256Accumulator};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{CircuitId, CredentialId, Did, Principal, ProofId, KEY_DELIMITER};
pub use temporal::Timestamp;

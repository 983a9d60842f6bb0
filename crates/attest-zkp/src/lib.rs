//! # attest-zkp: Proof Verification Seam
//!
//! The registry treats proof verification as an opaque, synchronous, pure
//! call: `(verificationKey, publicInputs, proofData) -> Result<bool, _>`.
//! This crate defines that contract ([`ProofVerifier`]) and ships backends
//! behind feature flags.
//!
//! ## Outcomes
//!
//! A verifier has three distinct outcomes, and callers must not conflate
//! them:
//!
//! - `Ok(true)`: the proof satisfies the circuit.
//! - `Ok(false)`: the proof was checked and rejected.
//! - `Err(VerifyError)`: the proof could not be checked at all
//!   (malformed input, unusable key, backend fault).
//!
//! ## Backends
//!
//! - [`MockVerifier`] (`mock`, default): deterministic SHA-256 binding,
//!   **not zero-knowledge**; for tests and simulation.
//! - [`Ed25519Verifier`] (`ed25519`, default): the verification key is an
//!   Ed25519 public key and the proof a signature over the canonical public
//!   inputs.
//! - Any `Fn(&[u8], &[String], &[u8]) -> Result<bool, VerifyError>` closure,
//!   wrapped with [`from_fn`].

#[cfg(feature = "ed25519")]
pub mod ed25519;
#[cfg(feature = "mock")]
pub mod mock;
pub mod traits;

// Re-export primary types.
#[cfg(feature = "ed25519")]
pub use ed25519::Ed25519Verifier;
#[cfg(feature = "mock")]
pub use mock::MockVerifier;
pub use traits::{canonical_public_inputs, from_fn, FnVerifier, ProofVerifier, VerifyError};

//! # Verifier Trait
//!
//! Implementations must be deterministic and side-effect free: the same
//! arguments always produce the same outcome, nothing is retried, nothing
//! runs in the background. The registry calls `verify` inside an atomic
//! operation and persists its result.

use std::sync::Arc;

use attest_core::CanonicalBytes;
use thiserror::Error;

/// Verification could not be carried out.
///
/// Distinct from `Ok(false)`, which means the proof was checked and is
/// invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The proof bytes are structurally unusable.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// The verification key is empty or unusable for this backend.
    #[error("verification key unusable: {0}")]
    KeyMismatch(String),
    /// The backend itself failed.
    #[error("verifier backend fault: {0}")]
    Backend(String),
}

/// Opaque proof verification capability.
pub trait ProofVerifier: Send + Sync {
    /// Check `proof` against `verification_key` and ordered `public_inputs`.
    fn verify(
        &self,
        verification_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, VerifyError>;
}

/// Adapter turning a closure into a [`ProofVerifier`]. Build with [`from_fn`].
pub struct FnVerifier<F>(F);

/// Wrap a closure as a verifier.
pub fn from_fn<F>(f: F) -> FnVerifier<F>
where
    F: Fn(&[u8], &[String], &[u8]) -> Result<bool, VerifyError> + Send + Sync,
{
    FnVerifier(f)
}

impl<F> ProofVerifier for FnVerifier<F>
where
    F: Fn(&[u8], &[String], &[u8]) -> Result<bool, VerifyError> + Send + Sync,
{
    fn verify(
        &self,
        verification_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, VerifyError> {
        (self.0)(verification_key, public_inputs, proof)
    }
}

impl<F> std::fmt::Debug for FnVerifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnVerifier")
    }
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for Arc<V> {
    fn verify(
        &self,
        verification_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, VerifyError> {
        (**self).verify(verification_key, public_inputs, proof)
    }
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for Box<V> {
    fn verify(
        &self,
        verification_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, VerifyError> {
        (**self).verify(verification_key, public_inputs, proof)
    }
}

/// Canonical byte encoding of an ordered public-input list.
///
/// Backends that bind proofs to their inputs hash or sign these bytes, so a
/// reordered list is a different statement.
pub fn canonical_public_inputs(public_inputs: &[String]) -> Result<CanonicalBytes, VerifyError> {
    CanonicalBytes::new(&public_inputs)
        .map_err(|e| VerifyError::Backend(format!("failed to canonicalize public inputs: {e}")))
}

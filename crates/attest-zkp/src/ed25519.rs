//! # Ed25519 Verifier
//!
//! A real cryptographic backend for circuits whose "proof" is a designated
//! signer's attestation: the circuit's verification key is a 32-byte
//! Ed25519 public key and each proof is a 64-byte signature over the
//! canonical encoding of the public inputs, prefixed with
//! [`SIGNING_DOMAIN`].
//!
//! Verification uses `verify_strict`, which rejects small-order keys and
//! non-canonical signatures.

use ed25519_dalek::{Signature, Signer, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

pub use ed25519_dalek::SigningKey;

use crate::traits::{canonical_public_inputs, ProofVerifier, VerifyError};

/// Domain separator prepended to the signed message.
pub const SIGNING_DOMAIN: &[u8] = b"attest.proof.v1\x00";

/// Ed25519 signature verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

fn message(public_inputs: &[String]) -> Result<Vec<u8>, VerifyError> {
    let inputs = canonical_public_inputs(public_inputs)?;
    let mut msg = SIGNING_DOMAIN.to_vec();
    msg.extend_from_slice(inputs.as_bytes());
    Ok(msg)
}

impl Ed25519Verifier {
    /// Sign `public_inputs` so [`Ed25519Verifier::verify`] accepts it under
    /// `key.verifying_key()`.
    pub fn sign(&self, key: &SigningKey, public_inputs: &[String]) -> Result<Vec<u8>, VerifyError> {
        Ok(key.sign(&message(public_inputs)?).to_bytes().to_vec())
    }
}

impl ProofVerifier for Ed25519Verifier {
    fn verify(
        &self,
        verification_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, VerifyError> {
        let key_bytes: [u8; PUBLIC_KEY_LENGTH] = verification_key.try_into().map_err(|_| {
            VerifyError::KeyMismatch(format!(
                "expected {PUBLIC_KEY_LENGTH}-byte Ed25519 public key, got {} bytes",
                verification_key.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| VerifyError::KeyMismatch(format!("invalid Ed25519 public key: {e}")))?;

        let sig_bytes: [u8; SIGNATURE_LENGTH] = proof.try_into().map_err(|_| {
            VerifyError::MalformedProof(format!(
                "expected {SIGNATURE_LENGTH}-byte signature, got {} bytes",
                proof.len()
            ))
        })?;
        let signature = Signature::from_bytes(&sig_bytes);

        Ok(key.verify_strict(&message(public_inputs)?, &signature).is_ok())
    }
}

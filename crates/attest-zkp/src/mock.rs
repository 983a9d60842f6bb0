//! # Mock Verifier
//!
//! A deterministic, transparent stand-in for a real proof backend.
//!
//! ## How It Works
//!
//! ```text
//! proof = SHA256( verification_key || canonical(public_inputs) )
//! ```
//!
//! `verify()` recomputes the digest and compares. A proof that is not
//! exactly 32 bytes cannot be compared and returns
//! [`VerifyError::MalformedProof`]; an empty key returns
//! [`VerifyError::KeyMismatch`]. Anything else of the right shape is a clean
//! `Ok(false)`, which lets tests and the simulator exercise all three
//! outcomes.
//!
//! **NOT PRIVATE.** Anyone can recompute the proof from the inputs.

use attest_core::Sha256Accumulator;

use crate::traits::{canonical_public_inputs, ProofVerifier, VerifyError};

/// Length of a mock proof in bytes.
pub const MOCK_PROOF_LEN: usize = 32;

/// Deterministic SHA-256 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockVerifier;

impl MockVerifier {
    /// Produce the proof that [`MockVerifier::verify`] accepts for these
    /// arguments.
    pub fn prove(
        &self,
        verification_key: &[u8],
        public_inputs: &[String],
    ) -> Result<Vec<u8>, VerifyError> {
        if verification_key.is_empty() {
            return Err(VerifyError::KeyMismatch("empty verification key".to_string()));
        }
        let inputs = canonical_public_inputs(public_inputs)?;
        let mut acc = Sha256Accumulator::new();
        acc.update(verification_key);
        acc.update(inputs.as_bytes());
        Ok(acc.finalize().bytes.to_vec())
    }
}

impl ProofVerifier for MockVerifier {
    fn verify(
        &self,
        verification_key: &[u8],
        public_inputs: &[String],
        proof: &[u8],
    ) -> Result<bool, VerifyError> {
        if proof.len() != MOCK_PROOF_LEN {
            return Err(VerifyError::MalformedProof(format!(
                "expected {MOCK_PROOF_LEN} bytes, got {}",
                proof.len()
            )));
        }
        let expected = self.prove(verification_key, public_inputs)?;
        Ok(expected == proof)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn only_the_bound_proof_verifies(
            vk in proptest::collection::vec(any::<u8>(), 1..64),
            inputs in proptest::collection::vec("[0-9]{1,12}", 1..6),
            flip in 0usize..MOCK_PROOF_LEN,
        ) {
            let v = MockVerifier;
            let proof = v.prove(&vk, &inputs).unwrap();
            prop_assert_eq!(v.verify(&vk, &inputs, &proof), Ok(true));

            let mut tampered = proof.clone();
            tampered[flip] ^= 0x01;
            prop_assert_eq!(v.verify(&vk, &inputs, &tampered), Ok(false));

            let mut other = inputs.clone();
            other.push("0".to_string());
            prop_assert_eq!(v.verify(&vk, &other, &proof), Ok(false));
        }
    }
}

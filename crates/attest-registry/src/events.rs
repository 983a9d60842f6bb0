//! Structured events, one per committed mutation, for external indexers.

use serde::{Deserialize, Serialize};

use attest_core::{CircuitId, CredentialId, Did, Principal, ProofId};

/// A committed registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A credential was issued.
    CredentialIssued {
        /// Issuing principal.
        creator: Principal,
        /// Credential id.
        id: CredentialId,
        /// Issuer identity.
        issuer_did: Did,
        /// Subject identity.
        subject_did: Did,
    },
    /// A credential was revoked.
    CredentialRevoked {
        /// Revoking principal.
        caller: Principal,
        /// Credential id.
        id: CredentialId,
        /// Reason supplied by the caller.
        reason: String,
    },
    /// A circuit was registered.
    CircuitRegistered {
        /// Registering principal.
        creator: Principal,
        /// Circuit id.
        id: CircuitId,
        /// Human-readable name.
        name: String,
        /// Hex SHA-256 of the verifier bytecode.
        code_hash: String,
    },
    /// A circuit was deactivated.
    CircuitDeactivated {
        /// Deactivating principal.
        caller: Principal,
        /// Circuit id.
        id: CircuitId,
    },
    /// A proof was submitted and checked.
    ProofSubmitted {
        /// Submitting principal.
        submitter: Principal,
        /// Proof id.
        id: ProofId,
        /// Target circuit.
        circuit_id: CircuitId,
        /// Verifier outcome.
        verified: bool,
    },
}

impl RegistryEvent {
    /// Event type name, as serialized in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CredentialIssued { .. } => "credential_issued",
            Self::CredentialRevoked { .. } => "credential_revoked",
            Self::CircuitRegistered { .. } => "circuit_registered",
            Self::CircuitDeactivated { .. } => "circuit_deactivated",
            Self::ProofSubmitted { .. } => "proof_submitted",
        }
    }
}

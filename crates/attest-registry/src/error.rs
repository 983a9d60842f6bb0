//! # Registry Errors
//!
//! Every rejection a message handler can return. Errors fall into three
//! classes ([`ErrorClass`]):
//!
//! - **Precondition**: bad request or wrong state; nothing was written and
//!   the caller can resubmit a corrected request.
//! - **External dependency**: the verifier or identity registry could not
//!   answer; nothing was written. Distinct from a proof that verified
//!   `false`, which is not an error at all.
//! - **Internal**: storage faults or an unusable block clock.
//!
//! Invariant violations are not represented here: they are never raised
//! while handling messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use attest_core::{CircuitId, CredentialId, Did, ProofId, Timestamp, ValidationError};
use attest_store::StoreError;
use attest_zkp::VerifyError;

use crate::identity::IdentityError;

/// Coarse classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Rejected before any mutation; recoverable by the caller.
    Precondition,
    /// An external collaborator failed; nothing was written.
    ExternalDependency,
    /// Storage or host fault.
    Internal,
}

/// Fieldless tag for each [`RegistryError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    CircuitExists,
    CircuitNotFound,
    Unauthorized,
    AlreadyDeactivated,
    CredentialExists,
    UnknownOrInactiveIssuer,
    UnknownSubject,
    InvalidExpiry,
    CredentialNotFound,
    AlreadyRevoked,
    ProofExists,
    CircuitDeactivated,
    VerificationError,
    IdentityRegistry,
    InvalidBlockTime,
    InvalidGenesis,
    Store,
}

impl ErrorKind {
    /// The class this kind belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::VerificationError | Self::IdentityRegistry => ErrorClass::ExternalDependency,
            Self::InvalidBlockTime | Self::Store => ErrorClass::Internal,
            _ => ErrorClass::Precondition,
        }
    }
}

/// Errors returned by registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The message failed stateless validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A circuit with this id is already registered.
    #[error("circuit {0} already exists")]
    CircuitExists(CircuitId),

    /// No circuit with this id is registered.
    #[error("circuit {0} not found")]
    CircuitNotFound(CircuitId),

    /// The acting principal may not perform this operation.
    #[error("unauthorized: {actor} may not {action}")]
    Unauthorized {
        /// The principal that attempted the operation.
        actor: String,
        /// What was attempted.
        action: String,
    },

    /// The circuit is already inactive.
    #[error("circuit {0} is already deactivated")]
    AlreadyDeactivated(CircuitId),

    /// A credential with this id has already been issued.
    #[error("credential {0} already exists")]
    CredentialExists(CredentialId),

    /// The issuer DID does not resolve, or resolves to an inactive identity.
    #[error("issuer {0} is unknown or inactive")]
    UnknownOrInactiveIssuer(Did),

    /// The subject DID does not resolve.
    #[error("subject {0} is unknown")]
    UnknownSubject(Did),

    /// The expiry is not in the future or exceeds the validity window.
    #[error("invalid expiry {expires_at}: {reason}")]
    InvalidExpiry {
        /// The rejected expiry.
        expires_at: Timestamp,
        /// Why it was rejected.
        reason: String,
    },

    /// No credential with this id exists.
    #[error("credential {0} not found")]
    CredentialNotFound(CredentialId),

    /// The credential is already revoked.
    #[error("credential {0} is already revoked")]
    AlreadyRevoked(CredentialId),

    /// A proof with this id has already been submitted.
    #[error("proof {0} already exists")]
    ProofExists(ProofId),

    /// The target circuit is inactive; verification was not attempted.
    #[error("circuit {0} is deactivated")]
    CircuitDeactivated(CircuitId),

    /// The verifier could not check the proof. Nothing was persisted.
    #[error("verification of proof {proof_id} could not be completed: {source}")]
    VerificationError {
        /// The proof being submitted.
        proof_id: ProofId,
        /// The verifier's error.
        #[source]
        source: VerifyError,
    },

    /// The identity registry could not be consulted.
    #[error("identity registry: {0}")]
    IdentityRegistry(#[from] IdentityError),

    /// The host supplied an unusable block time.
    #[error("invalid block time: {0}")]
    InvalidBlockTime(String),

    /// A genesis document failed validation or targets a non-empty store.
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    /// The store failed.
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationError> for RegistryError {
    fn from(e: ValidationError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

impl RegistryError {
    /// The fieldless tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::CircuitExists(_) => ErrorKind::CircuitExists,
            Self::CircuitNotFound(_) => ErrorKind::CircuitNotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::AlreadyDeactivated(_) => ErrorKind::AlreadyDeactivated,
            Self::CredentialExists(_) => ErrorKind::CredentialExists,
            Self::UnknownOrInactiveIssuer(_) => ErrorKind::UnknownOrInactiveIssuer,
            Self::UnknownSubject(_) => ErrorKind::UnknownSubject,
            Self::InvalidExpiry { .. } => ErrorKind::InvalidExpiry,
            Self::CredentialNotFound(_) => ErrorKind::CredentialNotFound,
            Self::AlreadyRevoked(_) => ErrorKind::AlreadyRevoked,
            Self::ProofExists(_) => ErrorKind::ProofExists,
            Self::CircuitDeactivated(_) => ErrorKind::CircuitDeactivated,
            Self::VerificationError { .. } => ErrorKind::VerificationError,
            Self::IdentityRegistry(_) => ErrorKind::IdentityRegistry,
            Self::InvalidBlockTime(_) => ErrorKind::InvalidBlockTime,
            Self::InvalidGenesis(_) => ErrorKind::InvalidGenesis,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    /// The class this error belongs to.
    pub fn class(&self) -> ErrorClass {
        self.kind().class()
    }

    pub(crate) fn unauthorized(actor: impl std::fmt::Display, action: impl Into<String>) -> Self {
        Self::Unauthorized {
            actor: actor.to_string(),
            action: action.into(),
        }
    }
}

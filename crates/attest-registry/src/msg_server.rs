//! # Message Server
//!
//! Single entry point for every mutating operation. Wires the three
//! registries over one store, one identity resolver and one verifier, and
//! routes a [`Msg`] to its handler.
//!
//! The host is responsible for serial execution: each `deliver` call is one
//! transaction applied against the committed result of the previous one.

use serde::{Deserialize, Serialize};

use attest_store::KvStore;
use attest_zkp::ProofVerifier;

use crate::circuit::{
    CircuitRecord, CircuitRegistry, MsgDeactivateCircuit, MsgRegisterCircuit,
    RegisterCircuitResponse,
};
use crate::context::ExecContext;
use crate::credential::{
    CredentialRecord, CredentialRegistry, MsgIssueCredential, MsgRevokeCredential,
};
use crate::error::RegistryError;
use crate::identity::IdentityResolver;
use crate::params::RegistryParams;
use crate::proof::{MsgSubmitProof, ProofRegistry, SubmitProofResponse};

/// Any mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    RegisterCircuit(MsgRegisterCircuit),
    DeactivateCircuit(MsgDeactivateCircuit),
    IssueCredential(MsgIssueCredential),
    RevokeCredential(MsgRevokeCredential),
    SubmitProof(MsgSubmitProof),
}

/// Fieldless tag for a [`Msg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgKind {
    RegisterCircuit,
    DeactivateCircuit,
    IssueCredential,
    RevokeCredential,
    SubmitProof,
}

impl MsgKind {
    /// Every kind, in declaration order.
    pub const ALL: [MsgKind; 5] = [
        MsgKind::RegisterCircuit,
        MsgKind::DeactivateCircuit,
        MsgKind::IssueCredential,
        MsgKind::RevokeCredential,
        MsgKind::SubmitProof,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegisterCircuit => "register_circuit",
            Self::DeactivateCircuit => "deactivate_circuit",
            Self::IssueCredential => "issue_credential",
            Self::RevokeCredential => "revoke_credential",
            Self::SubmitProof => "submit_proof",
        }
    }
}

impl std::fmt::Display for MsgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Msg {
    pub fn kind(&self) -> MsgKind {
        match self {
            Self::RegisterCircuit(_) => MsgKind::RegisterCircuit,
            Self::DeactivateCircuit(_) => MsgKind::DeactivateCircuit,
            Self::IssueCredential(_) => MsgKind::IssueCredential,
            Self::RevokeCredential(_) => MsgKind::RevokeCredential,
            Self::SubmitProof(_) => MsgKind::SubmitProof,
        }
    }

    /// Stateless shape checks for whichever message this is.
    pub fn validate_basic(&self) -> Result<(), RegistryError> {
        match self {
            Self::RegisterCircuit(m) => m.validate_basic(),
            Self::DeactivateCircuit(m) => m.validate_basic(),
            Self::IssueCredential(m) => m.validate_basic(),
            Self::RevokeCredential(m) => m.validate_basic(),
            Self::SubmitProof(m) => m.validate_basic(),
        }
    }
}

/// Successful handler output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MsgResponse {
    CircuitRegistered(RegisterCircuitResponse),
    CircuitDeactivated(CircuitRecord),
    CredentialIssued(CredentialRecord),
    CredentialRevoked(CredentialRecord),
    ProofSubmitted(SubmitProofResponse),
}

/// All three registries behind one router.
#[derive(Debug, Clone)]
pub struct MsgServer<S, I, V> {
    store: S,
    circuits: CircuitRegistry<S>,
    credentials: CredentialRegistry<S, I>,
    proofs: ProofRegistry<S, V>,
}

impl<S, I, V> MsgServer<S, I, V>
where
    S: KvStore + Clone,
    I: IdentityResolver,
    V: ProofVerifier,
{
    pub fn new(store: S, identities: I, verifier: V, params: RegistryParams) -> Self {
        Self {
            circuits: CircuitRegistry::new(store.clone()),
            credentials: CredentialRegistry::new(store.clone(), identities, params),
            proofs: ProofRegistry::new(store.clone(), verifier),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn circuits(&self) -> &CircuitRegistry<S> {
        &self.circuits
    }

    pub fn credentials(&self) -> &CredentialRegistry<S, I> {
        &self.credentials
    }

    pub fn proofs(&self) -> &ProofRegistry<S, V> {
        &self.proofs
    }

    pub fn params(&self) -> &RegistryParams {
        self.credentials.params()
    }

    pub fn register_circuit(
        &self,
        ctx: &mut ExecContext,
        msg: MsgRegisterCircuit,
    ) -> Result<RegisterCircuitResponse, RegistryError> {
        self.circuits.register(ctx, msg)
    }

    pub fn deactivate_circuit(
        &self,
        ctx: &mut ExecContext,
        msg: MsgDeactivateCircuit,
    ) -> Result<CircuitRecord, RegistryError> {
        self.circuits.deactivate(ctx, msg)
    }

    pub fn issue_credential(
        &self,
        ctx: &mut ExecContext,
        msg: MsgIssueCredential,
    ) -> Result<CredentialRecord, RegistryError> {
        self.credentials.issue(ctx, msg)
    }

    pub fn revoke_credential(
        &self,
        ctx: &mut ExecContext,
        msg: MsgRevokeCredential,
    ) -> Result<CredentialRecord, RegistryError> {
        self.credentials.revoke(ctx, msg)
    }

    pub fn submit_proof(
        &self,
        ctx: &mut ExecContext,
        msg: MsgSubmitProof,
    ) -> Result<SubmitProofResponse, RegistryError> {
        self.proofs.submit(ctx, msg)
    }

    /// Route one message to its handler.
    pub fn deliver(&self, ctx: &mut ExecContext, msg: Msg) -> Result<MsgResponse, RegistryError> {
        let kind = msg.kind();
        let result = match msg {
            Msg::RegisterCircuit(m) => self.register_circuit(ctx, m).map(MsgResponse::CircuitRegistered),
            Msg::DeactivateCircuit(m) => {
                self.deactivate_circuit(ctx, m).map(MsgResponse::CircuitDeactivated)
            }
            Msg::IssueCredential(m) => self.issue_credential(ctx, m).map(MsgResponse::CredentialIssued),
            Msg::RevokeCredential(m) => {
                self.revoke_credential(ctx, m).map(MsgResponse::CredentialRevoked)
            }
            Msg::SubmitProof(m) => self.submit_proof(ctx, m).map(MsgResponse::ProofSubmitted),
        };
        if let Err(e) = &result {
            tracing::debug!(msg = %kind, kind = ?e.kind(), error = %e, "message rejected");
        }
        result
    }
}

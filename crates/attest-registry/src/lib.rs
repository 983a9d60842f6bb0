//! # attest-registry: Credential, Circuit and Proof Registries
//!
//! The ledger-side state machine: registers verification circuits, issues
//! and revokes verifiable credentials, and accepts proofs verified against
//! registered circuits.
//!
//! ## Modules
//!
//! - **Circuits** (`circuit.rs`): register with a self-computed code hash;
//!   the creator may deactivate once.
//! - **Credentials** (`credential.rs`): issuance checked against the external
//!   identity registry, revocation by the issuing principal, paginated
//!   by-issuer and by-subject reads.
//! - **Proofs** (`proof.rs`): synchronous verification through a pluggable
//!   [`attest_zkp::ProofVerifier`], rejected proofs retained for audit.
//! - **Router** (`msg_server.rs`): one [`MsgServer`] over a shared store.
//! - **Genesis** (`genesis.rs`): export and import of primary state, and
//!   regeneration of every secondary index from the primary records.
//!
//! ## Design
//!
//! No package-level state. Every registry is a handle over an explicit
//! [`attest_store::KvStore`], and the identity registry is a read-only
//! [`IdentityResolver`] injected at construction. Tests build isolated state
//! per case.
//!
//! Each mutation is assembled into one write batch with its index entries
//! and committed atomically. Events are appended to the [`ExecContext`]
//! only after the commit succeeds.
//!
//! ## Crate Policy
//!
//! - Block time comes from [`ExecContext`], never the wall clock.
//! - No locking: the host supplies serial execution.
//! - Handlers never retry the verifier or the identity registry.

pub mod circuit;
pub mod context;
pub mod credential;
pub mod error;
pub mod events;
pub mod genesis;
pub mod hex_bytes;
pub mod identity;
pub mod msg_server;
pub mod params;
pub mod proof;

// Re-export primary types.
pub use circuit::{
    compute_code_hash, CircuitRecord, CircuitRegistry, MsgDeactivateCircuit, MsgRegisterCircuit,
    RegisterCircuitResponse,
};
pub use context::ExecContext;
pub use credential::{
    CredentialRecord, CredentialRegistry, CredentialStatus, MsgIssueCredential,
    MsgRevokeCredential,
};
pub use error::{ErrorClass, ErrorKind, RegistryError};
pub use events::RegistryEvent;
pub use genesis::{GenesisState, IndexRebuild};
pub use identity::{IdentityError, IdentityRecord, IdentityResolver, MemoryIdentityRegistry};
pub use msg_server::{Msg, MsgKind, MsgResponse, MsgServer};
pub use params::{Pagination, ParamsError, RegistryParams, DEFAULT_MAX_VALIDITY_SECS};
pub use proof::{MsgSubmitProof, ProofRecord, ProofRegistry, SubmitProofResponse};

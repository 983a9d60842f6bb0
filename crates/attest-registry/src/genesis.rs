//! # Genesis Export, Import and Index Rebuild
//!
//! A [`GenesisState`] holds every primary record of the three registries.
//! Secondary indexes are derived state: they are never exported, and both
//! [`MsgServer::import_genesis`] and [`MsgServer::rebuild_indexes`]
//! regenerate the by-issuer, by-subject and by-circuit ranges from the
//! primary records in a single batch.
//!
//! Rebuilt entries keep their previous relative order when the old entry is
//! still readable. Otherwise they fall back to record time, then id.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use attest_core::ContentDigest;
use attest_store::keys::{self, CIRCUIT_PREFIX, CREDENTIAL_PREFIX, PROOF_PREFIX};
use attest_store::{codec, KvStore, WriteBatch};
use attest_zkp::ProofVerifier;

use crate::circuit::CircuitRecord;
use crate::credential::{self, CredentialRecord};
use crate::error::RegistryError;
use crate::identity::IdentityResolver;
use crate::msg_server::MsgServer;
use crate::proof::{self, ProofRecord};

/// Full primary state of the registries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    pub circuits: Vec<CircuitRecord>,
    pub credentials: Vec<CredentialRecord>,
    pub proofs: Vec<ProofRecord>,
}

/// Index entries written by a rebuild, per record family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRebuild {
    /// Credentials re-appended to both the by-issuer and by-subject ranges.
    pub credentials: usize,
    /// Proofs re-appended to the by-circuit range.
    pub proofs: usize,
}

impl GenesisState {
    /// True if the state holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty() && self.credentials.is_empty() && self.proofs.is_empty()
    }

    /// Structural checks that need neither the store nor the identity registry.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut circuits = BTreeMap::new();
        for c in &self.circuits {
            c.id.check().map_err(|e| invalid(format!("circuit id: {e}")))?;
            c.creator
                .check()
                .map_err(|e| invalid(format!("circuit {}: {e}", c.id)))?;
            if c.name.trim().is_empty() {
                return Err(invalid(format!("circuit {}: empty name", c.id)));
            }
            if !ContentDigest::is_hex_sha256(&c.code_hash) {
                return Err(invalid(format!("circuit {}: malformed code hash", c.id)));
            }
            if c.verification_key.is_empty() {
                return Err(invalid(format!("circuit {}: empty verification key", c.id)));
            }
            if circuits.insert(c.id.as_str(), c).is_some() {
                return Err(invalid(format!("duplicate circuit {}", c.id)));
            }
        }

        let mut credentials = BTreeSet::new();
        for vc in &self.credentials {
            vc.id.check().map_err(|e| invalid(format!("credential id: {e}")))?;
            for check in [vc.issuer_did.check(), vc.subject_did.check(), vc.creator.check()] {
                check.map_err(|e| invalid(format!("credential {}: {e}", vc.id)))?;
            }
            if vc.expires_at <= vc.issued_at {
                return Err(invalid(format!(
                    "credential {}: expires_at {} not after issued_at {}",
                    vc.id, vc.expires_at, vc.issued_at
                )));
            }
            if vc.revoked != vc.revoked_at.is_set() {
                return Err(invalid(format!(
                    "credential {}: revoked={} but revoked_at={}",
                    vc.id, vc.revoked, vc.revoked_at
                )));
            }
            if vc.revoked && vc.revoked_at < vc.issued_at {
                return Err(invalid(format!("credential {}: revoked before issuance", vc.id)));
            }
            if !vc.revoked && vc.revocation_reason.is_some() {
                return Err(invalid(format!("credential {}: reason without revocation", vc.id)));
            }
            if !credentials.insert(vc.id.as_str()) {
                return Err(invalid(format!("duplicate credential {}", vc.id)));
            }
        }

        let mut proofs = BTreeSet::new();
        for p in &self.proofs {
            p.id.check().map_err(|e| invalid(format!("proof id: {e}")))?;
            p.submitter
                .check()
                .map_err(|e| invalid(format!("proof {}: {e}", p.id)))?;
            let Some(circuit) = circuits.get(p.circuit_id.as_str()) else {
                return Err(invalid(format!("proof {}: unknown circuit {}", p.id, p.circuit_id)));
            };
            if p.verification_key != circuit.verification_key || p.verifier_reference != circuit.code_hash {
                return Err(invalid(format!(
                    "proof {}: verifier material differs from circuit {}",
                    p.id, p.circuit_id
                )));
            }
            if p.verified != p.verified_at.is_set() {
                return Err(invalid(format!(
                    "proof {}: verified={} but verified_at={}",
                    p.id, p.verified, p.verified_at
                )));
            }
            if p.verified && p.verified_at < p.submitted_at {
                return Err(invalid(format!("proof {}: verified before submission", p.id)));
            }
            if !proofs.insert(p.id.as_str()) {
                return Err(invalid(format!("duplicate proof {}", p.id)));
            }
        }
        Ok(())
    }
}

impl<S, I, V> MsgServer<S, I, V>
where
    S: KvStore + Clone,
    I: IdentityResolver,
    V: ProofVerifier,
{
    /// Every primary record, each family ordered by id.
    pub fn export_genesis(&self) -> Result<GenesisState, RegistryError> {
        Ok(GenesisState {
            circuits: self.circuits().list()?,
            credentials: self.credentials().list_all()?,
            proofs: self.proofs().list_all()?,
        })
    }

    /// Load a validated genesis into a store holding no registry records.
    ///
    /// Primary records and freshly derived indexes commit in one batch.
    pub fn import_genesis(&self, genesis: &GenesisState) -> Result<IndexRebuild, RegistryError> {
        genesis.validate()?;
        if !self.export_genesis()?.is_empty() {
            return Err(invalid("store already holds registry records"));
        }

        let mut batch = WriteBatch::new();
        for c in &genesis.circuits {
            batch.put(keys::primary_key(CIRCUIT_PREFIX, c.id.as_str()), codec::encode(c)?);
        }
        for vc in &genesis.credentials {
            batch.put(keys::primary_key(CREDENTIAL_PREFIX, vc.id.as_str()), codec::encode(vc)?);
        }
        for p in &genesis.proofs {
            batch.put(keys::primary_key(PROOF_PREFIX, p.id.as_str()), codec::encode(p)?);
        }
        let rebuilt = stage_indexes(self.store(), &mut batch, &genesis.credentials, &genesis.proofs)?;
        self.store().write(batch)?;

        tracing::info!(
            circuits = genesis.circuits.len(),
            credentials = rebuilt.credentials,
            proofs = rebuilt.proofs,
            "genesis imported"
        );
        Ok(rebuilt)
    }

    /// Regenerate all three secondary indexes from the primary records.
    ///
    /// Stale, duplicate and dangling entries are dropped; missing ones are
    /// restored.
    pub fn rebuild_indexes(&self) -> Result<IndexRebuild, RegistryError> {
        let credentials = self.credentials().list_all()?;
        let proofs = self.proofs().list_all()?;
        let mut batch = WriteBatch::new();
        let rebuilt = stage_indexes(self.store(), &mut batch, &credentials, &proofs)?;
        self.store().write(batch)?;

        tracing::info!(
            credentials = rebuilt.credentials,
            proofs = rebuilt.proofs,
            "secondary indexes rebuilt"
        );
        Ok(rebuilt)
    }
}

fn stage_indexes<S: KvStore>(
    store: &S,
    batch: &mut WriteBatch,
    credentials: &[CredentialRecord],
    proofs: &[ProofRecord],
) -> Result<IndexRebuild, RegistryError> {
    batch.delete(keys::INDEX_SEQUENCE_KEY.to_vec());
    credential::stage_index_rebuild(store, batch, credentials)?;
    proof::stage_index_rebuild(store, batch, proofs)?;
    Ok(IndexRebuild {
        credentials: credentials.len(),
        proofs: proofs.len(),
    })
}

fn invalid(reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidGenesis(reason.into())
}

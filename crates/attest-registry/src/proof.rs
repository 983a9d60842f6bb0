//! # Proof Registry
//!
//! Accepts proof submissions, verifies them synchronously against the
//! target circuit, and persists the outcome with a by-circuit index entry.
//!
//! A verifier answering `Ok(false)` is a rejected proof. It is persisted
//! with `verified = false` and indexed like any other submission. A verifier
//! answering `Err(_)` means the proof could not be checked; the submission
//! fails with [`RegistryError::VerificationError`] and nothing is written.
//!
//! The circuit's verification key and code hash are copied into the record
//! so the audit trail survives later circuit deactivation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use attest_core::{CircuitId, Principal, ProofId, Timestamp};
use attest_store::keys::{self, PROOF_BY_CIRCUIT_PREFIX, PROOF_PREFIX};
use attest_store::{codec, KvStore, SecondaryIndex, WriteBatch};
use attest_zkp::ProofVerifier;

use crate::circuit::{CircuitRecord, CircuitRegistry};
use crate::context::ExecContext;
use crate::credential::index_map;
use crate::error::RegistryError;
use crate::events::RegistryEvent;
use crate::hex_bytes;

const BY_CIRCUIT: SecondaryIndex = SecondaryIndex::new(PROOF_BY_CIRCUIT_PREFIX);

/// One proof submission and its verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub id: ProofId,
    pub circuit_id: CircuitId,
    pub submitter: Principal,
    pub public_inputs: Vec<String>,
    #[serde(with = "hex_bytes")]
    pub proof_data: Vec<u8>,
    /// Copied from the circuit at submission time.
    #[serde(with = "hex_bytes")]
    pub verification_key: Vec<u8>,
    /// The circuit's code hash at submission time.
    pub verifier_reference: String,
    pub submitted_at: Timestamp,
    pub verified: bool,
    /// [`Timestamp::ZERO`] unless verified.
    pub verified_at: Timestamp,
}

/// Submit a proof against a registered circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSubmitProof {
    pub submitter: Principal,
    pub id: ProofId,
    pub circuit_id: CircuitId,
    pub public_inputs: Vec<String>,
    #[serde(with = "hex_bytes")]
    pub proof_data: Vec<u8>,
}

impl MsgSubmitProof {
    /// Stateless shape checks.
    pub fn validate_basic(&self) -> Result<(), RegistryError> {
        self.submitter.check()?;
        self.id.check()?;
        self.circuit_id.check()?;
        if self.public_inputs.is_empty() {
            return Err(RegistryError::InvalidRequest(
                "at least one public input is required".into(),
            ));
        }
        if self.proof_data.is_empty() {
            return Err(RegistryError::InvalidRequest("proof data must be non-empty".into()));
        }
        Ok(())
    }
}

/// Result of a submission that reached the verifier cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProofResponse {
    pub record: ProofRecord,
    pub verified: bool,
}

/// Proof store handle. Reads circuits through its own [`CircuitRegistry`]
/// over the same store.
#[derive(Debug, Clone)]
pub struct ProofRegistry<S, V> {
    store: S,
    circuits: CircuitRegistry<S>,
    verifier: V,
}

impl<S: KvStore + Clone, V: ProofVerifier> ProofRegistry<S, V> {
    pub fn new(store: S, verifier: V) -> Self {
        Self {
            circuits: CircuitRegistry::new(store.clone()),
            store,
            verifier,
        }
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Verify and persist a proof.
    pub fn submit(
        &self,
        ctx: &mut ExecContext,
        msg: MsgSubmitProof,
    ) -> Result<SubmitProofResponse, RegistryError> {
        msg.validate_basic()?;
        let now = ctx.now()?;

        if self.exists(&msg.id)? {
            return Err(RegistryError::ProofExists(msg.id));
        }
        let circuit: CircuitRecord = self
            .circuits
            .get(&msg.circuit_id)?
            .ok_or_else(|| RegistryError::CircuitNotFound(msg.circuit_id.clone()))?;
        if !circuit.active {
            return Err(RegistryError::CircuitDeactivated(msg.circuit_id));
        }

        let verified = match self.verifier.verify(
            &circuit.verification_key,
            &msg.public_inputs,
            &msg.proof_data,
        ) {
            Ok(verified) => verified,
            Err(source) => {
                tracing::warn!(proof_id = %msg.id, circuit_id = %msg.circuit_id, error = %source, "verifier failed");
                return Err(RegistryError::VerificationError {
                    proof_id: msg.id,
                    source,
                });
            }
        };

        let record = ProofRecord {
            id: msg.id,
            circuit_id: msg.circuit_id,
            submitter: msg.submitter,
            public_inputs: msg.public_inputs,
            proof_data: msg.proof_data,
            verification_key: circuit.verification_key,
            verifier_reference: circuit.code_hash,
            submitted_at: now,
            verified,
            verified_at: if verified { now } else { Timestamp::ZERO },
        };

        let id = record.id.as_str();
        let mut batch = WriteBatch::new();
        batch.put(keys::primary_key(PROOF_PREFIX, id), codec::encode(&record)?);
        BY_CIRCUIT.stage_append(&self.store, &mut batch, record.circuit_id.as_str(), id)?;
        self.store.write(batch)?;

        tracing::info!(proof_id = %record.id, circuit_id = %record.circuit_id, verified, "proof submitted");
        ctx.emit(RegistryEvent::ProofSubmitted {
            submitter: record.submitter.clone(),
            id: record.id.clone(),
            circuit_id: record.circuit_id.clone(),
            verified,
        });
        Ok(SubmitProofResponse { record, verified })
    }

    pub fn get(&self, id: &ProofId) -> Result<Option<ProofRecord>, RegistryError> {
        let key = keys::primary_key(PROOF_PREFIX, id.as_str());
        match self.store.get(&key)? {
            Some(bytes) => Ok(Some(codec::decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, id: &ProofId) -> Result<bool, RegistryError> {
        Ok(self.store.has(&keys::primary_key(PROOF_PREFIX, id.as_str()))?)
    }

    /// Proofs submitted against `circuit_id`, in submission order.
    pub fn list_by_circuit(&self, circuit_id: &CircuitId) -> Result<Vec<ProofRecord>, RegistryError> {
        let mut out = Vec::new();
        for raw_id in BY_CIRCUIT.record_ids(&self.store, circuit_id.as_str())? {
            let key = keys::primary_key(PROOF_PREFIX, &raw_id);
            match self.store.get(&key)? {
                Some(bytes) => out.push(codec::decode(&key, &bytes)?),
                None => {
                    tracing::warn!(proof_id = %raw_id, circuit_id = %circuit_id, "index entry has no primary record");
                }
            }
        }
        Ok(out)
    }

    /// Every proof, ordered by id.
    pub fn list_all(&self) -> Result<Vec<ProofRecord>, RegistryError> {
        self.store
            .scan_prefix(PROOF_PREFIX)?
            .into_iter()
            .map(|(k, v)| Ok(codec::decode(&k, &v)?))
            .collect()
    }

    /// Raw by-circuit index: circuit id to proof ids in insertion order.
    pub fn circuit_index(&self) -> Result<BTreeMap<String, Vec<String>>, RegistryError> {
        index_map(&self.store, BY_CIRCUIT)
    }
}

/// Stage a from-scratch rebuild of the by-circuit index over `records`.
///
/// Ordered by submission time, then previous insertion sequence, then id.
/// The caller must stage the reset of the sequence counter first.
pub(crate) fn stage_index_rebuild<S: KvStore>(
    store: &S,
    batch: &mut WriteBatch,
    records: &[ProofRecord],
) -> Result<(), RegistryError> {
    let prior = BY_CIRCUIT.stage_clear(store, batch)?;
    let position = |r: &ProofRecord| prior.get(r.id.as_str()).copied().unwrap_or(u64::MAX);
    let mut ordered: Vec<&ProofRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        (a.submitted_at, position(a), a.id.as_str()).cmp(&(b.submitted_at, position(b), b.id.as_str()))
    });
    for record in ordered {
        BY_CIRCUIT.stage_append(store, batch, record.circuit_id.as_str(), record.id.as_str())?;
    }
    Ok(())
}

//! Shared fixtures for unit tests in this crate.

use std::collections::{BTreeMap, BTreeSet};

use attest_core::{CircuitId, CredentialId, Did, Principal, ProofId, Timestamp};
use attest_registry::{
    compute_code_hash, CircuitRecord, CredentialRecord, IdentityRecord, MemoryIdentityRegistry,
    MsgIssueCredential, MsgRegisterCircuit, MsgServer, ProofRecord, RegistryParams,
};
use attest_store::MemoryStore;
use attest_zkp::MockVerifier;

use crate::snapshot::{IdMap, Lookup, StateSnapshot};

pub fn principal(s: &str) -> Principal {
    Principal::new(s).unwrap()
}

pub fn did(s: &str) -> Did {
    Did::new(s).unwrap()
}

pub fn make_server() -> MsgServer<MemoryStore, MemoryIdentityRegistry, MockVerifier> {
    let identities = MemoryIdentityRegistry::new();
    identities.register(did("did:iss1"), principal("attest1issuerq"));
    identities.register(did("did:sub1"), principal("attest1holder"));
    MsgServer::new(MemoryStore::new(), identities, MockVerifier, RegistryParams::default())
}

pub fn issue_msg(id: &str, expires_at: i64) -> MsgIssueCredential {
    MsgIssueCredential {
        creator: principal("attest1issuerq"),
        id: CredentialId::new(id).unwrap(),
        issuer_did: did("did:iss1"),
        subject_did: did("did:sub1"),
        credential_schema: "https://schema.org/Person".to_string(),
        credential_data: "{}".to_string(),
        proof: "sig".to_string(),
        expires_at: Timestamp::from_epoch_secs(expires_at),
    }
}

pub fn register_msg(id: &str) -> MsgRegisterCircuit {
    MsgRegisterCircuit {
        creator: principal("attest1creator"),
        id: CircuitId::new(id).unwrap(),
        name: "circuit".to_string(),
        description: String::new(),
        verifier_bytecode: b"B".to_vec(),
        verification_key: b"vk".to_vec(),
    }
}

pub fn make_credential(id: &str, issued_at: i64, expires_at: i64) -> CredentialRecord {
    CredentialRecord {
        id: CredentialId::new(id).unwrap(),
        issuer_did: did("did:iss1"),
        subject_did: did("did:sub1"),
        credential_schema: "https://schema.org/Person".to_string(),
        credential_data: "{}".to_string(),
        proof: "sig".to_string(),
        creator: principal("attest1issuerq"),
        issued_at: Timestamp::from_epoch_secs(issued_at),
        expires_at: Timestamp::from_epoch_secs(expires_at),
        revoked: false,
        revoked_at: Timestamp::ZERO,
        revocation_reason: None,
    }
}

pub fn make_circuit(id: &str, creator: &str, active: bool) -> CircuitRecord {
    CircuitRecord {
        id: CircuitId::new(id).unwrap(),
        name: "circuit".to_string(),
        description: String::new(),
        code_hash: compute_code_hash(b"B"),
        verification_key: b"vk".to_vec(),
        creator: principal(creator),
        active,
        created_at: Timestamp::from_epoch_secs(500),
    }
}

pub fn make_proof(id: &str, circuit: &CircuitRecord, verified: bool) -> ProofRecord {
    ProofRecord {
        id: ProofId::new(id).unwrap(),
        circuit_id: circuit.id.clone(),
        submitter: principal("attest1submit"),
        public_inputs: vec!["1".to_string()],
        proof_data: vec![0u8; 32],
        verification_key: circuit.verification_key.clone(),
        verifier_reference: circuit.code_hash.clone(),
        submitted_at: Timestamp::from_epoch_secs(600),
        verified,
        verified_at: if verified {
            Timestamp::from_epoch_secs(600)
        } else {
            Timestamp::ZERO
        },
    }
}

pub fn empty_snapshot() -> StateSnapshot {
    StateSnapshot {
        now: Timestamp::from_epoch_secs(1000),
        params: RegistryParams::default(),
        credentials: Vec::new(),
        circuits: Vec::new(),
        proofs: Vec::new(),
        credential_lookups: BTreeMap::new(),
        circuit_lookups: BTreeMap::new(),
        proof_lookups: BTreeMap::new(),
        issuer_index: IdMap::new(),
        subject_index: IdMap::new(),
        circuit_index: IdMap::new(),
        by_issuer: IdMap::new(),
        by_subject: IdMap::new(),
        by_circuit: IdMap::new(),
        identities: BTreeMap::new(),
    }
}

/// Snapshot whose derived fields agree exactly with the given primaries,
/// with `did:iss1` (controller `attest1issuerq`) and `did:sub1` resolvable.
pub fn consistent_snapshot(
    credentials: Vec<CredentialRecord>,
    circuits: Vec<CircuitRecord>,
    proofs: Vec<ProofRecord>,
) -> StateSnapshot {
    let ok = Lookup {
        found: true,
        matches: true,
        exists: true,
    };
    let mut snap = empty_snapshot();
    for c in &credentials {
        snap.credential_lookups.insert(c.id.to_string(), ok);
        for (map, fk) in [
            (&mut snap.issuer_index, &c.issuer_did),
            (&mut snap.subject_index, &c.subject_did),
        ] {
            map.entry(fk.to_string()).or_default().push(c.id.to_string());
        }
    }
    for c in &circuits {
        snap.circuit_lookups.insert(c.id.to_string(), ok);
    }
    for p in &proofs {
        snap.proof_lookups.insert(p.id.to_string(), ok);
        snap.circuit_index
            .entry(p.circuit_id.to_string())
            .or_default()
            .push(p.id.to_string());
    }
    snap.by_issuer = snap.issuer_index.clone();
    snap.by_subject = snap.subject_index.clone();
    snap.by_circuit = snap.circuit_index.clone();

    let dids: BTreeSet<Did> = credentials
        .iter()
        .flat_map(|c| [c.issuer_did.clone(), c.subject_did.clone()])
        .collect();
    for d in dids {
        let resolved = match d.as_str() {
            "did:iss1" => Some(IdentityRecord {
                did: d.clone(),
                controller: principal("attest1issuerq"),
                active: true,
            }),
            "did:sub1" => Some(IdentityRecord {
                did: d.clone(),
                controller: principal("attest1holder"),
                active: true,
            }),
            _ => None,
        };
        snap.identities.insert(d, resolved);
    }

    snap.credentials = credentials;
    snap.circuits = circuits;
    snap.proofs = proofs;
    snap
}

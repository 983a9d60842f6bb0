//! # State Snapshot
//!
//! A point-in-time capture of everything the invariants inspect, read only
//! through each registry's public query surface. Invariants are pure
//! functions over a snapshot, so running them twice on one snapshot yields
//! identical reports.

use std::collections::{BTreeMap, BTreeSet};

use attest_core::{Did, Timestamp};
use attest_registry::{
    CircuitRecord, CredentialRecord, IdentityRecord, IdentityResolver, MsgServer, Pagination,
    ProofRecord, RegistryError, RegistryParams,
};
use attest_store::KvStore;
use attest_zkp::ProofVerifier;

/// Outcome of looking a primary record up by its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// `get(id)` returned a record.
    pub found: bool,
    /// The returned record equals the enumerated one.
    pub matches: bool,
    /// `exists(id)` answered true.
    pub exists: bool,
}

impl Lookup {
    /// Both APIs agree with the enumeration.
    pub fn consistent(&self) -> bool {
        self.found && self.matches && self.exists
    }
}

/// Foreign key to record ids.
pub type IdMap = BTreeMap<String, Vec<String>>;

/// Full registry state at one block time.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub now: Timestamp,
    pub params: RegistryParams,

    pub credentials: Vec<CredentialRecord>,
    pub circuits: Vec<CircuitRecord>,
    pub proofs: Vec<ProofRecord>,

    pub credential_lookups: BTreeMap<String, Lookup>,
    pub circuit_lookups: BTreeMap<String, Lookup>,
    pub proof_lookups: BTreeMap<String, Lookup>,

    /// Raw index contents, as stored.
    pub issuer_index: IdMap,
    pub subject_index: IdMap,
    pub circuit_index: IdMap,

    /// What the public enumeration APIs return per foreign key.
    pub by_issuer: IdMap,
    pub by_subject: IdMap,
    pub by_circuit: IdMap,

    /// Resolution of every DID a credential references. `None` means the
    /// identity registry does not know the DID.
    pub identities: BTreeMap<Did, Option<IdentityRecord>>,
}

impl StateSnapshot {
    /// Capture the state visible through `server` at `now`.
    pub fn capture<S, I, V>(server: &MsgServer<S, I, V>, now: Timestamp) -> Result<Self, RegistryError>
    where
        S: KvStore + Clone,
        I: IdentityResolver,
        V: ProofVerifier,
    {
        let credentials_reg = server.credentials();
        let circuits_reg = server.circuits();
        let proofs_reg = server.proofs();

        let credentials = credentials_reg.list_all()?;
        let circuits = circuits_reg.list()?;
        let proofs = proofs_reg.list_all()?;

        let mut credential_lookups = BTreeMap::new();
        for rec in &credentials {
            let got = credentials_reg.get(&rec.id)?;
            credential_lookups.insert(
                rec.id.to_string(),
                Lookup {
                    found: got.is_some(),
                    matches: got.as_ref() == Some(rec),
                    exists: credentials_reg.exists(&rec.id)?,
                },
            );
        }
        let mut circuit_lookups = BTreeMap::new();
        for rec in &circuits {
            let got = circuits_reg.get(&rec.id)?;
            circuit_lookups.insert(
                rec.id.to_string(),
                Lookup {
                    found: got.is_some(),
                    matches: got.as_ref() == Some(rec),
                    exists: circuits_reg.exists(&rec.id)?,
                },
            );
        }
        let mut proof_lookups = BTreeMap::new();
        for rec in &proofs {
            let got = proofs_reg.get(&rec.id)?;
            proof_lookups.insert(
                rec.id.to_string(),
                Lookup {
                    found: got.is_some(),
                    matches: got.as_ref() == Some(rec),
                    exists: proofs_reg.exists(&rec.id)?,
                },
            );
        }

        let issuer_index = credentials_reg.issuer_index()?;
        let subject_index = credentials_reg.subject_index()?;
        let circuit_index = proofs_reg.circuit_index()?;

        // Enumerate every foreign key seen on either side.
        let issuers: BTreeSet<Did> = credentials
            .iter()
            .map(|c| c.issuer_did.clone())
            .chain(issuer_index.keys().filter_map(|k| Did::new(k.as_str()).ok()))
            .collect();
        let subjects: BTreeSet<Did> = credentials
            .iter()
            .map(|c| c.subject_did.clone())
            .chain(subject_index.keys().filter_map(|k| Did::new(k.as_str()).ok()))
            .collect();

        let page = server.params().max_page_limit;
        let mut by_issuer = IdMap::new();
        for did in &issuers {
            let ids = collect_pages(page, |p| credentials_reg.get_by_issuer(did, true, p))?;
            by_issuer.insert(did.to_string(), ids);
        }
        let mut by_subject = IdMap::new();
        for did in &subjects {
            let ids = collect_pages(page, |p| credentials_reg.get_by_subject(did, true, p))?;
            by_subject.insert(did.to_string(), ids);
        }

        let mut by_circuit = IdMap::new();
        let circuit_ids: BTreeSet<_> = proofs
            .iter()
            .map(|p| p.circuit_id.clone())
            .chain(
                circuit_index
                    .keys()
                    .filter_map(|k| attest_core::CircuitId::new(k.as_str()).ok()),
            )
            .collect();
        for cid in &circuit_ids {
            let ids = proofs_reg
                .list_by_circuit(cid)?
                .into_iter()
                .map(|p| p.id.to_string())
                .collect();
            by_circuit.insert(cid.to_string(), ids);
        }

        let mut identities = BTreeMap::new();
        for did in issuers.iter().chain(subjects.iter()) {
            if !identities.contains_key(did) {
                let resolved = credentials_reg.identities().resolve(did)?;
                identities.insert(did.clone(), resolved);
            }
        }

        Ok(Self {
            now,
            params: server.params().clone(),
            credentials,
            circuits,
            proofs,
            credential_lookups,
            circuit_lookups,
            proof_lookups,
            issuer_index,
            subject_index,
            circuit_index,
            by_issuer,
            by_subject,
            by_circuit,
            identities,
        })
    }

    pub fn credential(&self, id: &str) -> Option<&CredentialRecord> {
        self.credentials.iter().find(|c| c.id.as_str() == id)
    }

    pub fn circuit(&self, id: &str) -> Option<&CircuitRecord> {
        self.circuits.iter().find(|c| c.id.as_str() == id)
    }

    pub fn proof(&self, id: &str) -> Option<&ProofRecord> {
        self.proofs.iter().find(|p| p.id.as_str() == id)
    }
}

fn collect_pages<F>(page: usize, mut fetch: F) -> Result<Vec<String>, RegistryError>
where
    F: FnMut(Pagination) -> Result<Vec<CredentialRecord>, RegistryError>,
{
    let mut ids = Vec::new();
    loop {
        let batch = fetch(Pagination::new(ids.len(), page))?;
        let done = batch.len() < page;
        ids.extend(batch.into_iter().map(|c| c.id.to_string()));
        if done {
            return Ok(ids);
        }
    }
}

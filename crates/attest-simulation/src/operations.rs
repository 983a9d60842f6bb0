//! # Operation Planner
//!
//! Weighted random generator of registry messages. Given the current
//! snapshot and the identity registry's contents, it picks an operation kind
//! by weight and either builds a message that selects real ids, DIDs and
//! principals from live state, or returns a no-op with a stated reason. It
//! never invents a message that cannot type-check against current state.
//!
//! In adversarial mode a configurable share of messages violates exactly
//! one precondition and carries the error the registry must answer with.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use attest_core::{CircuitId, CredentialId, Did, Principal, ProofId, Timestamp, ValidationError};
use attest_registry::{
    CircuitRecord, CredentialRecord, ErrorKind, IdentityRecord, Msg, MsgDeactivateCircuit,
    MsgIssueCredential, MsgKind, MsgRegisterCircuit, MsgRevokeCredential, MsgSubmitProof,
};
use attest_zkp::mock::MOCK_PROOF_LEN;
use attest_zkp::MockVerifier;

use crate::snapshot::StateSnapshot;

pub const NO_ACTIVE_IDENTITIES: &str = "insufficient active identities";
pub const NO_ACTIVE_CREDENTIALS: &str = "no active credentials";
pub const NO_ACTIVE_CIRCUITS: &str = "no active circuits";
pub const NO_ACCOUNTS: &str = "no accounts";

/// Relative weight of each operation kind. Zero disables a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationWeights {
    pub issue_credential: u32,
    pub revoke_credential: u32,
    pub register_circuit: u32,
    pub submit_proof: u32,
    pub deactivate_circuit: u32,
}

impl Default for OperationWeights {
    fn default() -> Self {
        Self {
            issue_credential: 80,
            revoke_credential: 20,
            register_circuit: 30,
            submit_proof: 60,
            deactivate_circuit: 10,
        }
    }
}

impl OperationWeights {
    pub fn weight(&self, kind: MsgKind) -> u32 {
        match kind {
            MsgKind::IssueCredential => self.issue_credential,
            MsgKind::RevokeCredential => self.revoke_credential,
            MsgKind::RegisterCircuit => self.register_circuit,
            MsgKind::SubmitProof => self.submit_proof,
            MsgKind::DeactivateCircuit => self.deactivate_circuit,
        }
    }

    pub fn total(&self) -> u64 {
        MsgKind::ALL.iter().map(|k| u64::from(self.weight(*k))).sum()
    }

    /// Draw a kind proportionally to its weight. `None` if every weight is zero.
    pub fn pick(&self, rng: &mut StdRng) -> Option<MsgKind> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let mut roll = rng.gen_range(0..total);
        for kind in MsgKind::ALL {
            let w = u64::from(self.weight(kind));
            if roll < w {
                return Some(kind);
            }
            roll -= w;
        }
        None
    }
}

/// What the registry must answer for a planned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Accept,
    /// Accepted, with this verifier outcome.
    Verified(bool),
    Reject(ErrorKind),
}

/// One generated step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planned {
    Deliver {
        msg: Msg,
        expect: Expectation,
        /// Short tag naming how the message was built.
        variant: &'static str,
    },
    NoOp {
        kind: MsgKind,
        reason: &'static str,
    },
}

impl Planned {
    pub fn kind(&self) -> MsgKind {
        match self {
            Self::Deliver { msg, .. } => msg.kind(),
            Self::NoOp { kind, .. } => *kind,
        }
    }
}

/// Live state a plan is drawn from.
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    pub snapshot: &'a StateSnapshot,
    pub identities: &'a [IdentityRecord],
}

const SCHEMAS: [&str; 4] = [
    "https://schema.org/Person",
    "https://schema.org/EducationalOccupationalCredential",
    "https://schema.org/DriversLicense",
    "https://schema.org/Permit",
];

const REVOCATION_REASONS: [&str; 5] = [
    "Credential expired",
    "Information changed",
    "Security breach",
    "Request by subject",
    "Administrative update",
];

const CIRCUIT_NAMES: [&str; 4] = ["age-over-18", "kyc-membership", "income-range", "residency"];

/// Distinct verifier programs. Drawing from a small pool makes identical
/// bytecode under different circuit ids a common case.
const BYTECODE_POOL: usize = 6;

const HOUR_SECS: i64 = 3600;
const YEAR_SECS: i64 = 365 * 24 * HOUR_SECS;

/// Seeded planner. Ids it mints are unique for its lifetime.
#[derive(Debug, Clone)]
pub struct Planner {
    weights: OperationWeights,
    invalid_operation_percent: u8,
    accounts: Vec<Principal>,
    minted: u64,
}

impl Planner {
    pub fn new(weights: OperationWeights, invalid_operation_percent: u8, accounts: Vec<Principal>) -> Self {
        Self {
            weights,
            invalid_operation_percent: invalid_operation_percent.min(100),
            accounts,
            minted: 0,
        }
    }

    pub fn accounts(&self) -> &[Principal] {
        &self.accounts
    }

    /// Plan one step.
    pub fn plan(&mut self, rng: &mut StdRng, input: PlanInput<'_>) -> Result<Option<Planned>, ValidationError> {
        let Some(kind) = self.weights.pick(rng) else {
            return Ok(None);
        };
        if self.accounts.is_empty() {
            return Ok(Some(Planned::NoOp {
                kind,
                reason: NO_ACCOUNTS,
            }));
        }
        if rng.gen_range(0..100u8) < self.invalid_operation_percent {
            if let Some(planned) = self.plan_invalid(kind, rng, input)? {
                return Ok(Some(planned));
            }
        }
        self.plan_valid(kind, rng, input).map(Some)
    }

    fn plan_valid(&mut self, kind: MsgKind, rng: &mut StdRng, input: PlanInput<'_>) -> Result<Planned, ValidationError> {
        let snap = input.snapshot;
        match kind {
            MsgKind::IssueCredential => {
                let active: Vec<_> = input.identities.iter().filter(|i| i.active).collect();
                let (Some(issuer), Some(subject)) = (active.choose(rng), input.identities.choose(rng)) else {
                    return Ok(noop(kind, NO_ACTIVE_IDENTITIES));
                };
                let expires_at = random_expiry(rng, snap.now, snap.params.max_validity_secs);
                let msg = self.issue_msg(rng, issuer, &subject.did, expires_at)?;
                Ok(deliver(Msg::IssueCredential(msg), Expectation::Accept, "valid"))
            }
            MsgKind::RevokeCredential => {
                let live: Vec<_> = snap.credentials.iter().filter(|c| !c.revoked).collect();
                let Some(vc) = live.choose(rng) else {
                    return Ok(noop(kind, NO_ACTIVE_CREDENTIALS));
                };
                let msg = revoke_msg(rng, vc, vc.creator.clone());
                Ok(deliver(Msg::RevokeCredential(msg), Expectation::Accept, "valid"))
            }
            MsgKind::RegisterCircuit => {
                let creator = self.random_account(rng);
                let msg = self.register_msg(rng, creator)?;
                Ok(deliver(Msg::RegisterCircuit(msg), Expectation::Accept, "valid"))
            }
            MsgKind::DeactivateCircuit => {
                let active: Vec<_> = snap.circuits.iter().filter(|c| c.active).collect();
                let Some(circuit) = active.choose(rng) else {
                    return Ok(noop(kind, NO_ACTIVE_CIRCUITS));
                };
                let msg = MsgDeactivateCircuit {
                    caller: circuit.creator.clone(),
                    id: circuit.id.clone(),
                };
                Ok(deliver(Msg::DeactivateCircuit(msg), Expectation::Accept, "valid"))
            }
            MsgKind::SubmitProof => {
                let active: Vec<_> = snap.circuits.iter().filter(|c| c.active).collect();
                let Some(circuit) = active.choose(rng) else {
                    return Ok(noop(kind, NO_ACTIVE_CIRCUITS));
                };
                let submitter = self.random_account(rng);
                let public_inputs = random_public_inputs(rng);
                let roll = rng.gen_range(0..100u8);
                let (proof_data, expect, variant) = if roll < 70 {
                    match MockVerifier.prove(&circuit.verification_key, &public_inputs) {
                        Ok(proof) => (proof, Expectation::Verified(true), "valid-proof"),
                        Err(_) => (random_bytes(rng, 7), Expectation::Reject(ErrorKind::VerificationError), "malformed-proof"),
                    }
                } else if roll < 90 {
                    (random_bytes(rng, MOCK_PROOF_LEN), Expectation::Verified(false), "invalid-proof")
                } else {
                    let len = rng.gen_range(1..MOCK_PROOF_LEN);
                    (random_bytes(rng, len), Expectation::Reject(ErrorKind::VerificationError), "malformed-proof")
                };
                let msg = MsgSubmitProof {
                    submitter,
                    id: self.mint_proof_id()?,
                    circuit_id: circuit.id.clone(),
                    public_inputs,
                    proof_data,
                };
                Ok(deliver(Msg::SubmitProof(msg), expect, variant))
            }
        }
    }

    /// A message breaking exactly one precondition, or `None` when live
    /// state offers no candidate for any variant of `kind`.
    fn plan_invalid(
        &mut self,
        kind: MsgKind,
        rng: &mut StdRng,
        input: PlanInput<'_>,
    ) -> Result<Option<Planned>, ValidationError> {
        let snap = input.snapshot;
        let planned = match kind {
            MsgKind::IssueCredential => {
                let active: Vec<_> = input.identities.iter().filter(|i| i.active).collect();
                let inactive: Vec<_> = input.identities.iter().filter(|i| !i.active).collect();
                let (Some(issuer), Some(subject)) = (active.choose(rng), input.identities.choose(rng)) else {
                    return Ok(None);
                };
                let valid_expiry = random_expiry(rng, snap.now, snap.params.max_validity_secs);
                match rng.gen_range(0..6u8) {
                    0 if !snap.credentials.is_empty() => {
                        let mut msg = self.issue_msg(rng, issuer, &subject.did, valid_expiry)?;
                        if let Some(existing) = snap.credentials.choose(rng) {
                            msg.id = existing.id.clone();
                        }
                        deliver(Msg::IssueCredential(msg), reject(ErrorKind::CredentialExists), "duplicate-id")
                    }
                    1 if !inactive.is_empty() => {
                        let Some(dead) = inactive.choose(rng) else {
                            return Ok(None);
                        };
                        let msg = self.issue_msg(rng, dead, &subject.did, valid_expiry)?;
                        deliver(
                            Msg::IssueCredential(msg),
                            reject(ErrorKind::UnknownOrInactiveIssuer),
                            "inactive-issuer",
                        )
                    }
                    2 => {
                        self.minted += 1;
                        let ghost = Did::new(format!("did:unknown:{}", self.minted))?;
                        let msg = self.issue_msg(rng, issuer, &ghost, valid_expiry)?;
                        deliver(Msg::IssueCredential(msg), reject(ErrorKind::UnknownSubject), "unknown-subject")
                    }
                    3 => {
                        let msg = self.issue_msg(rng, issuer, &subject.did, snap.now)?;
                        deliver(Msg::IssueCredential(msg), reject(ErrorKind::InvalidExpiry), "expired")
                    }
                    4 => {
                        let beyond = snap
                            .now
                            .checked_add_secs(snap.params.max_validity_secs.saturating_add(1));
                        let Some(beyond) = beyond else {
                            return Ok(None);
                        };
                        let msg = self.issue_msg(rng, issuer, &subject.did, beyond)?;
                        deliver(Msg::IssueCredential(msg), reject(ErrorKind::InvalidExpiry), "over-window")
                    }
                    _ => {
                        let Some(impostor) = self.other_account(rng, &issuer.controller) else {
                            return Ok(None);
                        };
                        let mut msg = self.issue_msg(rng, issuer, &subject.did, valid_expiry)?;
                        msg.creator = impostor;
                        deliver(Msg::IssueCredential(msg), reject(ErrorKind::Unauthorized), "wrong-creator")
                    }
                }
            }
            MsgKind::RevokeCredential => {
                let revoked: Vec<_> = snap.credentials.iter().filter(|c| c.revoked).collect();
                let live: Vec<_> = snap.credentials.iter().filter(|c| !c.revoked).collect();
                match rng.gen_range(0..3u8) {
                    0 if !revoked.is_empty() => {
                        let Some(vc) = revoked.choose(rng) else {
                            return Ok(None);
                        };
                        let msg = revoke_msg(rng, vc, vc.creator.clone());
                        deliver(Msg::RevokeCredential(msg), reject(ErrorKind::AlreadyRevoked), "already-revoked")
                    }
                    1 if !live.is_empty() => {
                        let Some(vc) = live.choose(rng) else {
                            return Ok(None);
                        };
                        let Some(impostor) = self.other_account(rng, &vc.creator) else {
                            return Ok(None);
                        };
                        let msg = revoke_msg(rng, vc, impostor);
                        deliver(Msg::RevokeCredential(msg), reject(ErrorKind::Unauthorized), "wrong-caller")
                    }
                    _ => {
                        let caller = self.random_account(rng);
                        let msg = MsgRevokeCredential {
                            caller,
                            id: self.mint_credential_id()?,
                            reason: pick(rng, &REVOCATION_REASONS).to_string(),
                        };
                        deliver(Msg::RevokeCredential(msg), reject(ErrorKind::CredentialNotFound), "missing")
                    }
                }
            }
            MsgKind::RegisterCircuit => {
                let Some(existing) = snap.circuits.choose(rng) else {
                    return Ok(None);
                };
                let creator = self.random_account(rng);
                let mut msg = self.register_msg(rng, creator)?;
                msg.id = existing.id.clone();
                deliver(Msg::RegisterCircuit(msg), reject(ErrorKind::CircuitExists), "duplicate-id")
            }
            MsgKind::DeactivateCircuit => {
                let inactive: Vec<_> = snap.circuits.iter().filter(|c| !c.active).collect();
                let active: Vec<_> = snap.circuits.iter().filter(|c| c.active).collect();
                match rng.gen_range(0..3u8) {
                    0 if !inactive.is_empty() => {
                        let Some(circuit) = inactive.choose(rng) else {
                            return Ok(None);
                        };
                        deliver(
                            Msg::DeactivateCircuit(deactivate_msg(circuit, circuit.creator.clone())),
                            reject(ErrorKind::AlreadyDeactivated),
                            "already-deactivated",
                        )
                    }
                    1 if !active.is_empty() => {
                        let Some(circuit) = active.choose(rng) else {
                            return Ok(None);
                        };
                        let Some(impostor) = self.other_account(rng, &circuit.creator) else {
                            return Ok(None);
                        };
                        deliver(
                            Msg::DeactivateCircuit(deactivate_msg(circuit, impostor)),
                            reject(ErrorKind::Unauthorized),
                            "wrong-caller",
                        )
                    }
                    _ => {
                        let caller = self.random_account(rng);
                        let msg = MsgDeactivateCircuit {
                            caller,
                            id: self.mint_circuit_id()?,
                        };
                        deliver(Msg::DeactivateCircuit(msg), reject(ErrorKind::CircuitNotFound), "missing")
                    }
                }
            }
            MsgKind::SubmitProof => {
                let inactive: Vec<_> = snap.circuits.iter().filter(|c| !c.active).collect();
                let submitter = self.random_account(rng);
                let public_inputs = random_public_inputs(rng);
                let proof_data = random_bytes(rng, MOCK_PROOF_LEN);
                match rng.gen_range(0..3u8) {
                    0 if !inactive.is_empty() => {
                        let Some(circuit) = inactive.choose(rng) else {
                            return Ok(None);
                        };
                        let msg = MsgSubmitProof {
                            submitter,
                            id: self.mint_proof_id()?,
                            circuit_id: circuit.id.clone(),
                            public_inputs,
                            proof_data,
                        };
                        deliver(Msg::SubmitProof(msg), reject(ErrorKind::CircuitDeactivated), "deactivated-circuit")
                    }
                    1 if !snap.proofs.is_empty() => {
                        let Some(existing) = snap.proofs.choose(rng) else {
                            return Ok(None);
                        };
                        let msg = MsgSubmitProof {
                            submitter,
                            id: existing.id.clone(),
                            circuit_id: existing.circuit_id.clone(),
                            public_inputs,
                            proof_data,
                        };
                        deliver(Msg::SubmitProof(msg), reject(ErrorKind::ProofExists), "duplicate-id")
                    }
                    _ => {
                        let msg = MsgSubmitProof {
                            submitter,
                            id: self.mint_proof_id()?,
                            circuit_id: self.mint_circuit_id()?,
                            public_inputs,
                            proof_data,
                        };
                        deliver(Msg::SubmitProof(msg), reject(ErrorKind::CircuitNotFound), "missing-circuit")
                    }
                }
            }
        };
        Ok(Some(planned))
    }

    fn issue_msg(
        &mut self,
        rng: &mut StdRng,
        issuer: &IdentityRecord,
        subject: &Did,
        expires_at: Timestamp,
    ) -> Result<MsgIssueCredential, ValidationError> {
        Ok(MsgIssueCredential {
            creator: issuer.controller.clone(),
            id: self.mint_credential_id()?,
            issuer_did: issuer.did.clone(),
            subject_did: subject.clone(),
            credential_schema: pick(rng, &SCHEMAS).to_string(),
            credential_data: random_claims(rng),
            proof: format!(
                r#"{{"type":"Ed25519Signature2020","proofValue":"{}"}}"#,
                hex(&random_bytes(rng, 16))
            ),
            expires_at,
        })
    }

    fn register_msg(&mut self, rng: &mut StdRng, creator: Principal) -> Result<MsgRegisterCircuit, ValidationError> {
        let program = rng.gen_range(0..BYTECODE_POOL);
        Ok(MsgRegisterCircuit {
            creator,
            id: self.mint_circuit_id()?,
            name: pick(rng, &CIRCUIT_NAMES).to_string(),
            description: String::new(),
            verifier_bytecode: format!("\0asm-verifier-{program}").into_bytes(),
            verification_key: random_bytes(rng, 16),
        })
    }

    fn random_account(&self, rng: &mut StdRng) -> Principal {
        let i = rng.gen_range(0..self.accounts.len());
        self.accounts[i].clone()
    }

    fn other_account(&self, rng: &mut StdRng, not: &Principal) -> Option<Principal> {
        let others: Vec<_> = self.accounts.iter().filter(|a| *a != not).collect();
        others.choose(rng).map(|p| (*p).clone())
    }

    fn next(&mut self) -> u64 {
        self.minted += 1;
        self.minted
    }

    fn mint_credential_id(&mut self) -> Result<CredentialId, ValidationError> {
        let n = self.next();
        CredentialId::new(format!("vc:sim{n}"))
    }

    fn mint_circuit_id(&mut self) -> Result<CircuitId, ValidationError> {
        let n = self.next();
        CircuitId::new(format!("c:sim{n}"))
    }

    fn mint_proof_id(&mut self) -> Result<ProofId, ValidationError> {
        let n = self.next();
        ProofId::new(format!("p:sim{n}"))
    }
}

fn deliver(msg: Msg, expect: Expectation, variant: &'static str) -> Planned {
    Planned::Deliver { msg, expect, variant }
}

fn noop(kind: MsgKind, reason: &'static str) -> Planned {
    Planned::NoOp { kind, reason }
}

fn reject(kind: ErrorKind) -> Expectation {
    Expectation::Reject(kind)
}

fn revoke_msg(rng: &mut StdRng, vc: &CredentialRecord, caller: Principal) -> MsgRevokeCredential {
    MsgRevokeCredential {
        caller,
        id: vc.id.clone(),
        reason: pick(rng, &REVOCATION_REASONS).to_string(),
    }
}

fn deactivate_msg(circuit: &CircuitRecord, caller: Principal) -> MsgDeactivateCircuit {
    MsgDeactivateCircuit {
        caller,
        id: circuit.id.clone(),
    }
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

/// An expiry between one hour and one year after `now`, clamped to the
/// registry's validity window. Windows shorter than an hour draw from
/// `1..=max_validity_secs`.
fn random_expiry(rng: &mut StdRng, now: Timestamp, max_validity_secs: i64) -> Timestamp {
    let upper = YEAR_SECS.min(max_validity_secs).max(1);
    let lower = HOUR_SECS.min(upper);
    now.checked_add_secs(rng.gen_range(lower..=upper)).unwrap_or(now)
}

fn random_public_inputs(rng: &mut StdRng) -> Vec<String> {
    let n = rng.gen_range(1..=4);
    (0..n).map(|_| rng.gen_range(0..1_000_000u32).to_string()).collect()
}

fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen()).collect()
}

fn random_claims(rng: &mut StdRng) -> String {
    match rng.gen_range(0..3u8) {
        0 => format!(r#"{{"age":{}}}"#, rng.gen_range(18..98)),
        1 => format!(r#"{{"graduationYear":{}}}"#, rng.gen_range(1990..2020)),
        _ => format!(r#"{{"licenseNumber":"LIC{}"}}"#, rng.gen_range(0..100_000)),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

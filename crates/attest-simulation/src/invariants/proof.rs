//! Proof invariants.

use super::{InvariantConfig, InvariantReport};
use crate::snapshot::StateSnapshot;

pub const PROOF_VERIFICATION: &str = "proof-verification";
pub const CIRCUIT_PROOF_RELATIONSHIP: &str = "circuit-proof-relationship";

/// `verified ⇔ verified_at > 0`, `verified_at >= submitted_at`, and the
/// record is retrievable by id.
pub fn proof_verification(snap: &StateSnapshot, _: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(PROOF_VERIFICATION);
    for p in &snap.proofs {
        let id = p.id.as_str();
        if !p.submitted_at.is_set() {
            report.violation(id, "submitted_at is not set");
        }
        if p.verified != p.verified_at.is_set() {
            report.violation(
                id,
                format!("verified={} but verified_at={}", p.verified, p.verified_at),
            );
        }
        if p.verified_at.is_set() && p.verified_at < p.submitted_at {
            report.violation(
                id,
                format!("verified_at {} precedes submitted_at {}", p.verified_at, p.submitted_at),
            );
        }
        if p.public_inputs.is_empty() {
            report.violation(id, "no public inputs");
        }
        if p.proof_data.is_empty() {
            report.violation(id, "proof data is empty");
        }
        match snap.proof_lookups.get(id) {
            Some(lookup) if lookup.consistent() => {}
            Some(_) => report.violation(id, "direct lookup diverges from enumeration"),
            None => report.violation(id, "no lookup recorded"),
        }
    }
    report
}

/// Every proof's circuit exists, and the copied key and code hash match it.
///
/// Circuit activation history is not retained, so a verified proof whose
/// circuit is inactive now is reported as a warning: it may have been
/// verified while the circuit was still active.
pub fn circuit_proof_relationship(snap: &StateSnapshot, _: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(CIRCUIT_PROOF_RELATIONSHIP);
    for p in &snap.proofs {
        let id = p.id.as_str();
        let Some(circuit) = snap.circuit(p.circuit_id.as_str()) else {
            report.violation(id, format!("circuit {} does not exist", p.circuit_id));
            continue;
        };
        if p.verifier_reference != circuit.code_hash {
            report.violation(id, "verifier reference differs from circuit code hash");
        }
        if p.verification_key != circuit.verification_key {
            report.violation(id, "verification key differs from circuit");
        }
        if p.submitted_at < circuit.created_at {
            report.violation(
                id,
                format!("submitted at {} before circuit creation at {}", p.submitted_at, circuit.created_at),
            );
        }
        if p.verified && !circuit.active {
            report.warning(
                id,
                format!("verified against {} which is now inactive", circuit.id),
            );
        }
    }
    report
}

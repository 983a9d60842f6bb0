//! Circuit invariants.

use std::collections::BTreeSet;

use attest_core::ContentDigest;

use super::{InvariantConfig, InvariantReport};
use crate::snapshot::StateSnapshot;

pub const CIRCUIT_CONSISTENCY: &str = "circuit-consistency";
pub const ACTIVE_CIRCUIT_HEALTH: &str = "active-circuit-health";

/// Structural checks on every circuit record, including creator
/// well-formedness and lookup agreement.
pub fn circuit_consistency(snap: &StateSnapshot, _: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(CIRCUIT_CONSISTENCY);
    for c in &snap.circuits {
        let id = c.id.as_str();
        if let Err(e) = c.id.check() {
            report.violation(id, e.to_string());
        }
        if let Err(e) = c.creator.check() {
            report.violation(id, format!("malformed creator: {e}"));
        }
        if c.name.trim().is_empty() {
            report.violation(id, "name is empty");
        }
        if !ContentDigest::is_hex_sha256(&c.code_hash) {
            report.violation(id, format!("code hash {:?} is not a hex SHA-256", c.code_hash));
        }
        if c.verification_key.is_empty() {
            report.violation(id, "verification key is empty");
        }
        if !c.created_at.is_set() {
            report.violation(id, "created_at is not set");
        }
        if c.created_at > snap.now {
            report.violation(id, format!("created_at {} is in the future", c.created_at));
        }
        match snap.circuit_lookups.get(id) {
            Some(lookup) if lookup.consistent() => {}
            Some(_) => report.violation(id, "direct lookup diverges from enumeration"),
            None => report.violation(id, "no lookup recorded"),
        }
    }
    report
}

/// Soft signals only: every circuit inactive, or all active circuits owned
/// by a single creator once there are more than the diversity threshold.
pub fn active_circuit_health(snap: &StateSnapshot, cfg: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(ACTIVE_CIRCUIT_HEALTH);
    let active: Vec<_> = snap.circuits.iter().filter(|c| c.active).collect();
    if !snap.circuits.is_empty() && active.is_empty() {
        report.warning("*", format!("all {} circuits are inactive", snap.circuits.len()));
    }
    if active.len() > cfg.creator_diversity_threshold {
        let creators: BTreeSet<_> = active.iter().map(|c| c.creator.as_str()).collect();
        if creators.len() == 1 {
            report.warning(
                "*",
                format!("all {} active circuits belong to one creator", active.len()),
            );
        }
    }
    report
}

//! Secondary-index consistency, checked in both directions for all three
//! indexes.

use std::collections::{BTreeMap, BTreeSet};

use super::{InvariantConfig, InvariantReport};
use crate::snapshot::{IdMap, StateSnapshot};

pub const INDEX_CONSISTENCY: &str = "index-consistency";

/// Every index entry points at a primary record carrying that foreign key,
/// every primary record has its entry, and the public enumeration for each
/// foreign key returns exactly the matching primaries in insertion order.
pub fn index_consistency(snap: &StateSnapshot, _: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(INDEX_CONSISTENCY);

    let by_issuer: BTreeMap<&str, &str> = snap
        .credentials
        .iter()
        .map(|c| (c.id.as_str(), c.issuer_did.as_str()))
        .collect();
    let by_subject: BTreeMap<&str, &str> = snap
        .credentials
        .iter()
        .map(|c| (c.id.as_str(), c.subject_did.as_str()))
        .collect();
    let by_circuit: BTreeMap<&str, &str> = snap
        .proofs
        .iter()
        .map(|p| (p.id.as_str(), p.circuit_id.as_str()))
        .collect();

    check_index(&mut report, "by-issuer", &by_issuer, &snap.issuer_index, &snap.by_issuer);
    check_index(&mut report, "by-subject", &by_subject, &snap.subject_index, &snap.by_subject);
    check_index(&mut report, "by-circuit", &by_circuit, &snap.circuit_index, &snap.by_circuit);
    report
}

fn check_index(
    report: &mut InvariantReport,
    label: &str,
    primaries: &BTreeMap<&str, &str>,
    raw: &IdMap,
    enumerated: &IdMap,
) {
    // index → primary
    for (fk, ids) in raw {
        let mut seen = BTreeSet::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                report.violation(fk.as_str(), format!("{label}: duplicate entry for {id}"));
            }
            match primaries.get(id.as_str()) {
                None => report.violation(fk.as_str(), format!("{label}: dangling entry {id}")),
                Some(actual) if *actual != fk.as_str() => report.violation(
                    fk.as_str(),
                    format!("{label}: entry {id} filed under {fk}, record has {actual}"),
                ),
                Some(_) => {}
            }
        }
    }

    // primary → index
    let mut expected: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (id, fk) in primaries {
        expected.entry(*fk).or_default().insert(*id);
        let indexed = raw
            .get(*fk)
            .is_some_and(|ids| ids.iter().any(|i| i.as_str() == *id));
        if !indexed {
            report.violation(*id, format!("{label}: record missing from index under {fk}"));
        }
    }

    // public enumeration matches the primaries exactly
    let keys: BTreeSet<&str> = expected
        .keys()
        .copied()
        .chain(enumerated.keys().map(String::as_str))
        .collect();
    for fk in keys {
        let want = expected.get(fk).cloned().unwrap_or_default();
        let got_list: Vec<&str> = enumerated
            .get(fk)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let got: BTreeSet<&str> = got_list.iter().copied().collect();
        let extra: Vec<_> = got.difference(&want).collect();
        let missing: Vec<_> = want.difference(&got).collect();
        if !extra.is_empty() || !missing.is_empty() {
            report.violation(
                fk,
                format!("{label}: enumeration extra={extra:?} missing={missing:?}"),
            );
        }
        if got_list.len() != got.len() {
            report.violation(fk, format!("{label}: enumeration repeats records"));
        }
        if let Some(raw_ids) = raw.get(fk) {
            let order: Vec<&str> = raw_ids
                .iter()
                .map(String::as_str)
                .filter(|id| primaries.contains_key(id))
                .collect();
            if order != got_list && missing.is_empty() && extra.is_empty() {
                report.violation(fk, format!("{label}: enumeration is not in insertion order"));
            }
        }
    }
}

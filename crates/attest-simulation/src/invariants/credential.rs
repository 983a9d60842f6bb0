//! Credential invariants: issuance, revocation, identity references, expiry.

use super::{InvariantConfig, InvariantReport};
use crate::snapshot::StateSnapshot;

pub const ISSUANCE_CONSISTENCY: &str = "issuance-consistency";
pub const REVOCATION_VALIDITY: &str = "revocation-validity";
pub const IDENTITY_REFERENCE: &str = "identity-reference";
pub const EXPIRY_SANITY: &str = "expiry-sanity";

/// Required fields present, `expires_at > issued_at`, and `get`/`exists`
/// agree with the enumeration.
pub fn issuance_consistency(snap: &StateSnapshot, _: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(ISSUANCE_CONSISTENCY);
    for vc in &snap.credentials {
        let id = vc.id.as_str();
        let checks = [
            vc.id.check().err().map(|e| e.to_string()),
            vc.issuer_did.check().err().map(|e| format!("issuer: {e}")),
            vc.subject_did.check().err().map(|e| format!("subject: {e}")),
            vc.creator.check().err().map(|e| format!("creator: {e}")),
        ];
        for msg in checks.into_iter().flatten() {
            report.violation(id, msg);
        }
        for (field, value) in [
            ("credential_schema", &vc.credential_schema),
            ("credential_data", &vc.credential_data),
            ("proof", &vc.proof),
        ] {
            if value.trim().is_empty() {
                report.violation(id, format!("{field} is empty"));
            }
        }
        if !vc.issued_at.is_set() {
            report.violation(id, "issued_at is not set");
        }
        if vc.expires_at <= vc.issued_at {
            report.violation(
                id,
                format!("expires_at {} is not after issued_at {}", vc.expires_at, vc.issued_at),
            );
        }
        match snap.credential_lookups.get(id) {
            Some(lookup) if lookup.consistent() => {}
            Some(lookup) => report.violation(
                id,
                format!(
                    "direct lookup diverges from enumeration (found={}, matches={}, exists={})",
                    lookup.found, lookup.matches, lookup.exists
                ),
            ),
            None => report.violation(id, "no lookup recorded"),
        }
    }
    report
}

/// `revoked ⇔ revoked_at > 0`, and `revoked_at` lies in `[issued_at, now]`.
pub fn revocation_validity(snap: &StateSnapshot, _: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(REVOCATION_VALIDITY);
    for vc in &snap.credentials {
        let id = vc.id.as_str();
        if vc.revoked != vc.revoked_at.is_set() {
            report.violation(
                id,
                format!("revoked={} but revoked_at={}", vc.revoked, vc.revoked_at),
            );
        }
        if vc.revoked_at.is_set() {
            if vc.revoked_at < vc.issued_at {
                report.violation(
                    id,
                    format!("revoked_at {} precedes issued_at {}", vc.revoked_at, vc.issued_at),
                );
            }
            if vc.revoked_at > snap.now {
                report.violation(
                    id,
                    format!("revoked_at {} is in the future (now {})", vc.revoked_at, snap.now),
                );
            }
        }
        if !vc.revoked && vc.revocation_reason.is_some() {
            report.violation(id, "revocation reason recorded on an unrevoked credential");
        }
    }
    report
}

/// Issuer and subject resolve; live credentials have an active issuer; the
/// issuing principal controls the issuer identity.
pub fn identity_reference(snap: &StateSnapshot, _: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(IDENTITY_REFERENCE);
    for vc in &snap.credentials {
        let id = vc.id.as_str();
        match snap.identities.get(&vc.issuer_did) {
            Some(Some(issuer)) => {
                if !vc.revoked && !issuer.active {
                    report.violation(id, format!("unrevoked but issuer {} is inactive", vc.issuer_did));
                }
                if issuer.controller != vc.creator {
                    report.violation(
                        id,
                        format!(
                            "issued by {} but {} is controlled by {}",
                            vc.creator, vc.issuer_did, issuer.controller
                        ),
                    );
                }
            }
            Some(None) => report.violation(id, format!("issuer {} does not resolve", vc.issuer_did)),
            None => report.violation(id, format!("issuer {} was not resolved", vc.issuer_did)),
        }
        match snap.identities.get(&vc.subject_did) {
            Some(Some(_)) => {}
            Some(None) => report.violation(id, format!("subject {} does not resolve", vc.subject_did)),
            None => report.violation(id, format!("subject {} was not resolved", vc.subject_did)),
        }
    }
    report
}

/// `expires_at >= issued_at` and the window is bounded. An all-expired
/// state above the configured size is a warning.
pub fn expiry_sanity(snap: &StateSnapshot, cfg: &InvariantConfig) -> InvariantReport {
    let mut report = InvariantReport::new(EXPIRY_SANITY);
    let max = snap.params.max_validity_secs;
    let mut expired = 0usize;
    for vc in &snap.credentials {
        let id = vc.id.as_str();
        if vc.expires_at < vc.issued_at {
            report.violation(id, format!("expires {} before issuance {}", vc.expires_at, vc.issued_at));
        }
        let window = vc.expires_at.saturating_secs_since(vc.issued_at);
        if window > max {
            report.violation(id, format!("validity window {window}s exceeds {max}s"));
        }
        if snap.now > vc.expires_at {
            expired += 1;
        }
    }
    let total = snap.credentials.len();
    if total > cfg.all_expired_signal_threshold && expired == total {
        report.warning(
            "*",
            format!("all {total} credentials are expired; check the block clock and max validity"),
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{consistent_snapshot, did, make_credential, principal};
    use attest_core::Timestamp;

    fn cfg() -> InvariantConfig {
        InvariantConfig::default()
    }

    #[test]
    fn consistent_credentials_pass() {
        let mut revoked = make_credential("vc:2", 900, 2000);
        revoked.revoked = true;
        revoked.revoked_at = Timestamp::from_epoch_secs(950);
        revoked.revocation_reason = Some("changed".into());
        let snap = consistent_snapshot(vec![make_credential("vc:1", 900, 2000), revoked], vec![], vec![]);
        let checks: [super::super::InvariantFn; 4] =
            [issuance_consistency, revocation_validity, identity_reference, expiry_sanity];
        for check in checks {
            let report = check(&snap, &cfg());
            assert!(report.findings.is_empty(), "{report}");
        }
    }

    #[test]
    fn issuance_flags_missing_fields_and_bad_window() {
        let mut vc = make_credential("vc:1", 900, 900);
        vc.proof.clear();
        let snap = consistent_snapshot(vec![vc], vec![], vec![]);
        let report = issuance_consistency(&snap, &cfg());
        assert!(report.broken());
        assert_eq!(report.violations().count(), 2);
    }

    #[test]
    fn issuance_flags_lookup_divergence() {
        let mut snap = consistent_snapshot(vec![make_credential("vc:1", 900, 2000)], vec![], vec![]);
        snap.credential_lookups.get_mut("vc:1").unwrap().exists = false;
        let report = issuance_consistency(&snap, &cfg());
        assert!(report.broken());
        assert!(report.findings[0].message.contains("exists=false"));
    }

    #[test]
    fn revoked_flag_and_timestamp_must_agree() {
        let mut vc = make_credential("vc:1", 900, 2000);
        vc.revoked = true;
        let snap = consistent_snapshot(vec![vc], vec![], vec![]);
        assert!(revocation_validity(&snap, &cfg()).broken());

        let mut vc = make_credential("vc:1", 900, 2000);
        vc.revoked_at = Timestamp::from_epoch_secs(950);
        let snap = consistent_snapshot(vec![vc], vec![], vec![]);
        assert!(revocation_validity(&snap, &cfg()).broken());
    }

    #[test]
    fn revocation_must_fall_between_issuance_and_now() {
        for revoked_at in [800, 5000] {
            let mut vc = make_credential("vc:1", 900, 2000);
            vc.revoked = true;
            vc.revoked_at = Timestamp::from_epoch_secs(revoked_at);
            vc.revocation_reason = Some(String::new());
            let snap = consistent_snapshot(vec![vc], vec![], vec![]);
            assert!(revocation_validity(&snap, &cfg()).broken(), "revoked_at={revoked_at}");
        }
        let mut vc = make_credential("vc:1", 900, 2000);
        vc.revoked = true;
        vc.revoked_at = Timestamp::from_epoch_secs(900);
        vc.revocation_reason = Some(String::new());
        let snap = consistent_snapshot(vec![vc], vec![], vec![]);
        assert!(!revocation_validity(&snap, &cfg()).broken());
    }

    #[test]
    fn inactive_issuer_breaks_only_unrevoked() {
        let mut revoked = make_credential("vc:2", 900, 2000);
        revoked.revoked = true;
        revoked.revoked_at = Timestamp::from_epoch_secs(950);
        revoked.revocation_reason = Some("x".into());
        let mut snap =
            consistent_snapshot(vec![make_credential("vc:1", 900, 2000), revoked], vec![], vec![]);
        snap.identities
            .get_mut(&did("did:iss1"))
            .unwrap()
            .as_mut()
            .unwrap()
            .active = false;
        let report = identity_reference(&snap, &cfg());
        let subjects: Vec<_> = report.violations().map(|f| f.subject.as_str()).collect();
        assert_eq!(subjects, vec!["vc:1"]);
    }

    #[test]
    fn unresolved_dids_and_foreign_creator_flagged() {
        let mut vc = make_credential("vc:1", 900, 2000);
        vc.subject_did = did("did:ghost1");
        vc.creator = principal("attest1mallory");
        let snap = consistent_snapshot(vec![vc], vec![], vec![]);
        let report = identity_reference(&snap, &cfg());
        assert_eq!(report.violations().count(), 2);
    }

    #[test]
    fn expiry_window_bounded() {
        let max = crate::testutil::empty_snapshot().params.max_validity_secs;
        let snap = consistent_snapshot(vec![make_credential("vc:1", 900, 900 + max + 1)], vec![], vec![]);
        assert!(expiry_sanity(&snap, &cfg()).broken());
    }

    #[test]
    fn all_expired_is_a_warning_above_threshold() {
        let few: Vec<_> = (0..20).map(|i| make_credential(&format!("vc:{i}"), 100, 200)).collect();
        let snap = consistent_snapshot(few, vec![], vec![]);
        assert!(expiry_sanity(&snap, &cfg()).findings.is_empty());

        let many: Vec<_> = (0..21).map(|i| make_credential(&format!("vc:{i}"), 100, 200)).collect();
        let snap = consistent_snapshot(many, vec![], vec![]);
        let report = expiry_sanity(&snap, &cfg());
        assert!(!report.broken());
        assert_eq!(report.warnings().count(), 1);
    }
}

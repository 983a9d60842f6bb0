//! # Consistency Layer
//!
//! Nine independent invariants over a [`StateSnapshot`]. Each is a pure
//! function returning an [`InvariantReport`]; none reads the store directly
//! or mutates anything.
//!
//! ## Severity
//!
//! A [`Severity::Violation`] means the registry itself is defective and
//! fails a simulation run. A [`Severity::Warning`] is a soft signal (clock
//! or configuration smell, low diversity, historical-activity gap) that is
//! logged and counted but never fails a run.
//!
//! | Invariant | Module |
//! |---|---|
//! | `issuance-consistency` | `credential.rs` |
//! | `revocation-validity` | `credential.rs` |
//! | `identity-reference` | `credential.rs` |
//! | `expiry-sanity` | `credential.rs` |
//! | `index-consistency` | `index.rs` |
//! | `circuit-consistency` | `circuit.rs` |
//! | `active-circuit-health` | `circuit.rs` |
//! | `proof-verification` | `proof.rs` |
//! | `circuit-proof-relationship` | `proof.rs` |

pub mod circuit;
pub mod credential;
pub mod index;
pub mod proof;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::StateSnapshot;

/// Thresholds for the soft signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvariantConfig {
    /// All-expired state is flagged only above this many credentials.
    pub all_expired_signal_threshold: usize,
    /// Single-creator monoculture is flagged only above this many active
    /// circuits.
    pub creator_diversity_threshold: usize,
}

impl Default for InvariantConfig {
    fn default() -> Self {
        Self {
            all_expired_signal_threshold: 20,
            creator_diversity_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Violation,
}

/// One observation about one record (or about the whole state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    /// Record id, foreign key, or `*` for state-wide findings.
    pub subject: String,
    pub message: String,
}

/// Result of running one invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantReport {
    pub name: &'static str,
    pub findings: Vec<Finding>,
}

impl InvariantReport {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            findings: Vec::new(),
        }
    }

    pub fn violation(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Violation, subject, message);
    }

    pub fn warning(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, subject, message);
    }

    fn push(&mut self, severity: Severity, subject: impl Into<String>, message: impl Into<String>) {
        self.findings.push(Finding {
            severity,
            subject: subject.into(),
            message: message.into(),
        });
    }

    /// True iff any finding is a violation.
    pub fn broken(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Violation)
    }

    pub fn violations(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Violation)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }
}

impl fmt::Display for InvariantReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "attest: {} invariant", self.name)?;
        for finding in &self.findings {
            let tag = match finding.severity {
                Severity::Violation => "VIOLATION",
                Severity::Warning => "warning",
            };
            writeln!(f, "{tag} {}: {}", finding.subject, finding.message)?;
        }
        Ok(())
    }
}

/// Signature every invariant shares.
pub type InvariantFn = fn(&StateSnapshot, &InvariantConfig) -> InvariantReport;

/// A broken invariant surfaced by [`InvariantRegistry::assert_all`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{report}")]
pub struct InvariantBroken {
    pub report: InvariantReport,
}

/// Named invariants run together over one snapshot.
#[derive(Clone)]
pub struct InvariantRegistry {
    config: InvariantConfig,
    routes: Vec<(&'static str, InvariantFn)>,
}

impl fmt::Debug for InvariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvariantRegistry")
            .field("config", &self.config)
            .field("routes", &self.names())
            .finish()
    }
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::with_config(InvariantConfig::default())
    }
}

impl InvariantRegistry {
    /// All nine invariants with the given thresholds.
    pub fn with_config(config: InvariantConfig) -> Self {
        let mut registry = Self::empty(config);
        registry.register(credential::ISSUANCE_CONSISTENCY, credential::issuance_consistency);
        registry.register(credential::REVOCATION_VALIDITY, credential::revocation_validity);
        registry.register(credential::IDENTITY_REFERENCE, credential::identity_reference);
        registry.register(credential::EXPIRY_SANITY, credential::expiry_sanity);
        registry.register(index::INDEX_CONSISTENCY, index::index_consistency);
        registry.register(circuit::CIRCUIT_CONSISTENCY, circuit::circuit_consistency);
        registry.register(circuit::ACTIVE_CIRCUIT_HEALTH, circuit::active_circuit_health);
        registry.register(proof::PROOF_VERIFICATION, proof::proof_verification);
        registry.register(proof::CIRCUIT_PROOF_RELATIONSHIP, proof::circuit_proof_relationship);
        registry
    }

    /// A registry with no invariants.
    pub fn empty(config: InvariantConfig) -> Self {
        Self {
            config,
            routes: Vec::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, check: InvariantFn) {
        self.routes.push((name, check));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.routes.iter().map(|(name, _)| *name).collect()
    }

    pub fn config(&self) -> &InvariantConfig {
        &self.config
    }

    /// Run one invariant by name.
    pub fn run(&self, name: &str, snapshot: &StateSnapshot) -> Option<InvariantReport> {
        self.routes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, check)| check(snapshot, &self.config))
    }

    /// Run every invariant, in registration order.
    pub fn run_all(&self, snapshot: &StateSnapshot) -> Vec<InvariantReport> {
        self.routes
            .iter()
            .map(|(_, check)| check(snapshot, &self.config))
            .collect()
    }

    /// Run every invariant and fail on the first broken report. Returns all
    /// reports when none is broken.
    pub fn assert_all(&self, snapshot: &StateSnapshot) -> Result<Vec<InvariantReport>, InvariantBroken> {
        let reports = self.run_all(snapshot);
        for report in &reports {
            for finding in report.warnings() {
                tracing::warn!(invariant = report.name, subject = %finding.subject, "{}", finding.message);
            }
            if report.broken() {
                tracing::error!(invariant = report.name, violations = report.violations().count(), "invariant broken");
                return Err(InvariantBroken {
                    report: report.clone(),
                });
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{empty_snapshot, make_credential};

    #[test]
    fn display_format() {
        let mut report = InvariantReport::new("expiry-sanity");
        report.violation("vc:1", "expires before issuance");
        report.warning("*", "all credentials expired");
        assert_eq!(
            report.to_string(),
            "attest: expiry-sanity invariant\nVIOLATION vc:1: expires before issuance\nwarning *: all credentials expired\n"
        );
    }

    #[test]
    fn warnings_do_not_break() {
        let mut report = InvariantReport::new("x");
        report.warning("*", "soft");
        assert!(!report.broken());
        report.violation("a", "hard");
        assert!(report.broken());
        assert_eq!(report.violations().count(), 1);
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn registry_holds_nine_distinct_invariants() {
        let registry = InvariantRegistry::default();
        let names = registry.names();
        assert_eq!(names.len(), 9);
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), 9);
    }

    #[test]
    fn empty_state_passes_everything() {
        let registry = InvariantRegistry::default();
        let reports = registry.assert_all(&empty_snapshot()).unwrap();
        assert!(reports.iter().all(|r| r.findings.is_empty()));
    }

    #[test]
    fn assert_all_reports_first_broken() {
        let mut snap = empty_snapshot();
        let mut rec = make_credential("vc:1", 900, 1000);
        rec.credential_schema.clear();
        snap.credentials.push(rec);
        let err = InvariantRegistry::default().assert_all(&snap).unwrap_err();
        assert_eq!(err.report.name, credential::ISSUANCE_CONSISTENCY);
        assert!(err.to_string().starts_with("attest: issuance-consistency invariant\n"));
    }

    #[test]
    fn run_by_name() {
        let registry = InvariantRegistry::default();
        let snap = empty_snapshot();
        assert!(registry.run(index::INDEX_CONSISTENCY, &snap).is_some());
        assert!(registry.run("no-such-invariant", &snap).is_none());
    }

    #[test]
    fn rerunning_yields_identical_reports() {
        let mut snap = empty_snapshot();
        snap.credentials.push(make_credential("vc:1", 900, 1000));
        let registry = InvariantRegistry::default();
        assert_eq!(registry.run_all(&snap), registry.run_all(&snap));
    }

    #[test]
    fn recapturing_unchanged_state_yields_identical_reports() {
        use crate::testutil::{issue_msg, make_server, principal, register_msg};
        use attest_core::{CircuitId, ProofId};
        use attest_registry::{ExecContext, MsgSubmitProof};
        use attest_zkp::MockVerifier;

        let server = make_server();
        let mut ctx = ExecContext::at(1000);
        server.issue_credential(&mut ctx, issue_msg("vc:1", 5000)).unwrap();
        server.issue_credential(&mut ctx, issue_msg("vc:2", 1500)).unwrap();
        server.register_circuit(&mut ctx, register_msg("c:1")).unwrap();
        let inputs = vec!["42".to_string()];
        server
            .submit_proof(
                &mut ctx,
                MsgSubmitProof {
                    submitter: principal("attest1submit"),
                    id: ProofId::new("p:1").unwrap(),
                    circuit_id: CircuitId::new("c:1").unwrap(),
                    proof_data: MockVerifier.prove(b"vk", &inputs).unwrap(),
                    public_inputs: inputs,
                },
            )
            .unwrap();
        ctx.advance(1000);

        let store_before = server.store().dump();
        let registry = InvariantRegistry::default();
        let first = registry.run_all(&StateSnapshot::capture(&server, ctx.block_time()).unwrap());
        let second = registry.run_all(&StateSnapshot::capture(&server, ctx.block_time()).unwrap());

        assert_eq!(first.len(), registry.names().len());
        assert_eq!(first, second);
        assert!(first.iter().all(|r| !r.broken()));
        assert_eq!(server.store().dump(), store_before);
    }
}

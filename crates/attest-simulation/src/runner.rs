//! # Simulation Runner
//!
//! Drives the registries through a seeded sequence of planned operations,
//! checking each outcome against the planner's expectation and running the
//! invariant registry every `invariant_period` steps.
//!
//! ## Step
//!
//! ```text
//! advance block ─► capture snapshot ─► [invariants] ─► plan ─► deliver ─► check outcome
//! ```
//!
//! A rejected delivery must leave the store untouched; the runner compares
//! the full store contents before and after. A final snapshot is always
//! checked after the last step.
//!
//! Everything is seeded from `SimulationConfig::seed` and every collection
//! in the summary is ordered, so the same seed yields the same summary.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use attest_core::{Did, Principal, Timestamp};
use attest_registry::{
    ErrorKind, ExecContext, IdentityRecord, MemoryIdentityRegistry, MsgKind, MsgResponse, MsgServer, RegistryError,
    RegistryParams,
};
use attest_store::MemoryStore;
use attest_zkp::MockVerifier;

use crate::error::SimulationError;
use crate::invariants::{InvariantConfig, InvariantRegistry};
use crate::operations::{Expectation, OperationWeights, PlanInput, Planned, Planner};
use crate::snapshot::StateSnapshot;

type SimServer = MsgServer<MemoryStore, MemoryIdentityRegistry, MockVerifier>;

/// Knobs for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub steps: usize,
    /// Principals available as creators, callers and submitters.
    pub accounts: usize,
    /// DIDs registered at genesis, controlled round-robin by the accounts.
    pub identities: usize,
    /// Share of identities deactivated at genesis. The first identity
    /// always stays active.
    pub inactive_identity_percent: u8,
    /// Share of planned operations that break one precondition.
    pub invalid_operation_percent: u8,
    /// Upper bound on the seconds a block advances; at least one.
    pub max_block_interval_secs: i64,
    pub genesis_time: i64,
    /// Run the invariants every this many steps.
    pub invariant_period: usize,
    pub weights: OperationWeights,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 500,
            accounts: 8,
            identities: 12,
            inactive_identity_percent: 15,
            invalid_operation_percent: 10,
            max_block_interval_secs: 3600,
            genesis_time: 1_700_000_000,
            invariant_period: 10,
            weights: OperationWeights::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let fail = |msg: String| Err(SimulationError::Config(msg));
        if self.accounts == 0 {
            return fail("accounts must be positive".into());
        }
        if self.identities == 0 {
            return fail("identities must be positive".into());
        }
        if self.inactive_identity_percent > 100 {
            return fail(format!(
                "inactive_identity_percent must be at most 100, got {}",
                self.inactive_identity_percent
            ));
        }
        if self.invalid_operation_percent > 100 {
            return fail(format!(
                "invalid_operation_percent must be at most 100, got {}",
                self.invalid_operation_percent
            ));
        }
        if self.max_block_interval_secs < 1 {
            return fail(format!(
                "max_block_interval_secs must be positive, got {}",
                self.max_block_interval_secs
            ));
        }
        if self.genesis_time < 1 {
            return fail(format!("genesis_time must be positive, got {}", self.genesis_time));
        }
        if self.invariant_period == 0 {
            return fail("invariant_period must be positive".into());
        }
        if self.weights.total() == 0 {
            return fail("at least one operation weight must be positive".into());
        }
        Ok(())
    }
}

/// Per-kind tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStats {
    pub delivered: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub no_ops: usize,
}

/// Record counts in the final state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub credentials: usize,
    pub revoked_credentials: usize,
    pub circuits: usize,
    pub active_circuits: usize,
    pub proofs: usize,
    pub verified_proofs: usize,
}

impl StateCounts {
    fn of(snap: &StateSnapshot) -> Self {
        Self {
            credentials: snap.credentials.len(),
            revoked_credentials: snap.credentials.iter().filter(|c| c.revoked).count(),
            circuits: snap.circuits.len(),
            active_circuits: snap.circuits.iter().filter(|c| c.active).count(),
            proofs: snap.proofs.len(),
            verified_proofs: snap.proofs.iter().filter(|p| p.verified).count(),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub steps: usize,
    pub final_block_height: u64,
    pub final_block_time: Timestamp,
    pub operations: BTreeMap<MsgKind, OperationStats>,
    /// Rejections by error kind. All were expected.
    pub rejections: BTreeMap<ErrorKind, usize>,
    pub no_op_reasons: BTreeMap<String, usize>,
    /// Planner variants delivered, keyed `kind/variant`.
    pub variants: BTreeMap<String, usize>,
    pub events: usize,
    pub invariant_runs: usize,
    /// Soft findings by invariant name.
    pub warnings: BTreeMap<String, usize>,
    pub final_state: StateCounts,
}

impl SimulationSummary {
    pub fn delivered(&self) -> usize {
        self.operations.values().map(|s| s.delivered).sum()
    }

    pub fn rejected(&self) -> usize {
        self.operations.values().map(|s| s.rejected).sum()
    }
}

/// A configured run over fresh in-memory state.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    params: RegistryParams,
    invariants: InvariantRegistry,
}

impl Simulation {
    pub fn new(
        config: SimulationConfig,
        params: RegistryParams,
        invariants: InvariantConfig,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        params
            .validate()
            .map_err(|e| SimulationError::Config(e.to_string()))?;
        Ok(Self {
            config,
            params,
            invariants: InvariantRegistry::with_config(invariants),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Execute every step and return the tallies.
    pub fn run(&self) -> Result<SimulationSummary, SimulationError> {
        let cfg = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let accounts = (0..cfg.accounts)
            .map(account_principal)
            .collect::<Result<Vec<_>, _>>()?;
        let identities = seed_identities(&mut rng, cfg, &accounts)?;
        let server: SimServer = MsgServer::new(
            MemoryStore::new(),
            identities.clone(),
            MockVerifier,
            self.params.clone(),
        );
        let mut planner = Planner::new(cfg.weights.clone(), cfg.invalid_operation_percent, accounts);
        let mut ctx = ExecContext::new(0, Timestamp::from_epoch_secs(cfg.genesis_time));
        let mut summary = SimulationSummary {
            seed: cfg.seed,
            steps: cfg.steps,
            ..Default::default()
        };

        tracing::info!(
            seed = cfg.seed,
            steps = cfg.steps,
            accounts = cfg.accounts,
            identities = cfg.identities,
            "simulation started"
        );

        for step in 1..=cfg.steps {
            ctx.advance(rng.gen_range(1..=cfg.max_block_interval_secs));
            let snapshot = StateSnapshot::capture(&server, ctx.block_time())?;
            if step % cfg.invariant_period == 0 {
                self.check_invariants(step, &snapshot, &mut summary)?;
            }

            let identity_list = identities.list();
            let input = PlanInput {
                snapshot: &snapshot,
                identities: &identity_list,
            };
            let Some(planned) = planner.plan(&mut rng, input)? else {
                continue;
            };
            self.apply(step, &server, &mut ctx, planned, &mut summary)?;
            summary.events += ctx.take_events().len();
        }

        let last = cfg.steps;
        let final_snapshot = StateSnapshot::capture(&server, ctx.block_time())?;
        self.check_invariants(last, &final_snapshot, &mut summary)?;
        summary.final_block_height = ctx.block_height();
        summary.final_block_time = ctx.block_time();
        summary.final_state = StateCounts::of(&final_snapshot);

        tracing::info!(
            seed = cfg.seed,
            delivered = summary.delivered(),
            rejected = summary.rejected(),
            credentials = summary.final_state.credentials,
            circuits = summary.final_state.circuits,
            proofs = summary.final_state.proofs,
            "simulation finished"
        );
        Ok(summary)
    }

    fn apply(
        &self,
        step: usize,
        server: &SimServer,
        ctx: &mut ExecContext,
        planned: Planned,
        summary: &mut SimulationSummary,
    ) -> Result<(), SimulationError> {
        let kind = planned.kind();
        let stats = summary.operations.entry(kind).or_default();
        let (msg, expect, variant) = match planned {
            Planned::NoOp { reason, .. } => {
                stats.no_ops += 1;
                *summary.no_op_reasons.entry(reason.to_string()).or_default() += 1;
                tracing::debug!(step, kind = %kind, reason, "no-op");
                return Ok(());
            }
            Planned::Deliver { msg, expect, variant } => (msg, expect, variant),
        };
        stats.delivered += 1;
        *summary.variants.entry(format!("{kind}/{variant}")).or_default() += 1;

        let before = server.store().dump();
        let result = server.deliver(ctx, msg);
        let mismatch = |expected: String, actual: String| SimulationError::UnexpectedOutcome {
            step,
            kind,
            variant,
            expected,
            actual,
        };

        match &result {
            Ok(_) => stats.accepted += 1,
            Err(e) => {
                stats.rejected += 1;
                *summary.rejections.entry(e.kind()).or_default() += 1;
                let after = server.store().dump();
                if after != before {
                    return Err(mismatch(
                        "no state change".into(),
                        format!("rejected with {e} but {}", describe_store_change(&before, &after)),
                    ));
                }
            }
        }
        check_outcome(expect, &result).map_err(|(expected, actual)| mismatch(expected, actual))?;
        tracing::debug!(step, kind = %kind, variant, "step applied");
        Ok(())
    }

    fn check_invariants(
        &self,
        step: usize,
        snapshot: &StateSnapshot,
        summary: &mut SimulationSummary,
    ) -> Result<(), SimulationError> {
        let reports = self
            .invariants
            .assert_all(snapshot)
            .map_err(|source| SimulationError::Invariant { step, source })?;
        summary.invariant_runs += 1;
        for report in reports {
            let n = report.warnings().count();
            if n > 0 {
                *summary.warnings.entry(report.name.to_string()).or_default() += n;
            }
        }
        Ok(())
    }
}

/// First key whose contents differ between two store dumps.
fn describe_store_change(before: &BTreeMap<Vec<u8>, Vec<u8>>, after: &BTreeMap<Vec<u8>, Vec<u8>>) -> String {
    let changed = before
        .iter()
        .find(|(k, v)| after.get(*k) != Some(*v))
        .map(|(k, _)| k)
        .or_else(|| after.keys().find(|k| !before.contains_key(*k)));
    match changed {
        Some(key) => format!("key {} changed", String::from_utf8_lossy(key)),
        None => "store changed".to_string(),
    }
}

/// `Err((expected, actual))` when the result disagrees with `expect`.
fn check_outcome(
    expect: Expectation,
    result: &Result<MsgResponse, RegistryError>,
) -> Result<(), (String, String)> {
    match (expect, result) {
        (Expectation::Accept, Ok(_)) => Ok(()),
        (Expectation::Verified(want), Ok(MsgResponse::ProofSubmitted(resp))) if resp.verified == want => Ok(()),
        (Expectation::Reject(want), Err(e)) if e.kind() == want => Ok(()),
        (expect, result) => Err((describe_expectation(expect), describe_result(result))),
    }
}

fn describe_expectation(expect: Expectation) -> String {
    match expect {
        Expectation::Accept => "acceptance".to_string(),
        Expectation::Verified(v) => format!("acceptance with verified={v}"),
        Expectation::Reject(kind) => format!("rejection {kind:?}"),
    }
}

fn describe_result(result: &Result<MsgResponse, RegistryError>) -> String {
    match result {
        Ok(MsgResponse::ProofSubmitted(resp)) => format!("acceptance with verified={}", resp.verified),
        Ok(_) => "acceptance".to_string(),
        Err(e) => format!("rejection {:?}: {e}", e.kind()),
    }
}

/// `attest1sim` followed by four base-26 letters. The data part never
/// contains the separator digit.
pub fn account_principal(index: usize) -> Result<Principal, attest_core::ValidationError> {
    let mut suffix = [b'a'; 4];
    let mut n = index;
    for slot in suffix.iter_mut().rev() {
        *slot = b'a' + (n % 26) as u8;
        n /= 26;
    }
    let suffix: String = suffix.iter().map(|b| char::from(*b)).collect();
    Principal::new(format!("attest1sim{suffix}"))
}

fn seed_identities(
    rng: &mut StdRng,
    cfg: &SimulationConfig,
    accounts: &[Principal],
) -> Result<MemoryIdentityRegistry, SimulationError> {
    let registry = MemoryIdentityRegistry::new();
    for i in 0..cfg.identities {
        let did = Did::new(format!("did:sim:{i}"))?;
        let controller = accounts[i % accounts.len()].clone();
        // Identity 0 stays active so issuance always has a candidate.
        let active = i == 0 || rng.gen_range(0..100u8) >= cfg.inactive_identity_percent;
        registry.insert(IdentityRecord {
            did,
            controller,
            active,
        });
    }
    Ok(registry)
}

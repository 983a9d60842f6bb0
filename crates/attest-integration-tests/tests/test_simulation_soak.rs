//! # Simulation Soak
//!
//! Thousands of randomized steps across several seeds, with invariants
//! checked throughout. Any unexpected registry answer or broken invariant
//! fails the run.

use attest_registry::{ErrorKind, MsgKind, RegistryParams};
use attest_simulation::{
    InvariantConfig, OperationWeights, Simulation, SimulationConfig, SimulationError, SimulationSummary,
};

fn run(config: SimulationConfig) -> Result<SimulationSummary, SimulationError> {
    Simulation::new(config, RegistryParams::default(), InvariantConfig::default())?.run()
}

#[test]
fn soak_several_seeds() {
    for seed in [1, 2, 3, 42, 1337] {
        let summary = run(SimulationConfig {
            seed,
            steps: 1500,
            invariant_period: 25,
            ..Default::default()
        })
        .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        assert_eq!(summary.final_block_height, 1500);
        assert!(summary.final_state.credentials > 0, "seed {seed}");
        assert!(summary.final_state.proofs > 0, "seed {seed}");
    }
}

#[test]
fn adversarial_soak_covers_rejection_kinds() {
    let summary = run(SimulationConfig {
        seed: 99,
        steps: 3000,
        invalid_operation_percent: 40,
        invariant_period: 50,
        ..Default::default()
    })
    .unwrap_or_else(|e| panic!("{e}"));

    for kind in [
        ErrorKind::CredentialExists,
        ErrorKind::UnknownSubject,
        ErrorKind::InvalidExpiry,
        ErrorKind::Unauthorized,
        ErrorKind::AlreadyRevoked,
        ErrorKind::CredentialNotFound,
        ErrorKind::CircuitExists,
        ErrorKind::CircuitNotFound,
        ErrorKind::AlreadyDeactivated,
        ErrorKind::CircuitDeactivated,
        ErrorKind::ProofExists,
        ErrorKind::VerificationError,
    ] {
        assert!(summary.rejections.get(&kind).copied().unwrap_or(0) > 0, "{kind:?} never exercised");
    }
}

#[test]
fn identical_seeds_identical_summaries() {
    let config = SimulationConfig {
        seed: 2024,
        steps: 800,
        invalid_operation_percent: 25,
        ..Default::default()
    };
    let a = run(config.clone()).unwrap();
    let b = run(config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn different_seeds_diverge() {
    let a = run(SimulationConfig { seed: 5, steps: 300, ..Default::default() }).unwrap();
    let b = run(SimulationConfig { seed: 6, steps: 300, ..Default::default() }).unwrap();
    assert_ne!(a, b);
}

#[test]
fn run_without_producers_only_no_ops() {
    let weights = OperationWeights {
        issue_credential: 0,
        revoke_credential: 1,
        register_circuit: 0,
        submit_proof: 1,
        deactivate_circuit: 1,
    };
    let summary = run(SimulationConfig {
        seed: 8,
        steps: 50,
        invalid_operation_percent: 0,
        weights,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(summary.delivered(), 0);
    assert!(summary.no_op_reasons.contains_key("no active credentials"));
    assert!(summary.no_op_reasons.contains_key("no active circuits"));
    assert!(!summary.operations.contains_key(&MsgKind::IssueCredential));
}

#[test]
fn summary_serializes_to_json() {
    let summary = run(SimulationConfig { seed: 3, steps: 100, ..Default::default() }).unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["seed"], 3);
    assert!(json["operations"].get("issue_credential").is_some());
}

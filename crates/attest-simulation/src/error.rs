//! Simulation error types.

use thiserror::Error;

use attest_core::ValidationError;
use attest_registry::{MsgKind, RegistryError};

use crate::invariants::InvariantBroken;

/// Errors that end a simulation run.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The configuration cannot drive a run.
    #[error("invalid simulation config: {0}")]
    Config(String),

    /// A generated or seeded identifier failed validation.
    #[error("identifier generation failed: {0}")]
    Identifier(#[from] ValidationError),

    /// The registry answered differently from the planner's expectation.
    #[error("step {step}: {kind} ({variant}) expected {expected}, got {actual}")]
    UnexpectedOutcome {
        step: usize,
        kind: MsgKind,
        variant: &'static str,
        expected: String,
        actual: String,
    },

    /// A hard invariant failed.
    #[error("step {step}: {source}")]
    Invariant {
        step: usize,
        #[source]
        source: InvariantBroken,
    },

    /// Capturing a snapshot failed.
    #[error("snapshot capture failed: {0}")]
    Snapshot(#[from] RegistryError),
}

//! # attest-simulation: Consistency Layer and Operation Simulator
//!
//! Checks that the registries' state stays coherent across long randomized
//! operation sequences.
//!
//! ## Modules
//!
//! - [`snapshot`]: [`StateSnapshot`], a read-only picture of every record,
//!   index and identity resolution, captured through the public query API.
//! - [`invariants`]: nine pure checks over a snapshot and the
//!   [`InvariantRegistry`] that runs them.
//! - [`operations`]: the weighted [`Planner`], which draws messages from
//!   live state or explains why it cannot.
//! - [`runner`]: [`Simulation`], the seeded step loop that delivers planned
//!   messages and enforces expectations and invariants.
//!
//! ## Determinism
//!
//! All randomness flows from one `StdRng` seeded by
//! [`SimulationConfig::seed`]. The registries carry no wall-clock reads and
//! every map in the summary is ordered, so a seed reproduces a run exactly.

pub mod error;
pub mod invariants;
pub mod operations;
pub mod runner;
pub mod snapshot;

#[cfg(test)]
mod testutil;

pub use error::SimulationError;
pub use invariants::{Finding, InvariantBroken, InvariantConfig, InvariantFn, InvariantRegistry, InvariantReport, Severity};
pub use operations::{Expectation, OperationWeights, PlanInput, Planned, Planner};
pub use runner::{account_principal, OperationStats, Simulation, SimulationConfig, SimulationSummary, StateCounts};
pub use snapshot::{IdMap, Lookup, StateSnapshot};

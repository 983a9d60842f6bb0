//! # attest-cli: Command-Line Interface
//!
//! Provides the `attest` binary.
//!
//! ## Subcommands
//!
//! - `attest simulate`: Run a seeded operation simulation with invariant
//!   checks and print the summary.
//! - `attest params`: Print the effective configuration.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers here return an exit code
//!   or an `anyhow` error with context.
//! - No registry logic here. Handlers delegate to `attest-simulation`.

pub mod config;
pub mod params;
pub mod simulate;

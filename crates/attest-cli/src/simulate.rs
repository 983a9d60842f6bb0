//! # Simulate Subcommand
//!
//! Runs one seeded simulation and prints its summary.
//!
//! ```bash
//! attest simulate --seed 7 --steps 5000
//! attest simulate --config attest.yaml --json
//! ```

use std::fmt::{self, Write as _};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use attest_simulation::{Simulation, SimulationSummary};

use crate::config::AttestConfig;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// RNG seed. Overrides `simulation.seed` from the config file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of steps. Overrides `simulation.steps`.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Emit the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run_simulate(args: &SimulateArgs, config_path: Option<&Path>) -> Result<u8> {
    let mut config = AttestConfig::load(config_path)?;
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(steps) = args.steps {
        config.simulation.steps = steps;
    }
    let simulation = Simulation::new(config.simulation, config.registry, config.invariants)
        .context("failed to configure simulation")?;
    let seed = simulation.config().seed;
    let summary = simulation
        .run()
        .with_context(|| format!("simulation with seed {seed} failed"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render(&summary).context("failed to render summary")?);
    }
    Ok(0)
}

/// Plain-text summary.
pub fn render(summary: &SimulationSummary) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_summary(&mut out, summary)?;
    Ok(out)
}

fn write_summary(out: &mut impl fmt::Write, summary: &SimulationSummary) -> fmt::Result {
    writeln!(out, "seed {}: {} steps, {} invariant runs", summary.seed, summary.steps, summary.invariant_runs)?;
    writeln!(
        out,
        "final block {} at {} ({})",
        summary.final_block_height,
        summary.final_block_time.to_iso8601(),
        summary.final_block_time
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "  {:<20} {:>9} {:>9} {:>9} {:>7}",
        "operation", "delivered", "accepted", "rejected", "no-op"
    )?;
    for (kind, stats) in &summary.operations {
        writeln!(
            out,
            "  {:<20} {:>9} {:>9} {:>9} {:>7}",
            kind.as_str(),
            stats.delivered,
            stats.accepted,
            stats.rejected,
            stats.no_ops
        )?;
    }
    write_counts(out, "expected rejections:", summary.rejections.iter().map(|(k, n)| (format!("{k:?}"), *n)))?;
    write_counts(out, "no-ops:", summary.no_op_reasons.iter().map(|(r, n)| (r.clone(), *n)))?;
    write_counts(out, "warnings:", summary.warnings.iter().map(|(w, n)| (w.clone(), *n)))?;
    let s = &summary.final_state;
    writeln!(out)?;
    writeln!(
        out,
        "state: {} credentials ({} revoked), {} circuits ({} active), {} proofs ({} verified)",
        s.credentials, s.revoked_credentials, s.circuits, s.active_circuits, s.proofs, s.verified_proofs
    )
}

/// A titled `name: count` section, omitted when empty.
fn write_counts(
    out: &mut impl fmt::Write,
    title: &str,
    counts: impl Iterator<Item = (String, usize)>,
) -> fmt::Result {
    let mut counts = counts.peekable();
    if counts.peek().is_none() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{title}")?;
    for (name, n) in counts {
        writeln!(out, "  {name}: {n}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(seed: u64, steps: usize) -> SimulateArgs {
        SimulateArgs {
            seed: Some(seed),
            steps: Some(steps),
            json: false,
        }
    }

    #[test]
    fn short_run_succeeds() {
        assert_eq!(run_simulate(&args(3, 40), None).unwrap(), 0);
    }

    #[test]
    fn config_file_applies_and_flags_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attest.yaml");
        std::fs::write(&path, "simulation:\n  seed: 1\n  steps: 100000\n  invariant_period: 3\n").unwrap();
        assert_eq!(run_simulate(&args(5, 30), Some(&path)).unwrap(), 0);
    }

    #[test]
    fn invalid_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attest.yaml");
        std::fs::write(&path, "simulation:\n  invariant_period: 0\n").unwrap();
        assert!(run_simulate(&args(5, 30), Some(&path)).is_err());
    }

    #[test]
    fn render_lists_every_section() {
        let summary = Simulation::new(
            attest_simulation::SimulationConfig {
                seed: 11,
                steps: 60,
                invalid_operation_percent: 50,
                ..Default::default()
            },
            Default::default(),
            Default::default(),
        )
        .unwrap()
        .run()
        .unwrap();
        let text = render(&summary).unwrap();
        assert!(text.starts_with("seed 11: 60 steps"));
        assert!(text.contains(&summary.final_block_time.to_iso8601()));
        assert!(text.contains("operation"));
        assert!(text.contains("expected rejections:"));
        assert!(text.contains("state: "));
    }

    struct FullSink;

    impl fmt::Write for FullSink {
        fn write_str(&mut self, _: &str) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn write_errors_propagate() {
        let summary = attest_simulation::SimulationSummary::default();
        assert!(write_summary(&mut FullSink, &summary).is_err());
    }

    #[test]
    fn empty_sections_are_omitted() {
        let text = render(&attest_simulation::SimulationSummary::default()).unwrap();
        assert!(text.contains("final block 0 at 1970-01-01T00:00:00Z (0)"));
        assert!(!text.contains("no-ops:"));
        assert!(!text.contains("warnings:"));
    }
}

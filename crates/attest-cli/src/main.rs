//! # attest CLI entry point
//!
//! Parses command-line arguments, configures logging and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use attest_cli::params::{run_params, ParamsArgs};
use attest_cli::simulate::{run_simulate, SimulateArgs};

/// attest: credential, circuit and proof registries.
#[derive(Parser, Debug)]
#[command(name = "attest", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a seeded simulation and check every invariant.
    Simulate(SimulateArgs),

    /// Print the effective configuration as YAML.
    Params(ParamsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Simulate(args) => run_simulate(args, config),
        Commands::Params(args) => run_params(args, config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_simulate_defaults() {
        let cli = Cli::try_parse_from(["attest", "simulate"]).unwrap();
        if let Commands::Simulate(args) = cli.command {
            assert!(args.seed.is_none());
            assert!(args.steps.is_none());
            assert!(!args.json);
        } else {
            panic!("expected simulate");
        }
    }

    #[test]
    fn cli_parse_simulate_with_all_options() {
        let cli = Cli::try_parse_from([
            "attest",
            "simulate",
            "--seed",
            "7",
            "--steps",
            "2000",
            "--config",
            "attest.yaml",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("attest.yaml")));
        if let Commands::Simulate(args) = cli.command {
            assert_eq!(args.seed, Some(7));
            assert_eq!(args.steps, Some(2000));
            assert!(args.json);
        } else {
            panic!("expected simulate");
        }
    }

    #[test]
    fn cli_parse_params() {
        let cli = Cli::try_parse_from(["attest", "--config", "a.yaml", "params"]).unwrap();
        assert!(matches!(cli.command, Commands::Params(_)));
        assert_eq!(cli.config, Some(PathBuf::from("a.yaml")));
    }

    #[test]
    fn cli_parse_verbose_and_json_logs() {
        let cli = Cli::try_parse_from(["attest", "-vv", "--log-json", "params"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
    }

    #[test]
    fn cli_parse_rejects_bad_seed() {
        assert!(Cli::try_parse_from(["attest", "simulate", "--seed", "minus"]).is_err());
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["attest"]).is_err());
    }
}

//! # Params Subcommand
//!
//! Prints the effective configuration as YAML, after defaults are merged
//! and every section is validated.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::config::AttestConfig;

#[derive(Args, Debug)]
pub struct ParamsArgs {}

pub fn run_params(_args: &ParamsArgs, config_path: Option<&Path>) -> Result<u8> {
    let config = AttestConfig::load(config_path)?;
    print!("{}", config.to_yaml()?);
    Ok(0)
}

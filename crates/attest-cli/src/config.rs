//! # Configuration File
//!
//! One YAML document holds registry parameters, invariant thresholds and
//! simulation knobs. Every key is optional:
//!
//! ```yaml
//! registry:
//!   max_validity_secs: 31536000
//! invariants:
//!   creator_diversity_threshold: 8
//! simulation:
//!   seed: 7
//!   steps: 2000
//!   weights:
//!     deactivate_circuit: 0
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use attest_registry::RegistryParams;
use attest_simulation::{InvariantConfig, SimulationConfig};

/// Effective configuration after defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestConfig {
    pub registry: RegistryParams,
    pub invariants: InvariantConfig,
    pub simulation: SimulationConfig,
}

impl AttestConfig {
    /// Load from `path`, or the defaults when no file is given. The result
    /// is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_yaml(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document is the all-defaults config.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("failed to parse YAML")
    }

    pub fn validate(&self) -> Result<()> {
        self.registry.validate().context("registry parameters")?;
        self.simulation.validate().context("simulation parameters")?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to render config")
    }
}

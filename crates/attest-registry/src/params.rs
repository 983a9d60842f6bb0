//! # Registry Parameters
//!
//! Tunables loaded from configuration. Every field has a default, so a
//! partial YAML/JSON document is valid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One hundred 365-day years, in seconds.
pub const DEFAULT_MAX_VALIDITY_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Parameter set rejected at load time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    /// The validity window must be positive.
    #[error("max_validity_secs must be positive, got {0}")]
    NonPositiveValidity(i64),
    /// Page limits must be positive.
    #[error("{0} must be positive")]
    ZeroPageLimit(&'static str),
    /// The default page size exceeds the cap.
    #[error("default_page_limit ({default}) exceeds max_page_limit ({max})")]
    DefaultExceedsMax {
        /// Configured default.
        default: usize,
        /// Configured cap.
        max: usize,
    },
}

/// Registry-wide tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryParams {
    /// Longest allowed gap between issuance and expiry.
    pub max_validity_secs: i64,
    /// Page size used when a query passes `limit = 0`.
    pub default_page_limit: usize,
    /// Largest page a query may request.
    pub max_page_limit: usize,
}

impl Default for RegistryParams {
    fn default() -> Self {
        Self {
            max_validity_secs: DEFAULT_MAX_VALIDITY_SECS,
            default_page_limit: 100,
            max_page_limit: 1000,
        }
    }
}

impl RegistryParams {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_validity_secs <= 0 {
            return Err(ParamsError::NonPositiveValidity(self.max_validity_secs));
        }
        if self.default_page_limit == 0 {
            return Err(ParamsError::ZeroPageLimit("default_page_limit"));
        }
        if self.max_page_limit == 0 {
            return Err(ParamsError::ZeroPageLimit("max_page_limit"));
        }
        if self.default_page_limit > self.max_page_limit {
            return Err(ParamsError::DefaultExceedsMax {
                default: self.default_page_limit,
                max: self.max_page_limit,
            });
        }
        Ok(())
    }

    /// Effective page size for a requested limit.
    pub fn page_limit(&self, requested: usize) -> usize {
        match requested {
            0 => self.default_page_limit,
            n => n.min(self.max_page_limit),
        }
    }
}

/// Offset/limit window over a filtered result set.
///
/// `limit = 0` means "the configured default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Entries to skip after filtering.
    pub offset: usize,
    /// Maximum entries to return.
    pub limit: usize,
}

impl Pagination {
    /// A window of `limit` entries starting at `offset`.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

//! # Temporal Types: Ledger Time in Epoch Seconds
//!
//! Defines [`Timestamp`], the block-time value stamped onto every record.
//!
//! ## Semantics
//!
//! Ledger time is whole seconds since the Unix epoch. [`Timestamp::ZERO`] is
//! the "unset" sentinel used by `revokedAt` and `verifiedAt`: a record is
//! revoked iff its `revokedAt` is set, and so on. The registry never reads
//! the wall clock; the host supplies block time with each operation, which
//! keeps execution deterministic across replicas.
//!
//! Serialized form is the bare integer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, as supplied by the host's block header.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The unset sentinel.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a timestamp from epoch seconds.
    pub const fn from_epoch_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub const fn epoch_secs(&self) -> i64 {
        self.0
    }

    /// True unless this is the [`Timestamp::ZERO`] sentinel.
    pub const fn is_set(&self) -> bool {
        self.0 > 0
    }

    /// Add seconds, returning `None` on overflow.
    pub fn checked_add_secs(&self, secs: i64) -> Option<Self> {
        self.0.checked_add(secs).map(Self)
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    pub fn saturating_secs_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Render as ISO 8601 with Z suffix, or the raw integer if out of range.
    pub fn to_iso8601(&self) -> String {
        match DateTime::<Utc>::from_timestamp(self.0, 0) {
            Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_unset() {
        assert!(!Timestamp::ZERO.is_set());
        assert!(!Timestamp::from_epoch_secs(-5).is_set());
        assert!(Timestamp::from_epoch_secs(1).is_set());
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(Timestamp::default(), Timestamp::ZERO);
    }

    #[test]
    fn ordering_follows_seconds() {
        assert!(Timestamp::from(1000) < Timestamp::from(2000));
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(
            Timestamp::from(1000).checked_add_secs(500),
            Some(Timestamp::from(1500))
        );
        assert_eq!(Timestamp::from(i64::MAX).checked_add_secs(1), None);
    }

    #[test]
    fn secs_since() {
        let a = Timestamp::from(1000);
        let b = Timestamp::from(1500);
        assert_eq!(b.saturating_secs_since(a), 500);
        assert_eq!(a.saturating_secs_since(b), -500);
    }

    // ---- rendering ----

    #[test]
    fn iso8601_rendering() {
        assert_eq!(Timestamp::ZERO.to_iso8601(), "1970-01-01T00:00:00Z");
        assert_eq!(
            Timestamp::from(1_768_478_400).to_iso8601(),
            "2026-01-15T12:00:00Z"
        );
    }

    #[test]
    fn iso8601_falls_back_for_out_of_range() {
        assert_eq!(Timestamp::from(i64::MAX).to_iso8601(), i64::MAX.to_string());
    }

    #[test]
    fn serializes_as_bare_integer() {
        assert_eq!(serde_json::to_string(&Timestamp::from(1500)).unwrap(), "1500");
        let ts: Timestamp = serde_json::from_str("2000").unwrap();
        assert_eq!(ts.epoch_secs(), 2000);
    }
}

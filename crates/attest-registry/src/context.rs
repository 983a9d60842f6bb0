//! # Execution Context
//!
//! Per-transaction host state: block height, block time, and the event
//! sink. Registries read time only from here, never from the wall clock.

use attest_core::Timestamp;

use crate::error::RegistryError;
use crate::events::RegistryEvent;

/// Host-supplied state for one serially executed operation.
#[derive(Debug, Clone)]
pub struct ExecContext {
    block_height: u64,
    block_time: Timestamp,
    events: Vec<RegistryEvent>,
}

impl ExecContext {
    /// Context for a block at `block_time`.
    pub fn new(block_height: u64, block_time: Timestamp) -> Self {
        Self {
            block_height,
            block_time,
            events: Vec::new(),
        }
    }

    /// Context at `secs` on a nominal block height of 1.
    pub fn at(secs: i64) -> Self {
        Self::new(1, Timestamp::from_epoch_secs(secs))
    }

    /// Current block height.
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    /// Current block time.
    pub fn block_time(&self) -> Timestamp {
        self.block_time
    }

    /// Block time, or [`RegistryError::InvalidBlockTime`] if unset.
    ///
    /// Every stamped timestamp must be positive, so a zero clock is refused
    /// before anything is written.
    pub fn now(&self) -> Result<Timestamp, RegistryError> {
        if self.block_time.is_set() {
            Ok(self.block_time)
        } else {
            Err(RegistryError::InvalidBlockTime(format!(
                "block time {} is not positive",
                self.block_time
            )))
        }
    }

    /// Move to a later block.
    pub fn advance(&mut self, secs: i64) {
        self.block_height = self.block_height.saturating_add(1);
        self.block_time = self
            .block_time
            .checked_add_secs(secs)
            .unwrap_or(Timestamp::from_epoch_secs(i64::MAX));
    }

    /// Record a committed event.
    pub fn emit(&mut self, event: RegistryEvent) {
        self.events.push(event);
    }

    /// Events emitted so far.
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// Drain emitted events.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }
}

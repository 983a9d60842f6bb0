//! # Store Trait
//!
//! The host-provided storage capability. Registries hold a handle to an
//! implementation and never reach for a global.

use std::sync::Arc;

use crate::batch::WriteBatch;
use crate::error::StoreError;

/// Ordered byte-keyed store with prefix iteration.
///
/// Implementations must apply a [`WriteBatch`] atomically: after `write`
/// returns, either every staged operation is visible or none is. Readers
/// never observe a partially applied batch.
pub trait KvStore: Send + Sync {
    /// Read a single key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Existence check, separate from `get` so backends can answer cheaply.
    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Apply a batch atomically.
    fn write(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        (**self).has(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        (**self).scan_prefix(prefix)
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).write(batch)
    }
}

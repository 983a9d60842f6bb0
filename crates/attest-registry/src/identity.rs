//! # Identity Resolver
//!
//! Read-only capability onto the external identity registry. The credential
//! registry is handed a resolver at construction and never sees the
//! identity module's internal types or writes to it.
//!
//! [`MemoryIdentityRegistry`] is a self-contained implementation for tests
//! and simulation. It can be switched unavailable to exercise the
//! external-dependency error path.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use attest_core::{Did, Principal};

/// What the registry needs to know about one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// The identity's DID.
    pub did: Did,
    /// The principal that controls the identity.
    pub controller: Principal,
    /// Whether the identity may currently issue.
    pub active: bool,
}

/// The identity registry could not answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The registry is unreachable or timed out.
    #[error("identity registry unavailable: {0}")]
    Unavailable(String),
}

/// Resolve DIDs against the external identity registry.
///
/// `Ok(None)` means the DID is not registered. Implementations must be
/// synchronous and must not retry internally.
pub trait IdentityResolver: Send + Sync {
    /// Look up one DID.
    fn resolve(&self, did: &Did) -> Result<Option<IdentityRecord>, IdentityError>;
}

impl<T: IdentityResolver + ?Sized> IdentityResolver for Arc<T> {
    fn resolve(&self, did: &Did) -> Result<Option<IdentityRecord>, IdentityError> {
        (**self).resolve(did)
    }
}

/// In-memory identity registry. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityRegistry {
    records: Arc<RwLock<BTreeMap<Did, IdentityRecord>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryIdentityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active identity, replacing any previous record for `did`.
    pub fn register(&self, did: Did, controller: Principal) -> IdentityRecord {
        let record = IdentityRecord {
            did: did.clone(),
            controller,
            active: true,
        };
        self.records.write().insert(did, record.clone());
        record
    }

    /// Insert a record as-is.
    pub fn insert(&self, record: IdentityRecord) {
        self.records.write().insert(record.did.clone(), record);
    }

    /// Mark an identity inactive. Returns `false` if it is not registered.
    pub fn deactivate(&self, did: &Did) -> bool {
        match self.records.write().get_mut(did) {
            Some(record) => {
                record.active = false;
                true
            }
            None => false,
        }
    }

    /// Make every subsequent `resolve` fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All registered identities, ordered by DID.
    pub fn list(&self) -> Vec<IdentityRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Active identities, ordered by DID.
    pub fn list_active(&self) -> Vec<IdentityRecord> {
        self.records
            .read()
            .values()
            .filter(|r| r.active)
            .cloned()
            .collect()
    }
}

impl IdentityResolver for MemoryIdentityRegistry {
    fn resolve(&self, did: &Did) -> Result<Option<IdentityRecord>, IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable(format!("cannot resolve {did}")));
        }
        Ok(self.records.read().get(did).cloned())
    }
}

//! # Secondary Indexes
//!
//! Append-only derived key ranges mapping a foreign key (issuer DID, subject
//! DID, circuit id) to record ids. Entries are never rewritten after
//! insertion.
//!
//! Key order within one foreign key is lexicographic by record id, which is
//! not insertion order. Each entry therefore carries a sequence number drawn
//! from a store-wide counter staged into the same [`WriteBatch`] as the
//! entry, and enumeration sorts by it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::batch::WriteBatch;
use crate::codec;
use crate::error::StoreError;
use crate::keys;
use crate::kv::KvStore;

/// Value stored under an index key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Id of the primary record this entry points at.
    pub record_id: String,
    /// Position in global insertion order.
    pub sequence: u64,
}

/// One secondary-index key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryIndex {
    prefix: &'static [u8],
}

impl SecondaryIndex {
    /// Index over the given key range.
    pub const fn new(prefix: &'static [u8]) -> Self {
        Self { prefix }
    }

    /// Stage an entry for `(foreign_key, record_id)` into `batch`, allocating
    /// the next insertion sequence.
    pub fn stage_append<S: KvStore + ?Sized>(
        &self,
        store: &S,
        batch: &mut WriteBatch,
        foreign_key: &str,
        record_id: &str,
    ) -> Result<(), StoreError> {
        let sequence = next_sequence(store, batch)?;
        let entry = IndexEntry {
            record_id: record_id.to_string(),
            sequence,
        };
        batch.put(
            keys::index_key(self.prefix, foreign_key, record_id),
            codec::encode(&entry)?,
        );
        Ok(())
    }

    /// Entries for one foreign key, in insertion order.
    pub fn entries<S: KvStore + ?Sized>(
        &self,
        store: &S,
        foreign_key: &str,
    ) -> Result<Vec<IndexEntry>, StoreError> {
        let scan = keys::foreign_key_prefix(self.prefix, foreign_key);
        let mut entries = store
            .scan_prefix(&scan)?
            .into_iter()
            .map(|(k, v)| codec::decode::<IndexEntry>(&k, &v))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    /// Record ids for one foreign key, in insertion order.
    pub fn record_ids<S: KvStore + ?Sized>(
        &self,
        store: &S,
        foreign_key: &str,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries(store, foreign_key)?
            .into_iter()
            .map(|e| e.record_id)
            .collect())
    }

    /// Every `(foreign key, entry)` pair in the range, parsed from raw keys.
    ///
    /// Keys that do not parse are reported as corrupt rather than skipped.
    pub fn scan_all<S: KvStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Vec<(String, String, IndexEntry)>, StoreError> {
        store
            .scan_prefix(self.prefix)?
            .into_iter()
            .map(|(k, v)| {
                let (fk, id) = keys::parse_index_key(self.prefix, &k)
                    .ok_or_else(|| StoreError::corrupt(&k, "unparseable index key"))?;
                let entry = codec::decode::<IndexEntry>(&k, &v)?;
                Ok((fk, id, entry))
            })
            .collect()
    }

    /// Stage deletion of every key in the range.
    ///
    /// Returns the lowest insertion sequence seen per record id, so a rebuild
    /// can keep the previous order. Entries whose value no longer decodes are
    /// deleted without contributing a sequence.
    pub fn stage_clear<S: KvStore + ?Sized>(
        &self,
        store: &S,
        batch: &mut WriteBatch,
    ) -> Result<BTreeMap<String, u64>, StoreError> {
        let mut prior = BTreeMap::new();
        for (key, value) in store.scan_prefix(self.prefix)? {
            if let Ok(entry) = codec::decode::<IndexEntry>(&key, &value) {
                prior
                    .entry(entry.record_id)
                    .and_modify(|seq: &mut u64| *seq = (*seq).min(entry.sequence))
                    .or_insert(entry.sequence);
            }
            batch.delete(key);
        }
        Ok(prior)
    }
}

/// Allocate the next insertion sequence, honouring values already staged
/// in `batch`.
fn next_sequence<S: KvStore + ?Sized>(store: &S, batch: &mut WriteBatch) -> Result<u64, StoreError> {
    let key = keys::INDEX_SEQUENCE_KEY;
    let current = match batch.staged(key) {
        Some(Some(bytes)) => decode_counter(key, bytes)?,
        Some(None) => 0,
        None => match store.get(key)? {
            Some(bytes) => decode_counter(key, &bytes)?,
            None => 0,
        },
    };
    let next = current.checked_add(1).ok_or(StoreError::SequenceExhausted)?;
    batch.put(key.to_vec(), next.to_be_bytes().to_vec());
    Ok(next)
}

fn decode_counter(key: &[u8], bytes: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::corrupt(key, format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

//! # Write Batches
//!
//! An ordered list of puts and deletes applied atomically by
//! [`KvStore::write`](crate::KvStore::write). Later operations on the same
//! key win.

use std::collections::BTreeMap;

/// A single staged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Set `key` to `value`.
    Put {
        /// Target key.
        key: Vec<u8>,
        /// New value.
        value: Vec<u8>,
    },
    /// Remove `key` if present.
    Delete {
        /// Target key.
        key: Vec<u8>,
    },
}

/// Mutations staged for one atomic commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Stage a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.into() });
        self
    }

    /// The staged value for `key`, if this batch writes it.
    ///
    /// `Some(None)` means the batch deletes the key.
    pub fn staged(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.ops.iter().rev().find_map(|op| match op {
            BatchOp::Put { key: k, value } if k == key => Some(Some(value.as_slice())),
            BatchOp::Delete { key: k } if k == key => Some(None),
            _ => None,
        })
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Collapse to the final effect per key, in key order.
    pub fn into_effects(self) -> BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        let mut effects = BTreeMap::new();
        for op in self.ops {
            match op {
                BatchOp::Put { key, value } => {
                    effects.insert(key, Some(value));
                }
                BatchOp::Delete { key } => {
                    effects.insert(key, None);
                }
            }
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_op_wins() {
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"1".to_vec()).put(b"k".to_vec(), b"2".to_vec());
        assert_eq!(batch.staged(b"k"), Some(Some(&b"2"[..])));
        batch.delete(b"k".to_vec());
        assert_eq!(batch.staged(b"k"), Some(None));
        assert_eq!(batch.staged(b"other"), None);
        let effects = batch.into_effects();
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[&b"k".to_vec()], None);
    }

    #[test]
    fn empty_batch() {
        let batch = WriteBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}

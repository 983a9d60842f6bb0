//! # attest-store: Key-Value Store Adapter
//!
//! The leaf storage layer every registry builds on: an ordered byte-keyed
//! store with prefix iteration and atomic multi-key writes.
//!
//! ## Layout
//!
//! Three primary key ranges (credential, circuit, proof by id) and three
//! secondary-index ranges (credential by issuer, credential by subject,
//! proof by circuit). Index entries are keyed `prefix ++ fk ++ "/" ++ id ++ "/"`
//! so a prefix scan per foreign key returns exactly that key's entries. See
//! [`keys`].
//!
//! ## Atomicity
//!
//! A registry mutation touches several keys (record, index entries, the
//! insertion counter). They are assembled into one [`WriteBatch`] and handed
//! to [`KvStore::write`], which applies all of them or none.

pub mod batch;
pub mod codec;
pub mod error;
pub mod index;
pub mod keys;
pub mod kv;
pub mod memory;

// Re-export primary types.
pub use batch::{BatchOp, WriteBatch};
pub use error::StoreError;
pub use index::{IndexEntry, SecondaryIndex};
pub use kv::KvStore;
pub use memory::MemoryStore;

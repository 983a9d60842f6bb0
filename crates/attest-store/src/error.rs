use thiserror::Error;

use attest_core::CanonicalizationError;

/// Errors raised by the storage layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A stored value could not be decoded into the expected record type.
    #[error("corrupt value at key {key}: {reason}")]
    Corrupt {
        /// Printable rendering of the offending key.
        key: String,
        /// Decoder message.
        reason: String,
    },

    /// A record could not be encoded for storage.
    #[error("encoding failed: {0}")]
    Encode(#[from] CanonicalizationError),

    /// The insertion counter would overflow.
    #[error("index sequence exhausted")]
    SequenceExhausted,

    /// The backing store rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Build a [`StoreError::Corrupt`] for a raw key.
    pub fn corrupt(key: &[u8], reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: reason.to_string(),
        }
    }
}

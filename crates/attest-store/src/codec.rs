//! Record encoding. Values are canonical JSON so identical records produce
//! identical bytes on every replica.

use serde::de::DeserializeOwned;
use serde::Serialize;

use attest_core::CanonicalBytes;

use crate::error::StoreError;

/// Encode a record for storage.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, StoreError> {
    Ok(CanonicalBytes::new(record)?.into_bytes())
}

/// Decode a stored value, attributing failures to `key`.
pub fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::corrupt(key, e))
}

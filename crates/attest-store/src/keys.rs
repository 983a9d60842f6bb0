//! # Key Layout
//!
//! Byte prefixes for every key range the registry owns. Primary keys are
//! `prefix ++ id ++ "/"`; index keys are `prefix ++ fk ++ "/" ++ id ++ "/"`.
//! Identifiers never contain `/` (enforced in `attest-core`), so the split
//! is unambiguous.

use attest_core::KEY_DELIMITER;

/// Credential records by id.
pub const CREDENTIAL_PREFIX: &[u8] = b"VcRecord/value/";
/// Credential ids by issuer DID.
pub const CREDENTIAL_BY_ISSUER_PREFIX: &[u8] = b"VcRecord/issuer/";
/// Credential ids by subject DID.
pub const CREDENTIAL_BY_SUBJECT_PREFIX: &[u8] = b"VcRecord/subject/";

/// Circuit records by id.
pub const CIRCUIT_PREFIX: &[u8] = b"Circuit/value/";

/// Proof records by id.
pub const PROOF_PREFIX: &[u8] = b"ZkProof/value/";
/// Proof ids by circuit id.
pub const PROOF_BY_CIRCUIT_PREFIX: &[u8] = b"ZkProof/circuit/";

/// Store-wide insertion counter for secondary-index ordering.
pub const INDEX_SEQUENCE_KEY: &[u8] = b"Meta/index-sequence";

const DELIM: u8 = KEY_DELIMITER as u8;

/// `prefix ++ id ++ "/"`.
pub fn primary_key(prefix: &[u8], id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + id.len() + 1);
    key.extend_from_slice(prefix);
    key.extend_from_slice(id.as_bytes());
    key.push(DELIM);
    key
}

/// `prefix ++ fk ++ "/"`, the scan prefix for one foreign key's entries.
pub fn foreign_key_prefix(prefix: &[u8], foreign_key: &str) -> Vec<u8> {
    primary_key(prefix, foreign_key)
}

/// `prefix ++ fk ++ "/" ++ id ++ "/"`.
pub fn index_key(prefix: &[u8], foreign_key: &str, id: &str) -> Vec<u8> {
    let mut key = foreign_key_prefix(prefix, foreign_key);
    key.extend_from_slice(id.as_bytes());
    key.push(DELIM);
    key
}

/// Recover the id from a primary key.
pub fn parse_primary_key(prefix: &[u8], key: &[u8]) -> Option<String> {
    let rest = key.strip_prefix(prefix)?.strip_suffix(&[DELIM])?;
    if rest.is_empty() || rest.contains(&DELIM) {
        return None;
    }
    String::from_utf8(rest.to_vec()).ok()
}

/// Recover `(foreign key, id)` from an index key.
pub fn parse_index_key(prefix: &[u8], key: &[u8]) -> Option<(String, String)> {
    let rest = key.strip_prefix(prefix)?.strip_suffix(&[DELIM])?;
    let split = rest.iter().position(|b| *b == DELIM)?;
    let (fk, id) = (&rest[..split], &rest[split + 1..]);
    if fk.is_empty() || id.is_empty() || id.contains(&DELIM) {
        return None;
    }
    Some((
        String::from_utf8(fk.to_vec()).ok()?,
        String::from_utf8(id.to_vec()).ok()?,
    ))
}

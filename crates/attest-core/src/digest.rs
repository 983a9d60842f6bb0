//! # Content Digests
//!
//! SHA-256 digests with an algorithm tag, computed by [`sha256_raw`] or the
//! streaming [`Sha256Accumulator`]. Structured inputs are canonicalized by
//! the caller before being fed in.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The hash algorithm used to compute a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

/// A 32-byte digest and the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a SHA-256 content digest from raw digest bytes.
    pub fn sha256(bytes: [u8; 32]) -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            bytes,
        }
    }

    /// Return the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// True if `s` is a 64-character lowercase hex string.
    pub fn is_hex_sha256(s: &str) -> bool {
        s.len() == 64 && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm.as_str(), self.to_hex())
    }
}

/// SHA-256 over opaque bytes that have no canonical form.
pub fn sha256_raw(data: &[u8]) -> ContentDigest {
    let mut acc = Sha256Accumulator::new();
    acc.update(data);
    acc.finalize()
}

/// Streaming SHA-256 for digests over concatenated segments.
#[derive(Debug, Clone, Default)]
pub struct Sha256Accumulator {
    hasher: Sha256,
}

impl Sha256Accumulator {
    /// Start an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed another segment.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Consume the accumulator and return the digest.
    pub fn finalize(self) -> ContentDigest {
        ContentDigest::sha256(self.hasher.finalize().into())
    }

    /// Consume the accumulator and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        self.finalize().to_hex()
    }
}

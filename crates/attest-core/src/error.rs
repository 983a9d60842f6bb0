//! # Error Hierarchy
//!
//! Leaf error types shared by every crate, built with `thiserror`.
//! Registry-level errors live in `attest-registry` and wrap these.

use thiserror::Error;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for identifier newtypes.
///
/// Each variant carries the rejected input so operators can see exactly
/// what was submitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// DID does not start with `did:` or is too short to carry a method.
    #[error("invalid DID format: \"{0}\" (expected did:<method-specific-id>, longer than 7 characters)")]
    InvalidDid(String),

    /// Principal is not a lowercase `<hrp>1<data>` address.
    #[error("invalid principal address: \"{0}\" (expected <hrp>1<data>, lowercase alphanumeric)")]
    InvalidPrincipal(String),

    /// A record identifier is empty.
    #[error("{kind} must be non-empty")]
    EmptyIdentifier {
        /// Which identifier kind was empty.
        kind: &'static str,
    },

    /// An identifier contains the store key delimiter or whitespace.
    #[error("{kind} \"{value}\" contains a forbidden character (no '/' or whitespace)")]
    ForbiddenCharacter {
        /// Which identifier kind was rejected.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },
}

//! # Identity Newtypes
//!
//! Identifier newtypes for everything the registry stores or references.
//! Each is a distinct type: you cannot pass a [`CircuitId`] where a
//! [`ProofId`] is expected.
//!
//! ## Validation
//!
//! Constructors validate format. Deserialization does not, because persisted
//! records must stay readable even when malformed so the consistency checks
//! can report them; call `check()` on decoded values that arrive from
//! outside the process.
//!
//! Every identifier rejects [`KEY_DELIMITER`] and whitespace. Secondary index
//! keys are `foreignKey/recordId/`, and a delimiter inside either half would
//! let one foreign key's prefix scan pick up another's entries.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Separator used when joining identifiers into composite store keys.
pub const KEY_DELIMITER: char = '/';

fn check_charset(kind: &'static str, s: &str) -> Result<(), ValidationError> {
    if s.contains(KEY_DELIMITER) || s.chars().any(char::is_whitespace) {
        return Err(ValidationError::ForbiddenCharacter {
            kind,
            value: s.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Record identifiers (caller-assigned, validated at construction)
// ---------------------------------------------------------------------------

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, rejecting empty values and forbidden characters.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let id = Self(value.into());
                id.check()?;
                Ok(id)
            }

            /// Re-validate an identifier that bypassed [`Self::new`] (e.g. via serde).
            pub fn check(&self) -> Result<(), ValidationError> {
                if self.0.is_empty() {
                    return Err(ValidationError::EmptyIdentifier { kind: $kind });
                }
                check_charset($kind, &self.0)
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

record_id!(
    /// Caller-assigned identifier of a verifiable credential record.
    CredentialId,
    "credential id"
);

record_id!(
    /// Caller-assigned identifier of a registered verification circuit.
    CircuitId,
    "circuit id"
);

record_id!(
    /// Caller-assigned identifier of a submitted proof.
    ProofId,
    "proof id"
);

// ---------------------------------------------------------------------------
// External references
// ---------------------------------------------------------------------------

/// Decentralized Identifier referencing the external identity registry.
///
/// The registry treats DIDs as opaque keys. Validation is deliberately
/// minimal: the value must start with `did:`, be longer than seven
/// characters, and contain no key delimiter or whitespace. Short forms such
/// as `did:iss1` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Did(String);

impl Did {
    /// Create a DID from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDid`] if the prefix or length is
    /// wrong, or [`ValidationError::ForbiddenCharacter`] for `/` or whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let did = Self(value.into());
        did.check()?;
        Ok(did)
    }

    /// Re-validate a DID that bypassed [`Did::new`].
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.0.len() <= 7 || !self.0.starts_with("did:") {
            return Err(ValidationError::InvalidDid(self.0.clone()));
        }
        check_charset("DID", &self.0)
    }

    /// Access the DID string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An account address that signs messages and controls identities.
///
/// Format is bech32-shaped: `<hrp>1<data>`, split on the last `1`, all
/// lowercase ASCII alphanumeric, with a non-empty human-readable part and at
/// least six data characters. The checksum is not verified; the host
/// ledger authenticates signers before messages reach the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Minimum number of characters after the separator.
    pub const MIN_DATA_LEN: usize = 6;

    /// Create a principal, validating the address shape.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let principal = Self(value.into());
        principal.check()?;
        Ok(principal)
    }

    /// Re-validate a principal that bypassed [`Principal::new`].
    pub fn check(&self) -> Result<(), ValidationError> {
        let s = self.0.as_str();
        let well_formed = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && match s.rfind('1') {
                Some(pos) => pos > 0 && s.len() - pos - 1 >= Self::MIN_DATA_LEN,
                None => false,
            };
        if well_formed {
            Ok(())
        } else {
            Err(ValidationError::InvalidPrincipal(s.to_string()))
        }
    }

    /// The human-readable prefix before the separator.
    pub fn hrp(&self) -> &str {
        match self.0.rfind('1') {
            Some(pos) => &self.0[..pos],
            None => "",
        }
    }

    /// Access the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- DID ----

    #[test]
    fn did_accepts_short_form() {
        assert!(Did::new("did:iss1").is_ok());
        assert!(Did::new("did:attest:abc123").is_ok());
    }

    #[test]
    fn did_rejects_missing_prefix() {
        assert!(matches!(
            Did::new("doc:example:1"),
            Err(ValidationError::InvalidDid(_))
        ));
    }

    #[test]
    fn did_rejects_too_short() {
        assert!(matches!(Did::new("did:abc"), Err(ValidationError::InvalidDid(_))));
        assert!(Did::new("").is_err());
    }

    #[test]
    fn did_rejects_delimiter_and_whitespace() {
        assert!(matches!(
            Did::new("did:web:example.com/path"),
            Err(ValidationError::ForbiddenCharacter { .. })
        ));
        assert!(Did::new("did:key: spaced").is_err());
    }

    #[test]
    fn did_deserialization_skips_validation_but_check_catches_it() {
        let did: Did = serde_json::from_str("\"nope\"").unwrap();
        assert_eq!(did.as_str(), "nope");
        assert!(did.check().is_err());
    }

    // ---- Principal ----

    #[test]
    fn principal_accepts_bech32_shape() {
        let p = Principal::new("attest1qqsyx8f2").unwrap();
        assert_eq!(p.hrp(), "attest");
    }

    #[test]
    fn principal_splits_on_last_separator() {
        let p = Principal::new("a1b1cdefgh").unwrap();
        assert_eq!(p.hrp(), "a1b");
    }

    #[test]
    fn principal_rejects_uppercase_and_short_data() {
        assert!(Principal::new("Attest1qqsyx8f2").is_err());
        assert!(Principal::new("attest1abc").is_err());
        assert!(Principal::new("1abcdefgh").is_err());
        assert!(Principal::new("attestqqsyx8f2").is_err());
    }

    // ---- Record ids ----

    #[test]
    fn record_ids_reject_empty() {
        assert!(matches!(
            CredentialId::new(""),
            Err(ValidationError::EmptyIdentifier { kind: "credential id" })
        ));
        assert!(CircuitId::new("").is_err());
        assert!(ProofId::new("").is_err());
    }

    #[test]
    fn record_ids_reject_delimiter() {
        assert!(matches!(
            ProofId::new("p/1"),
            Err(ValidationError::ForbiddenCharacter { kind: "proof id", .. })
        ));
    }

    #[test]
    fn record_ids_accept_colon_forms() {
        assert_eq!(CredentialId::new("vc:1").unwrap().as_str(), "vc:1");
        assert_eq!(CircuitId::new("c:1").unwrap().to_string(), "c:1");
    }

    #[test]
    fn record_id_serializes_as_plain_string() {
        let id = ProofId::new("proof:sim7").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"proof:sim7\"");
    }
}

//! # Credential Registry
//!
//! Issues and revokes verifiable credentials and maintains the by-issuer and
//! by-subject secondary indexes.
//!
//! ## Lifecycle
//!
//! ```text
//! issue ──▶ ACTIVE ──(issuing principal revokes)──▶ REVOKED (terminal)
//!             │
//!             └── now > expires_at ──▶ reads as EXPIRED (computed, never stored)
//! ```
//!
//! Issuance writes the primary record and both index entries in one batch.
//! Revocation rewrites only the primary record: index entries are never
//! removed, so enumerations cover revoked records and callers filter.
//!
//! ## Pagination
//!
//! `get_by_issuer` / `get_by_subject` filter first and paginate second:
//! `offset` and `limit` apply to the records that survive the
//! `include_revoked` filter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use attest_core::{CredentialId, Did, Principal, Timestamp};
use attest_store::keys::{
    self, CREDENTIAL_BY_ISSUER_PREFIX, CREDENTIAL_BY_SUBJECT_PREFIX, CREDENTIAL_PREFIX,
};
use attest_store::{codec, KvStore, SecondaryIndex, WriteBatch};

use crate::context::ExecContext;
use crate::error::RegistryError;
use crate::events::RegistryEvent;
use crate::identity::IdentityResolver;
use crate::params::{Pagination, RegistryParams};

const BY_ISSUER: SecondaryIndex = SecondaryIndex::new(CREDENTIAL_BY_ISSUER_PREFIX);
const BY_SUBJECT: SecondaryIndex = SecondaryIndex::new(CREDENTIAL_BY_SUBJECT_PREFIX);

/// Read-time status of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    Expired,
    Revoked,
}

/// One issued verifiable credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: CredentialId,
    pub issuer_did: Did,
    pub subject_did: Did,
    /// Schema URI.
    pub credential_schema: String,
    /// Opaque serialized claim payload.
    pub credential_data: String,
    /// Opaque signature or proof over the payload.
    pub proof: String,
    /// Principal that issued the credential; the only one allowed to revoke it.
    pub creator: Principal,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub revoked: bool,
    /// [`Timestamp::ZERO`] unless revoked.
    pub revoked_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

impl CredentialRecord {
    /// Status as observed at `now`. Revocation wins over expiry.
    pub fn status_at(&self, now: Timestamp) -> CredentialStatus {
        if self.revoked {
            CredentialStatus::Revoked
        } else if now > self.expires_at {
            CredentialStatus::Expired
        } else {
            CredentialStatus::Active
        }
    }
}

/// Issue a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgIssueCredential {
    pub creator: Principal,
    pub id: CredentialId,
    pub issuer_did: Did,
    pub subject_did: Did,
    pub credential_schema: String,
    pub credential_data: String,
    pub proof: String,
    pub expires_at: Timestamp,
}

impl MsgIssueCredential {
    /// Stateless shape checks.
    pub fn validate_basic(&self) -> Result<(), RegistryError> {
        self.creator.check()?;
        self.id.check()?;
        self.issuer_did.check()?;
        self.subject_did.check()?;
        for (field, value) in [
            ("credential_schema", &self.credential_schema),
            ("credential_data", &self.credential_data),
            ("proof", &self.proof),
        ] {
            if value.trim().is_empty() {
                return Err(RegistryError::InvalidRequest(format!("{field} must be non-empty")));
            }
        }
        if !self.expires_at.is_set() {
            return Err(RegistryError::InvalidRequest("expires_at must be positive".into()));
        }
        Ok(())
    }
}

/// Revoke a credential the caller issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRevokeCredential {
    pub caller: Principal,
    pub id: CredentialId,
    #[serde(default)]
    pub reason: String,
}

impl MsgRevokeCredential {
    /// Stateless shape checks. The reason is free-form and may be empty.
    pub fn validate_basic(&self) -> Result<(), RegistryError> {
        self.caller.check()?;
        self.id.check()?;
        Ok(())
    }
}

/// Credential store handle bound to an identity resolver.
#[derive(Debug, Clone)]
pub struct CredentialRegistry<S, I> {
    store: S,
    identities: I,
    params: RegistryParams,
}

impl<S: KvStore, I: IdentityResolver> CredentialRegistry<S, I> {
    pub fn new(store: S, identities: I, params: RegistryParams) -> Self {
        Self {
            store,
            identities,
            params,
        }
    }

    pub fn params(&self) -> &RegistryParams {
        &self.params
    }

    /// The resolver this registry consults.
    pub fn identities(&self) -> &I {
        &self.identities
    }

    /// Issue a credential at the context's block time.
    ///
    /// Checks run in a fixed order so a request violating several
    /// preconditions always reports the same one: id uniqueness, issuer,
    /// subject, expiry window, then creator authority.
    pub fn issue(
        &self,
        ctx: &mut ExecContext,
        msg: MsgIssueCredential,
    ) -> Result<CredentialRecord, RegistryError> {
        msg.validate_basic()?;
        let now = ctx.now()?;

        if self.exists(&msg.id)? {
            return Err(RegistryError::CredentialExists(msg.id));
        }

        let issuer = match self.identities.resolve(&msg.issuer_did)? {
            Some(identity) if identity.active => identity,
            _ => return Err(RegistryError::UnknownOrInactiveIssuer(msg.issuer_did)),
        };
        if self.identities.resolve(&msg.subject_did)?.is_none() {
            return Err(RegistryError::UnknownSubject(msg.subject_did));
        }

        self.check_expiry(now, msg.expires_at)?;

        if issuer.controller != msg.creator {
            return Err(RegistryError::unauthorized(
                &msg.creator,
                format!("issue credentials for {}", msg.issuer_did),
            ));
        }

        let record = CredentialRecord {
            id: msg.id,
            issuer_did: msg.issuer_did,
            subject_did: msg.subject_did,
            credential_schema: msg.credential_schema,
            credential_data: msg.credential_data,
            proof: msg.proof,
            creator: msg.creator,
            issued_at: now,
            expires_at: msg.expires_at,
            revoked: false,
            revoked_at: Timestamp::ZERO,
            revocation_reason: None,
        };

        let id = record.id.as_str();
        let mut batch = WriteBatch::new();
        batch.put(keys::primary_key(CREDENTIAL_PREFIX, id), codec::encode(&record)?);
        BY_ISSUER.stage_append(&self.store, &mut batch, record.issuer_did.as_str(), id)?;
        BY_SUBJECT.stage_append(&self.store, &mut batch, record.subject_did.as_str(), id)?;
        self.store.write(batch)?;

        tracing::info!(
            credential_id = %record.id,
            issuer = %record.issuer_did,
            subject = %record.subject_did,
            expires_at = %record.expires_at,
            "credential issued"
        );
        ctx.emit(RegistryEvent::CredentialIssued {
            creator: record.creator.clone(),
            id: record.id.clone(),
            issuer_did: record.issuer_did.clone(),
            subject_did: record.subject_did.clone(),
        });
        Ok(record)
    }

    /// Revoke a credential at the context's block time.
    ///
    /// Expired credentials may still be revoked.
    pub fn revoke(
        &self,
        ctx: &mut ExecContext,
        msg: MsgRevokeCredential,
    ) -> Result<CredentialRecord, RegistryError> {
        msg.validate_basic()?;
        let mut record = self
            .get(&msg.id)?
            .ok_or_else(|| RegistryError::CredentialNotFound(msg.id.clone()))?;
        if record.creator != msg.caller {
            return Err(RegistryError::unauthorized(
                &msg.caller,
                format!("revoke credential {}", msg.id),
            ));
        }
        if record.revoked {
            return Err(RegistryError::AlreadyRevoked(msg.id));
        }
        let now = ctx.now()?;
        if now < record.issued_at {
            return Err(RegistryError::InvalidBlockTime(format!(
                "block time {now} precedes issuance of {} at {}",
                record.id, record.issued_at
            )));
        }

        record.revoked = true;
        record.revoked_at = now;
        record.revocation_reason = Some(msg.reason.clone());

        let mut batch = WriteBatch::new();
        batch.put(
            keys::primary_key(CREDENTIAL_PREFIX, record.id.as_str()),
            codec::encode(&record)?,
        );
        self.store.write(batch)?;

        tracing::info!(credential_id = %record.id, caller = %msg.caller, "credential revoked");
        ctx.emit(RegistryEvent::CredentialRevoked {
            caller: msg.caller,
            id: record.id.clone(),
            reason: msg.reason,
        });
        Ok(record)
    }

    pub fn get(&self, id: &CredentialId) -> Result<Option<CredentialRecord>, RegistryError> {
        let key = keys::primary_key(CREDENTIAL_PREFIX, id.as_str());
        match self.store.get(&key)? {
            Some(bytes) => Ok(Some(codec::decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, id: &CredentialId) -> Result<bool, RegistryError> {
        Ok(self.store.has(&keys::primary_key(CREDENTIAL_PREFIX, id.as_str()))?)
    }

    /// Every credential, ordered by id.
    pub fn list_all(&self) -> Result<Vec<CredentialRecord>, RegistryError> {
        self.store
            .scan_prefix(CREDENTIAL_PREFIX)?
            .into_iter()
            .map(|(k, v)| Ok(codec::decode(&k, &v)?))
            .collect()
    }

    /// Credentials issued by `issuer`, in issuance order.
    pub fn get_by_issuer(
        &self,
        issuer: &Did,
        include_revoked: bool,
        page: Pagination,
    ) -> Result<Vec<CredentialRecord>, RegistryError> {
        self.page_through(BY_ISSUER, issuer, include_revoked, page)
    }

    /// Credentials about `subject`, in issuance order.
    pub fn get_by_subject(
        &self,
        subject: &Did,
        include_revoked: bool,
        page: Pagination,
    ) -> Result<Vec<CredentialRecord>, RegistryError> {
        self.page_through(BY_SUBJECT, subject, include_revoked, page)
    }

    /// Raw by-issuer index: issuer DID to credential ids in insertion order.
    pub fn issuer_index(&self) -> Result<BTreeMap<String, Vec<String>>, RegistryError> {
        index_map(&self.store, BY_ISSUER)
    }

    /// Raw by-subject index: subject DID to credential ids in insertion order.
    pub fn subject_index(&self) -> Result<BTreeMap<String, Vec<String>>, RegistryError> {
        index_map(&self.store, BY_SUBJECT)
    }

    fn check_expiry(&self, now: Timestamp, expires_at: Timestamp) -> Result<(), RegistryError> {
        if expires_at <= now {
            return Err(RegistryError::InvalidExpiry {
                expires_at,
                reason: format!("must be after issuance time {now}"),
            });
        }
        // Overflow means the window reaches past the end of time.
        let limit = now
            .checked_add_secs(self.params.max_validity_secs)
            .unwrap_or(Timestamp::from_epoch_secs(i64::MAX));
        if expires_at > limit {
            return Err(RegistryError::InvalidExpiry {
                expires_at,
                reason: format!(
                    "exceeds maximum validity of {}s from {now}",
                    self.params.max_validity_secs
                ),
            });
        }
        Ok(())
    }

    fn page_through(
        &self,
        index: SecondaryIndex,
        foreign_key: &Did,
        include_revoked: bool,
        page: Pagination,
    ) -> Result<Vec<CredentialRecord>, RegistryError> {
        let limit = self.params.page_limit(page.limit);
        let mut out = Vec::new();
        let mut skipped = 0usize;
        for raw_id in index.record_ids(&self.store, foreign_key.as_str())? {
            if out.len() == limit {
                break;
            }
            let Some(record) = self.hydrate(&raw_id)? else {
                continue;
            };
            if record.revoked && !include_revoked {
                continue;
            }
            if skipped < page.offset {
                skipped += 1;
                continue;
            }
            out.push(record);
        }
        Ok(out)
    }

    /// Load the primary record an index entry points at. Dangling entries are
    /// logged and skipped so the consistency checks can report them.
    fn hydrate(&self, raw_id: &str) -> Result<Option<CredentialRecord>, RegistryError> {
        let key = keys::primary_key(CREDENTIAL_PREFIX, raw_id);
        match self.store.get(&key)? {
            Some(bytes) => Ok(Some(codec::decode(&key, &bytes)?)),
            None => {
                tracing::warn!(credential_id = %raw_id, "index entry has no primary record");
                Ok(None)
            }
        }
    }
}

pub(crate) fn index_map<S: KvStore>(
    store: &S,
    index: SecondaryIndex,
) -> Result<BTreeMap<String, Vec<String>>, RegistryError> {
    let mut grouped: BTreeMap<String, Vec<(u64, String)>> = BTreeMap::new();
    for (fk, id, entry) in index.scan_all(store)? {
        grouped.entry(fk).or_default().push((entry.sequence, id));
    }
    Ok(grouped
        .into_iter()
        .map(|(fk, mut ids)| {
            ids.sort();
            (fk, ids.into_iter().map(|(_, id)| id).collect())
        })
        .collect())
}

/// Stage a from-scratch rebuild of both credential indexes over `records`.
///
/// Every existing entry is deleted. Records are re-appended by issuance
/// time, then by their previous insertion sequence, then by id. The caller
/// must stage the reset of the sequence counter first.
pub(crate) fn stage_index_rebuild<S: KvStore>(
    store: &S,
    batch: &mut WriteBatch,
    records: &[CredentialRecord],
) -> Result<(), RegistryError> {
    let mut prior = BY_ISSUER.stage_clear(store, batch)?;
    for (id, seq) in BY_SUBJECT.stage_clear(store, batch)? {
        prior
            .entry(id)
            .and_modify(|s| *s = (*s).min(seq))
            .or_insert(seq);
    }
    let position = |r: &CredentialRecord| prior.get(r.id.as_str()).copied().unwrap_or(u64::MAX);
    let mut ordered: Vec<&CredentialRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        (a.issued_at, position(a), a.id.as_str()).cmp(&(b.issued_at, position(b), b.id.as_str()))
    });
    for record in ordered {
        let id = record.id.as_str();
        BY_ISSUER.stage_append(store, batch, record.issuer_did.as_str(), id)?;
        BY_SUBJECT.stage_append(store, batch, record.subject_did.as_str(), id)?;
    }
    Ok(())
}

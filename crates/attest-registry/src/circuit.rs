//! # Circuit Registry
//!
//! Owns circuit metadata: verification key, content-addressed code hash,
//! creator, and the active flag.
//!
//! ## Lifecycle
//!
//! ```text
//! register ──▶ ACTIVE ──(creator deactivates)──▶ INACTIVE (terminal)
//! ```
//!
//! Records are never deleted or reactivated. The code hash is always
//! computed here from the submitted bytecode; a caller-supplied hash is
//! never accepted.

use serde::{Deserialize, Serialize};

use attest_core::{sha256_raw, CircuitId, Principal, Timestamp};
use attest_store::keys::{self, CIRCUIT_PREFIX};
use attest_store::{codec, KvStore, WriteBatch};

use crate::context::ExecContext;
use crate::error::RegistryError;
use crate::events::RegistryEvent;
use crate::hex_bytes;

/// One registered verification circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub id: CircuitId,
    pub name: String,
    pub description: String,
    /// Lowercase hex SHA-256 of the verifier bytecode.
    pub code_hash: String,
    #[serde(with = "hex_bytes")]
    pub verification_key: Vec<u8>,
    pub creator: Principal,
    pub active: bool,
    pub created_at: Timestamp,
}

/// Register a new circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRegisterCircuit {
    pub creator: Principal,
    pub id: CircuitId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "hex_bytes")]
    pub verifier_bytecode: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub verification_key: Vec<u8>,
}

impl MsgRegisterCircuit {
    /// Stateless shape checks.
    pub fn validate_basic(&self) -> Result<(), RegistryError> {
        self.creator.check()?;
        self.id.check()?;
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidRequest("circuit name must be non-empty".into()));
        }
        if self.verifier_bytecode.is_empty() {
            return Err(RegistryError::InvalidRequest("verifier bytecode must be non-empty".into()));
        }
        if self.verification_key.is_empty() {
            return Err(RegistryError::InvalidRequest("verification key must be non-empty".into()));
        }
        Ok(())
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCircuitResponse {
    pub circuit_id: CircuitId,
    pub code_hash: String,
}

/// Deactivate a circuit the caller created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDeactivateCircuit {
    pub caller: Principal,
    pub id: CircuitId,
}

impl MsgDeactivateCircuit {
    /// Stateless shape checks.
    pub fn validate_basic(&self) -> Result<(), RegistryError> {
        self.caller.check()?;
        self.id.check()?;
        Ok(())
    }
}

/// Deterministic code hash: lowercase hex SHA-256 over the raw bytecode.
pub fn compute_code_hash(verifier_bytecode: &[u8]) -> String {
    sha256_raw(verifier_bytecode).to_hex()
}

/// Circuit store handle.
#[derive(Debug, Clone)]
pub struct CircuitRegistry<S> {
    store: S,
}

impl<S: KvStore> CircuitRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist a new active circuit.
    pub fn register(
        &self,
        ctx: &mut ExecContext,
        msg: MsgRegisterCircuit,
    ) -> Result<RegisterCircuitResponse, RegistryError> {
        msg.validate_basic()?;
        let now = ctx.now()?;
        if self.exists(&msg.id)? {
            return Err(RegistryError::CircuitExists(msg.id));
        }

        let code_hash = compute_code_hash(&msg.verifier_bytecode);
        let record = CircuitRecord {
            id: msg.id,
            name: msg.name,
            description: msg.description,
            code_hash: code_hash.clone(),
            verification_key: msg.verification_key,
            creator: msg.creator,
            active: true,
            created_at: now,
        };
        self.write(&record)?;

        tracing::info!(circuit_id = %record.id, creator = %record.creator, code_hash = %code_hash, "circuit registered");
        ctx.emit(RegistryEvent::CircuitRegistered {
            creator: record.creator.clone(),
            id: record.id.clone(),
            name: record.name.clone(),
            code_hash: code_hash.clone(),
        });
        Ok(RegisterCircuitResponse {
            circuit_id: record.id,
            code_hash,
        })
    }

    /// Flip `active` to false. Only the creator may do this, and only once.
    pub fn deactivate(
        &self,
        ctx: &mut ExecContext,
        msg: MsgDeactivateCircuit,
    ) -> Result<CircuitRecord, RegistryError> {
        msg.validate_basic()?;
        let mut record = self
            .get(&msg.id)?
            .ok_or_else(|| RegistryError::CircuitNotFound(msg.id.clone()))?;
        if record.creator != msg.caller {
            return Err(RegistryError::unauthorized(
                &msg.caller,
                format!("deactivate circuit {}", msg.id),
            ));
        }
        if !record.active {
            return Err(RegistryError::AlreadyDeactivated(msg.id));
        }

        record.active = false;
        self.write(&record)?;

        tracing::info!(circuit_id = %record.id, caller = %msg.caller, "circuit deactivated");
        ctx.emit(RegistryEvent::CircuitDeactivated {
            caller: msg.caller,
            id: record.id.clone(),
        });
        Ok(record)
    }

    pub fn get(&self, id: &CircuitId) -> Result<Option<CircuitRecord>, RegistryError> {
        let key = keys::primary_key(CIRCUIT_PREFIX, id.as_str());
        match self.store.get(&key)? {
            Some(bytes) => Ok(Some(codec::decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, id: &CircuitId) -> Result<bool, RegistryError> {
        Ok(self.store.has(&keys::primary_key(CIRCUIT_PREFIX, id.as_str()))?)
    }

    /// Every circuit, ordered by id.
    pub fn list(&self) -> Result<Vec<CircuitRecord>, RegistryError> {
        self.store
            .scan_prefix(CIRCUIT_PREFIX)?
            .into_iter()
            .map(|(k, v)| Ok(codec::decode(&k, &v)?))
            .collect()
    }

    pub fn list_active(&self) -> Result<Vec<CircuitRecord>, RegistryError> {
        Ok(self.list()?.into_iter().filter(|c| c.active).collect())
    }

    fn write(&self, record: &CircuitRecord) -> Result<(), RegistryError> {
        let mut batch = WriteBatch::new();
        batch.put(
            keys::primary_key(CIRCUIT_PREFIX, record.id.as_str()),
            codec::encode(record)?,
        );
        self.store.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_store::MemoryStore;

    fn principal(s: &str) -> Principal {
        Principal::new(s).unwrap()
    }

    fn cid(s: &str) -> CircuitId {
        CircuitId::new(s).unwrap()
    }

    fn make_registry() -> CircuitRegistry<MemoryStore> {
        CircuitRegistry::new(MemoryStore::new())
    }

    fn make_msg(id: &str, bytecode: &[u8]) -> MsgRegisterCircuit {
        MsgRegisterCircuit {
            creator: principal("attest1creator"),
            id: cid(id),
            name: "age-over-18".to_string(),
            description: "proves age without revealing birthdate".to_string(),
            verifier_bytecode: bytecode.to_vec(),
            verification_key: b"vk-age".to_vec(),
        }
    }

    #[test]
    fn register_persists_active_record() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        let resp = reg.register(&mut ctx, make_msg("c:1", b"\0asm-bytes")).unwrap();
        assert_eq!(resp.circuit_id, cid("c:1"));
        assert_eq!(resp.code_hash, compute_code_hash(b"\0asm-bytes"));

        let rec = reg.get(&cid("c:1")).unwrap().unwrap();
        assert!(rec.active);
        assert_eq!(rec.created_at, Timestamp::from_epoch_secs(1000));
        assert_eq!(rec.creator, principal("attest1creator"));
        assert!(reg.exists(&cid("c:1")).unwrap());
        assert_eq!(ctx.events().len(), 1);
        assert_eq!(ctx.events()[0].kind(), "circuit_registered");
    }

    #[test]
    fn code_hash_is_pure_function_of_bytecode() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        let a = reg.register(&mut ctx, make_msg("c:1", b"same")).unwrap();
        let b = reg.register(&mut ctx, make_msg("c:2", b"same")).unwrap();
        let c = reg.register(&mut ctx, make_msg("c:3", b"different")).unwrap();
        assert_eq!(a.code_hash, b.code_hash);
        assert_ne!(a.code_hash, c.code_hash);
    }

    #[test]
    fn duplicate_id_rejected_and_original_untouched() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        reg.register(&mut ctx, make_msg("c:1", b"first")).unwrap();
        let err = reg.register(&mut ctx, make_msg("c:1", b"second")).unwrap_err();
        assert!(matches!(err, RegistryError::CircuitExists(_)));
        let rec = reg.get(&cid("c:1")).unwrap().unwrap();
        assert_eq!(rec.code_hash, compute_code_hash(b"first"));
        assert_eq!(ctx.events().len(), 1);
    }

    #[test]
    fn register_rejects_empty_fields() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        let mut msg = make_msg("c:1", b"code");
        msg.verification_key.clear();
        assert!(matches!(
            reg.register(&mut ctx, msg),
            Err(RegistryError::InvalidRequest(_))
        ));
        let msg = make_msg("c:1", b"");
        assert!(matches!(
            reg.register(&mut ctx, msg),
            Err(RegistryError::InvalidRequest(_))
        ));
        assert!(reg.list().unwrap().is_empty());
    }

    // ---- deactivation ----

    #[test]
    fn creator_deactivates_once() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        reg.register(&mut ctx, make_msg("c:1", b"code")).unwrap();

        let msg = MsgDeactivateCircuit {
            caller: principal("attest1creator"),
            id: cid("c:1"),
        };
        let rec = reg.deactivate(&mut ctx, msg.clone()).unwrap();
        assert!(!rec.active);
        assert!(!reg.get(&cid("c:1")).unwrap().unwrap().active);
        assert!(matches!(
            reg.deactivate(&mut ctx, msg),
            Err(RegistryError::AlreadyDeactivated(_))
        ));
    }

    #[test]
    fn deactivation_preserves_other_fields() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        reg.register(&mut ctx, make_msg("c:1", b"code")).unwrap();
        let before = reg.get(&cid("c:1")).unwrap().unwrap();
        ctx.advance(50);
        let after = reg
            .deactivate(
                &mut ctx,
                MsgDeactivateCircuit {
                    caller: principal("attest1creator"),
                    id: cid("c:1"),
                },
            )
            .unwrap();
        assert_eq!(CircuitRecord { active: true, ..after }, before);
    }

    #[test]
    fn non_creator_cannot_deactivate() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        reg.register(&mut ctx, make_msg("c:1", b"code")).unwrap();
        let err = reg
            .deactivate(
                &mut ctx,
                MsgDeactivateCircuit {
                    caller: principal("attest1mallory"),
                    id: cid("c:1"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { .. }));
        assert!(reg.get(&cid("c:1")).unwrap().unwrap().active);
    }

    #[test]
    fn deactivate_missing_circuit() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        let err = reg
            .deactivate(
                &mut ctx,
                MsgDeactivateCircuit {
                    caller: principal("attest1creator"),
                    id: cid("c:404"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::CircuitNotFound(_)));
    }

    #[test]
    fn list_and_list_active() {
        let reg = make_registry();
        let mut ctx = ExecContext::at(1000);
        reg.register(&mut ctx, make_msg("c:2", b"b")).unwrap();
        reg.register(&mut ctx, make_msg("c:1", b"a")).unwrap();
        reg.deactivate(
            &mut ctx,
            MsgDeactivateCircuit {
                caller: principal("attest1creator"),
                id: cid("c:2"),
            },
        )
        .unwrap();
        let all: Vec<_> = reg.list().unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(all, vec![cid("c:1"), cid("c:2")]);
        let active: Vec<_> = reg.list_active().unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(active, vec![cid("c:1")]);
    }

    #[test]
    fn store_failure_surfaces_as_internal() {
        let store = MemoryStore::new();
        let reg = CircuitRegistry::new(store.clone());
        store.set_reject_writes(true);
        let mut ctx = ExecContext::at(1000);
        let err = reg.register(&mut ctx, make_msg("c:1", b"code")).unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Internal);
        assert!(ctx.events().is_empty());
        assert!(store.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use attest_store::MemoryStore;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn code_hash_depends_only_on_bytecode(
            bytecode in proptest::collection::vec(any::<u8>(), 1..256),
            vk_a in proptest::collection::vec(any::<u8>(), 1..32),
            vk_b in proptest::collection::vec(any::<u8>(), 1..32),
        ) {
            let reg = CircuitRegistry::new(MemoryStore::new());
            let mut ctx = ExecContext::at(1000);
            let msg = |id: &str, vk: Vec<u8>| MsgRegisterCircuit {
                creator: Principal::new("attest1creator").unwrap(),
                id: CircuitId::new(id).unwrap(),
                name: "prop".to_string(),
                description: String::new(),
                verifier_bytecode: bytecode.clone(),
                verification_key: vk,
            };
            let a = reg.register(&mut ctx, msg("c:a", vk_a)).unwrap();
            let b = reg.register(&mut ctx, msg("c:b", vk_b)).unwrap();
            prop_assert_eq!(&a.code_hash, &b.code_hash);
            prop_assert_eq!(a.code_hash, compute_code_hash(&bytecode));
        }
    }
}

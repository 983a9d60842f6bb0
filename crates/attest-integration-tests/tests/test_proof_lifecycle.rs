//! # Proof Lifecycle
//!
//! Register circuits, submit proofs under the mock and Ed25519 backends,
//! deactivate, and confirm failed checks persist nothing.

use attest_core::{CircuitId, Principal, ProofId, Timestamp};
use attest_registry::{
    compute_code_hash, ErrorClass, ErrorKind, ExecContext, MemoryIdentityRegistry, MsgDeactivateCircuit,
    MsgRegisterCircuit, MsgServer, MsgSubmitProof, RegistryParams,
};
use attest_simulation::{InvariantRegistry, StateSnapshot};
use attest_store::MemoryStore;
use attest_zkp::ed25519::SigningKey;
use attest_zkp::{from_fn, Ed25519Verifier, MockVerifier, ProofVerifier};

fn principal(s: &str) -> Principal {
    Principal::new(s).unwrap()
}

fn cid(s: &str) -> CircuitId {
    CircuitId::new(s).unwrap()
}

fn pid(s: &str) -> ProofId {
    ProofId::new(s).unwrap()
}

fn server<V: ProofVerifier>(verifier: V) -> MsgServer<MemoryStore, MemoryIdentityRegistry, V> {
    MsgServer::new(
        MemoryStore::new(),
        MemoryIdentityRegistry::new(),
        verifier,
        RegistryParams::default(),
    )
}

fn register(id: &str, bytecode: &[u8], vk: &[u8]) -> MsgRegisterCircuit {
    MsgRegisterCircuit {
        creator: principal("attest1creator"),
        id: cid(id),
        name: "age-over-18".to_string(),
        description: "proves age without revealing it".to_string(),
        verifier_bytecode: bytecode.to_vec(),
        verification_key: vk.to_vec(),
    }
}

fn submit(id: &str, circuit: &str, inputs: &[&str], proof: Vec<u8>) -> MsgSubmitProof {
    MsgSubmitProof {
        submitter: principal("attest1submit"),
        id: pid(id),
        circuit_id: cid(circuit),
        public_inputs: inputs.iter().map(|s| s.to_string()).collect(),
        proof_data: proof,
    }
}

fn assert_consistent<V: ProofVerifier>(server: &MsgServer<MemoryStore, MemoryIdentityRegistry, V>, now: i64) {
    let snap = StateSnapshot::capture(server, Timestamp::from_epoch_secs(now)).unwrap();
    if let Err(broken) = InvariantRegistry::default().assert_all(&snap) {
        panic!("{broken}");
    }
}

#[test]
fn verify_then_deactivate_scenario() {
    let server = server(from_fn(|_, _, _| Ok(true)));
    let mut ctx = ExecContext::at(1000);

    let resp = server.register_circuit(&mut ctx, register("c:1", b"B", b"vk")).unwrap();
    assert_eq!(resp.code_hash, compute_code_hash(b"B"));

    ctx.advance(10);
    let submitted = server
        .submit_proof(&mut ctx, submit("p:1", "c:1", &["1"], vec![1, 2, 3]))
        .unwrap();
    assert!(submitted.verified);
    assert!(server.proofs().get(&pid("p:1")).unwrap().unwrap().verified);
    let listed: Vec<_> = server
        .proofs()
        .list_by_circuit(&cid("c:1"))
        .unwrap()
        .into_iter()
        .map(|p| p.id.to_string())
        .collect();
    assert_eq!(listed, vec!["p:1"]);

    server
        .deactivate_circuit(
            &mut ctx,
            MsgDeactivateCircuit {
                caller: principal("attest1creator"),
                id: cid("c:1"),
            },
        )
        .unwrap();
    let err = server
        .submit_proof(&mut ctx, submit("p:2", "c:1", &["1"], vec![1, 2, 3]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircuitDeactivated);
    assert!(server.proofs().get(&pid("p:2")).unwrap().is_none());

    // p:1 was verified while c:1 was active; only a warning now.
    assert_consistent(&server, 1010);
}

#[test]
fn deactivated_circuit_rejected_before_verifier_runs() {
    let server = server(from_fn(|_, _, _| panic!("verifier must not be called")));
    let mut ctx = ExecContext::at(1000);
    server.register_circuit(&mut ctx, register("c:1", b"B", b"vk")).unwrap();
    server
        .deactivate_circuit(
            &mut ctx,
            MsgDeactivateCircuit {
                caller: principal("attest1creator"),
                id: cid("c:1"),
            },
        )
        .unwrap();
    let err = server
        .submit_proof(&mut ctx, submit("p:1", "c:1", &["1"], vec![0]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircuitDeactivated);
}

#[test]
fn mock_backend_three_outcomes() {
    let server = server(MockVerifier);
    let mut ctx = ExecContext::at(1000);
    server.register_circuit(&mut ctx, register("c:1", b"B", b"vk-1")).unwrap();
    let inputs = ["42", "7"];
    let owned: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();

    let good = MockVerifier.prove(b"vk-1", &owned).unwrap();
    let valid = server.submit_proof(&mut ctx, submit("p:ok", "c:1", &inputs, good)).unwrap();
    assert!(valid.verified);
    assert_eq!(valid.record.verified_at, Timestamp::from_epoch_secs(1000));

    let invalid = server
        .submit_proof(&mut ctx, submit("p:bad", "c:1", &inputs, vec![0u8; 32]))
        .unwrap();
    assert!(!invalid.verified);
    assert_eq!(invalid.record.verified_at, Timestamp::ZERO);

    let err = server
        .submit_proof(&mut ctx, submit("p:short", "c:1", &inputs, vec![0u8; 5]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VerificationError);
    assert_eq!(err.class(), ErrorClass::ExternalDependency);
    assert!(!server.proofs().exists(&pid("p:short")).unwrap());

    // Failed verifications are retained for audit.
    let listed = server.proofs().list_by_circuit(&cid("c:1")).unwrap();
    assert_eq!(listed.len(), 2);
    assert_consistent(&server, 1000);
}

#[test]
fn ed25519_backend_end_to_end() {
    let key = SigningKey::from_bytes(&[7u8; 32]);
    let vk = key.verifying_key().to_bytes();
    let server = server(Ed25519Verifier);
    let mut ctx = ExecContext::at(1000);
    server.register_circuit(&mut ctx, register("c:sig", b"ed25519", &vk)).unwrap();

    let inputs = vec!["over-18".to_string()];
    let sig = Ed25519Verifier.sign(&key, &inputs).unwrap();
    let ok = server.submit_proof(&mut ctx, submit("p:1", "c:sig", &["over-18"], sig.clone())).unwrap();
    assert!(ok.verified);

    // Same signature, different statement.
    let other = server.submit_proof(&mut ctx, submit("p:2", "c:sig", &["over-21"], sig)).unwrap();
    assert!(!other.verified);

    // A circuit whose key is not an Ed25519 key cannot be checked.
    server.register_circuit(&mut ctx, register("c:junk", b"ed25519", b"short")).unwrap();
    let err = server
        .submit_proof(&mut ctx, submit("p:3", "c:junk", &["x"], vec![0u8; 64]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VerificationError);
    assert_consistent(&server, 1000);
}

#[test]
fn proof_copies_key_and_reference_from_circuit() {
    let server = server(MockVerifier);
    let mut ctx = ExecContext::at(1000);
    server.register_circuit(&mut ctx, register("c:1", b"program", b"vk")).unwrap();
    let rec = server
        .submit_proof(&mut ctx, submit("p:1", "c:1", &["1"], vec![9u8; 32]))
        .unwrap()
        .record;
    assert_eq!(rec.verification_key, b"vk".to_vec());
    assert_eq!(rec.verifier_reference, compute_code_hash(b"program"));
}

#[test]
fn duplicate_ids_rejected() {
    let server = server(MockVerifier);
    let mut ctx = ExecContext::at(1000);
    server.register_circuit(&mut ctx, register("c:1", b"B", b"vk")).unwrap();
    let err = server.register_circuit(&mut ctx, register("c:1", b"C", b"vk")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircuitExists);

    server
        .submit_proof(&mut ctx, submit("p:1", "c:1", &["1"], vec![0u8; 32]))
        .unwrap();
    let err = server
        .submit_proof(&mut ctx, submit("p:1", "c:1", &["1"], vec![0u8; 32]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProofExists);
}

#[test]
fn only_creator_deactivates_once() {
    let server = server(MockVerifier);
    let mut ctx = ExecContext::at(1000);
    server.register_circuit(&mut ctx, register("c:1", b"B", b"vk")).unwrap();
    let deactivate = |caller: &str| MsgDeactivateCircuit {
        caller: principal(caller),
        id: cid("c:1"),
    };
    let err = server.deactivate_circuit(&mut ctx, deactivate("attest1mallory")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    server.deactivate_circuit(&mut ctx, deactivate("attest1creator")).unwrap();
    let err = server.deactivate_circuit(&mut ctx, deactivate("attest1creator")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyDeactivated);
    assert!(server.circuits().list_active().unwrap().is_empty());
}

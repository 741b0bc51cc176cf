//! End-to-end tests over the full facade: sessions run through their
//! complete lifecycle against a real ledger backend, and the reputation
//! effects are checked against the protocol's worked examples.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use trustmesh_core::{
    Ed25519Signer, ForkType, MemoryLedger, OutcomeDecision, Party, SessionState, SledLedger,
    TrustMesh, TrustMeshConfig, TrustPolicy, WitnessAttestation, WitnessClient,
};

fn test_mesh(ledger: Arc<dyn trustmesh_core::LedgerClient>) -> TrustMesh {
    let mut config = TrustMeshConfig::default();
    config.retry.base_backoff_ms = 1;
    config.selection.seed = Some(7);
    config.solicitation.deadline_ms = 200;
    TrustMesh::new(config, ledger)
}

/// Runs one session through the bilateral happy path and publishes it.
async fn run_session(
    mesh: &mut TrustMesh,
    provider: &str,
    requester: &str,
    ratings: (f64, f64),
    weight: f64,
) -> trustmesh_core::SessionRecord {
    let mut session = mesh
        .create_session("token", "h", provider, requester, "task", Utc::now())
        .await
        .unwrap();
    mesh.start_work(&mut session, Utc::now()).unwrap();
    mesh.complete_work(&mut session, Utc::now()).unwrap();
    let decision = mesh
        .record_outcome(&mut session, ratings.0, ratings.1, Utc::now())
        .unwrap();
    assert!(matches!(decision, OutcomeDecision::Agreed { .. }));
    mesh.sign_session(&mut session, Party::Provider, &Ed25519Signer::generate())
        .unwrap();
    mesh.sign_session(&mut session, Party::Requester, &Ed25519Signer::generate())
        .unwrap();
    mesh.publish_session(&mut session, weight, Utc::now())
        .await
        .unwrap();
    session
}

#[tokio::test]
async fn golden_update_sequence_through_facade() {
    let mut mesh = test_mesh(Arc::new(MemoryLedger::new()));
    mesh.register_agent("provider", Utc::now()).await.unwrap();
    mesh.register_agent("requester", Utc::now()).await.unwrap();

    // Success at weight 1: (2,2) -> (3,2), score 0.60.
    run_session(&mut mesh, "provider", "requester", (1.0, 1.0), 1.0).await;
    let record = mesh.query_reputation("provider").await.unwrap();
    assert_eq!((record.alpha, record.beta), (3.0, 2.0));
    assert!((record.score() - 0.60).abs() < 1e-9);

    // Failure at effective weight 1: (3,2) -> (3,3), score 0.50.
    run_session(&mut mesh, "provider", "requester", (0.0, 0.0), 1.0).await;
    let record = mesh.query_reputation("provider").await.unwrap();
    assert_eq!((record.alpha, record.beta), (3.0, 3.0));
    assert!((record.score() - 0.50).abs() < 1e-9);

    run_session(&mut mesh, "provider", "requester", (1.0, 1.0), 3.0).await;
    let record = mesh.query_reputation("provider").await.unwrap();
    assert_eq!((record.alpha, record.beta), (6.0, 3.0));
    assert!((record.score() - 2.0 / 3.0).abs() < 1e-9);

    // Each publish archived the prior version.
    assert_eq!(mesh.store().history("provider").await.unwrap().len(), 3);
}

#[tokio::test]
async fn trust_gate_opens_as_evidence_accumulates() {
    let mut mesh = test_mesh(Arc::new(MemoryLedger::new()));
    mesh.register_agent("provider", Utc::now()).await.unwrap();
    mesh.register_agent("requester", Utc::now()).await.unwrap();

    let policy = TrustPolicy {
        min_score: 0.7,
        min_confidence: 10.0,
    };
    assert!(!mesh.evaluate_trust("provider", &policy).await.unwrap().accept);

    for _ in 0..7 {
        run_session(&mut mesh, "provider", "requester", (1.0, 1.0), 1.0).await;
    }
    // (9, 2): score ~0.818, n_eff 11.
    let decision = mesh.evaluate_trust("provider", &policy).await.unwrap();
    assert!(decision.accept, "rejected: {}", decision.reason());
}

struct ScriptedWitnesses;

#[async_trait]
impl WitnessClient for ScriptedWitnesses {
    async fn request_rating(
        &self,
        witness_id: &str,
        _session_id: &str,
    ) -> Option<WitnessAttestation> {
        // One careless witness among honest ones; consensus must hold.
        let rating = match witness_id {
            "w0" => 0.30,
            _ => 0.85,
        };
        Some(WitnessAttestation::new(witness_id, rating, Utc::now()))
    }
}

#[tokio::test]
async fn disputed_session_resolved_by_witness_review() {
    let mut mesh = test_mesh(Arc::new(MemoryLedger::new()));
    mesh.register_agent("provider", Utc::now()).await.unwrap();
    mesh.register_agent("requester", Utc::now()).await.unwrap();

    // An established bystander pool that clears witness eligibility.
    for i in 0..5 {
        let id = format!("w{i}");
        mesh.register_agent(&id, Utc::now()).await.unwrap();
        for _ in 0..60 {
            let session_id = format!("warmup-{id}-{}", uuid_like());
            mesh.store()
                .update_with(&id, Utc::now(), |record| {
                    trustmesh_reputation::update(
                        record,
                        1.0,
                        trustmesh_core::EvidenceWeight::plain(1.0),
                        &session_id,
                        Utc::now(),
                    )?;
                    Ok(())
                })
                .await
                .unwrap();
        }
    }

    let mut session = mesh
        .create_session("token", "h", "provider", "requester", "task", Utc::now())
        .await
        .unwrap();
    mesh.start_work(&mut session, Utc::now()).unwrap();
    mesh.complete_work(&mut session, Utc::now()).unwrap();
    let decision = mesh
        .record_outcome(&mut session, 0.95, 0.30, Utc::now())
        .unwrap();
    assert!(matches!(decision, OutcomeDecision::Disputed { .. }));

    mesh.resolve_by_witness_review(&mut session, Arc::new(ScriptedWitnesses), Utc::now())
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Resolved);
    assert_eq!(session.witnesses.len(), 3);
    let consensus = session.outcome.agreed_outcome.unwrap();
    assert!((0.3..=0.85).contains(&consensus));
    assert!(session.outcome.consensus_achieved);

    mesh.sign_session(&mut session, Party::Provider, &Ed25519Signer::generate())
        .unwrap();
    mesh.sign_session(&mut session, Party::Requester, &Ed25519Signer::generate())
        .unwrap();
    mesh.publish_session(&mut session, 1.0, Utc::now())
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Published);

    let record = mesh.query_reputation("provider").await.unwrap();
    assert!((record.n_eff() - 5.0).abs() < 1e-9, "one full-weight update applied");
}

#[tokio::test]
async fn fork_then_probation_halves_session_evidence() {
    let mut mesh = test_mesh(Arc::new(MemoryLedger::new()));
    mesh.register_agent("parent", Utc::now()).await.unwrap();
    mesh.register_agent("requester", Utc::now()).await.unwrap();

    let child = mesh
        .register_fork("parent", "child", "f1", ForkType::Major, 0.5, Utc::now())
        .await
        .unwrap();
    // (2*0.5+2, 2*0.5+2) = (3, 3).
    assert_eq!((child.alpha, child.beta), (3.0, 3.0));

    let session = run_session(&mut mesh, "child", "requester", (1.0, 1.0), 1.0).await;
    assert_eq!(session.probation_multiplier_snapshot, 0.5);

    // weight 1 * lineage 0.5 * probation 0.5 = 0.25 effective mass.
    let record = mesh.query_reputation("child").await.unwrap();
    assert!((record.alpha - 3.25).abs() < 1e-9);
    assert_eq!(record.beta, 3.0);
    assert_eq!(record.probation.as_ref().unwrap().successful_tasks, 1);
}

#[tokio::test]
async fn sled_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(SledLedger::open(dir.path().join("trustmesh.db")).unwrap());
    let mut mesh = test_mesh(ledger);

    mesh.register_agent("provider", Utc::now()).await.unwrap();
    mesh.register_agent("requester", Utc::now()).await.unwrap();
    let session = run_session(&mut mesh, "provider", "requester", (0.9, 0.8), 1.0).await;

    assert_eq!(session.state, SessionState::Published);
    assert!(session.ledger_proof.is_some());
    let record = mesh.query_reputation("provider").await.unwrap();
    assert!((record.alpha - 2.85).abs() < 1e-9);
}

static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

fn uuid_like() -> u64 {
    COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

mod common;

use common::*;
use marketplace_audit::domain::audit::{
    AuditAction, AuditEvent, RequestOrigin, ResourceType, Severity, UNKNOWN,
};
use marketplace_audit::domain::error::ActivityError;
use marketplace_audit::domain::store::StoreProbe;
use marketplace_audit::infra::memory::MemoryAuditStore;
use marketplace_audit::services::emitter::EmitOutcome;
use marketplace_audit::services::provisioning::{ProvisionOutcome, ProvisionState};

// ── 1. initialize_creates_store_and_seed ───────────────────────────────────

#[tokio::test]
async fn initialize_creates_store_and_seed() {
    let h = Harness::with_audit(MemoryAuditStore::absent());
    let provisioner = &h.state.provisioner;

    assert_eq!(provisioner.state(), ProvisionState::Unknown);
    assert_eq!(provisioner.probe().await.unwrap(), StoreProbe::Absent);
    assert_eq!(provisioner.state(), ProvisionState::Checked { exists: false });

    let outcome = provisioner
        .initialize(&actor("root"), &origin())
        .await
        .unwrap();
    assert_eq!(outcome, ProvisionOutcome::Initialized);
    assert_eq!(provisioner.state(), ProvisionState::Ready);

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action(), AuditAction::SystemInitialized);
    assert_eq!(records[0].actor_id().as_str(), "root");
    assert_eq!(records[0].severity(), Severity::Low);
}

// ── 2. initialize_twice_is_idempotent ──────────────────────────────────────

#[tokio::test]
async fn initialize_twice_is_idempotent() {
    let h = Harness::with_audit(MemoryAuditStore::absent());
    let provisioner = &h.state.provisioner;

    provisioner
        .initialize(&actor("root"), &origin())
        .await
        .unwrap();
    let second = provisioner
        .initialize(&actor("root"), &origin())
        .await
        .unwrap();

    assert_eq!(second, ProvisionOutcome::AlreadyInitialized);
    assert_eq!(h.audit.records().len(), 1);
}

// ── 3. concurrent_initialize_reaches_one_ready_state ───────────────────────
// 10 tasks race to initialize. All succeed, exactly one writes the seed.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initialize_reaches_one_ready_state() {
    let h = Harness::with_audit(MemoryAuditStore::absent());

    let mut handles = Vec::new();
    for i in 0..10 {
        let provisioner = h.state.provisioner.clone();
        handles.push(tokio::spawn(async move {
            provisioner
                .initialize(&actor(&format!("admin-{i}")), &origin())
                .await
        }));
    }

    let mut initialized = 0;
    let mut already = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(ProvisionOutcome::Initialized) => initialized += 1,
            Ok(ProvisionOutcome::AlreadyInitialized) => already += 1,
            Err(e) => panic!("initialize surfaced an error: {e}"),
        }
    }

    assert_eq!(initialized, 1, "exactly 1 Initialized");
    assert_eq!(already, 9, "9 AlreadyInitialized");
    assert_eq!(h.state.provisioner.state(), ProvisionState::Ready);
    assert_eq!(h.audit.records().len(), 1);
}

// ── 4. missing_privilege_returns_setup_script ──────────────────────────────

#[tokio::test]
async fn missing_privilege_returns_setup_script() {
    let h = Harness::with_audit(MemoryAuditStore::absent_without_privilege());
    h.tables.add_account(account_row("alice", ts(2024, 1, 1)));

    let err = h
        .state
        .provisioner
        .initialize(&actor("root"), &origin())
        .await
        .unwrap_err();
    match err {
        ActivityError::SetupRequired { script, .. } => {
            assert!(script.contains("CREATE TABLE IF NOT EXISTS audit_logs"));
        }
        other => panic!("expected SetupRequired, got {other:?}"),
    }
    assert_eq!(
        h.state.provisioner.state(),
        ProvisionState::Checked { exists: false }
    );

    // Reads keep working off the primary tables.
    let feed = h
        .state
        .activity
        .query(Default::default(), Default::default())
        .await
        .unwrap();
    assert_eq!(feed.total, 1);
}

// ── 5. first_emit_initializes_lazily ───────────────────────────────────────

#[tokio::test]
async fn first_emit_initializes_lazily() {
    let h = Harness::with_audit(MemoryAuditStore::absent());

    let outcome = h
        .state
        .emitter
        .emit(
            Some(&actor("alice")),
            &origin(),
            AuditEvent::new(AuditAction::PasswordChanged, ResourceType::User).resource("alice"),
        )
        .await;
    assert!(matches!(outcome, EmitOutcome::Recorded(_)));

    let records = h.audit.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].action(), AuditAction::SystemInitialized);
    assert_eq!(records[0].actor_id().as_str(), "system");
    assert_eq!(records[1].action(), AuditAction::PasswordChanged);
    assert_eq!(records[1].ip_address(), Some("203.0.113.7"));
}

// ── 6. emit_failure_is_swallowed ───────────────────────────────────────────

#[tokio::test]
async fn emit_failure_is_swallowed() {
    let h = Harness::new();
    h.audit.set_unavailable(true);

    let outcome = h
        .state
        .emitter
        .emit(
            Some(&actor("alice")),
            &origin(),
            AuditEvent::new(AuditAction::SettingsUpdated, ResourceType::System),
        )
        .await;
    assert_eq!(outcome, EmitOutcome::Dropped);
}

// ── 7. unresolved_origin_is_recorded_as_unknown ────────────────────────────

#[tokio::test]
async fn unresolved_origin_is_recorded_as_unknown() {
    let h = Harness::new();

    h.state
        .emitter
        .emit(
            Some(&actor("alice")),
            &RequestOrigin::default(),
            AuditEvent::new(AuditAction::UserLogout, ResourceType::User),
        )
        .await;

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ip_address(), Some(UNKNOWN));
    assert_eq!(records[0].user_agent(), Some(UNKNOWN));
}

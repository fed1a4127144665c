mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::*;
use marketplace_audit::adapters::http::{router, service};
use marketplace_audit::domain::account::AccountRole;
use marketplace_audit::domain::audit::AuditAction;
use marketplace_audit::infra::memory::MemoryAuditStore;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

async fn send(h: &Harness, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(h.state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn as_actor(method: &str, uri: &str, actor: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-actor-id", actor)
        .header("x-actor-name", format!("{actor} name"))
        .header("x-forwarded-for", "198.51.100.4, 10.0.0.1")
        .header("user-agent", "http-test");
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

// ── 1. activity_feed_reports_its_source ────────────────────────────────────

#[tokio::test]
async fn activity_feed_reports_its_source() {
    let h = Harness::with_audit(MemoryAuditStore::absent());
    h.tables.add_account(account_row("alice", ts(2024, 1, 1)));

    let (status, body) = send(&h, get("/activity?page=1&page_size=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "reconstructed");
    assert_eq!(body["total"], 1);
    assert_eq!(body["records"][0]["action"], "user_registered");
    assert_eq!(body["records"][0]["id"], "user_alice");
}

// ── 2. invalid_query_renders_empty_result_with_error ───────────────────────

#[tokio::test]
async fn invalid_query_renders_empty_result_with_error() {
    let h = Harness::new();

    let (status, body) = send(&h, get("/activity?page_size=500")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "validation_error");
    assert_eq!(body["records"], json!([]));
    assert_eq!(body["total"], 0);

    let (status, body) = send(&h, get("/activity?action=teleported")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["total"], 0);

    // Query strings that do not deserialize get the same shape.
    for uri in [
        "/activity?start_date=yesterday",
        "/activity?page=abc",
        "/admins/a1/accounts?page=-1",
    ] {
        let (status, body) = send(&h, get(uri)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(body["error_code"], "validation_error", "{uri}");
        assert_eq!(body["records"], json!([]), "{uri}");
        assert_eq!(body["total"], 0, "{uri}");
    }
}

// ── 3. setup_requires_an_actor_and_is_idempotent ───────────────────────────

#[tokio::test]
async fn setup_requires_an_actor_and_is_idempotent() {
    let h = Harness::with_audit(MemoryAuditStore::absent());

    let anonymous = Request::post("/setup/audit-log")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&h, as_actor("POST", "/setup/audit-log", "root", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "initialized");

    let (_, body) = send(&h, as_actor("POST", "/setup/audit-log", "root", None)).await;
    assert_eq!(body["status"], "already_initialized");

    let seed = &h.audit.records()[0];
    assert_eq!(seed.action(), AuditAction::SystemInitialized);
    assert_eq!(seed.ip_address(), Some("198.51.100.4"));
}

// ── 4. setup_without_privilege_returns_script ──────────────────────────────

#[tokio::test]
async fn setup_without_privilege_returns_script() {
    let h = Harness::with_audit(MemoryAuditStore::absent_without_privilege());

    let (status, body) = send(&h, as_actor("POST", "/setup/audit-log", "root", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], "setup_required");
    assert!(
        body["script"]
            .as_str()
            .is_some_and(|s| s.contains("audit_logs"))
    );
}

// ── 5. suspended_actor_is_stopped_at_the_session_gate ──────────────────────

#[tokio::test]
async fn suspended_actor_is_stopped_at_the_session_gate() {
    let h = Harness::new();

    let (status, body) = send(
        &h,
        as_actor(
            "POST",
            "/accounts/alice/suspend",
            "mod",
            Some(json!({ "reason": "spam" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_active"], true);

    let (status, body) = send(&h, get("/accounts/alice/login-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);

    let (status, body) = send(&h, as_actor("GET", "/activity", "alice", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "account_suspended");

    let (status, body) = send(&h, as_actor("POST", "/accounts/alice/unsuspend", "mod", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["closed_suspensions"], 1);

    let (status, _) = send(&h, as_actor("GET", "/activity", "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
}

// ── 6. scoped_listing_and_admin_lifecycle ──────────────────────────────────

#[tokio::test]
async fn scoped_listing_and_admin_lifecycle() {
    let h = Harness::new();
    h.directory
        .insert(summary("u-1", AccountRole::User, Some("Toronto")), None);
    h.directory
        .insert(summary("u-2", AccountRole::User, Some("Ottawa")), None);
    h.directory
        .insert(summary("reg", AccountRole::User, None), None);

    let (status, body) = send(
        &h,
        as_actor(
            "POST",
            "/admins/reg/promote",
            "root",
            Some(json!({ "role": "admin", "location": { "city": "toronto" } })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (status, body) = send(&h, get("/admins/reg/accounts?page=1&page_size=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["records"][0]["id"], "u-1");

    let (status, _) = send(
        &h,
        as_actor(
            "PUT",
            "/admins/reg/location",
            "root",
            Some(json!({ "location": { "state": "Downtown", "city": "Ottawa" } })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&h, as_actor("POST", "/admins/reg/demote", "root", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&h, get("/admins/reg/accounts")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["records"], json!([]));
}

// ── 7. stats_never_fail ────────────────────────────────────────────────────

#[tokio::test]
async fn stats_never_fail() {
    let h = Harness::new();
    h.audit.set_unavailable(true);

    let (status, body) = send(&h, get("/activity/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["top_actions"], json!([]));
}

// ── 8. served_stack_bounds_request_bodies ──────────────────────────────────

#[tokio::test]
async fn served_stack_bounds_request_bodies() {
    let h = Harness::new();
    let app = service(h.state.clone(), Duration::from_secs(5));

    let oversized = json!({ "reason": "x".repeat(100 * 1024) });
    let response = app
        .clone()
        .oneshot(as_actor("POST", "/accounts/alice/suspend", "mod", Some(oversized)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(h.state.gate.check_login_allowed(&id("alice")).await.allowed);

    let response = app
        .oneshot(as_actor("POST", "/accounts/alice/suspend", "mod", Some(json!({ "reason": "spam" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

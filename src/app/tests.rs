use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    routing::get,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::compose;
use crate::api;
use crate::services::auth::TokenService;
use crate::services::auth::codec::{ClaimSet, TokenCodec};
use crate::services::auth::credentials::{BcryptHasher, CredentialValidator, PasswordHasher};
use crate::services::auth::identity;
use crate::services::auth::policy::TokenPolicy;
use crate::services::auth::principal::PrincipalStore;
use crate::services::auth::principal::memory::MemoryPrincipalStore;
use crate::services::auth::security::SecurityPolicy;
use crate::state::AppState;

const SECRET: &str = "router-test-secret-router-test-secret";

struct Harness {
    app: Router,
    store: Arc<MemoryPrincipalStore>,
    codec: TokenCodec,
}

fn harness() -> Harness {
    let hasher = BcryptHasher::new(4);
    let store = Arc::new(MemoryPrincipalStore::new());
    store.insert(
        42,
        "alice",
        &hasher.hash("alice-pw").unwrap(),
        Some("operator"),
        &["pipe:read"],
        true,
    );
    store.insert(
        7,
        "bob",
        &hasher.hash("bob-pw-1").unwrap(),
        Some("admin"),
        &["pipe:read", "system:admin"],
        true,
    );
    store.insert(9, "carol", &hasher.hash("carol-pw").unwrap(), None, &[], false);

    let policy = TokenPolicy::new(SECRET, 3_600_000, 86_400_000).unwrap();
    let principals: Arc<dyn PrincipalStore> = store.clone();
    let credentials = Arc::new(CredentialValidator::new(principals.clone(), Arc::new(hasher)));
    let security = SecurityPolicy::standard()
        .unwrap()
        .public("/public/**")
        .unwrap()
        .permission("/admin/**", "system:admin")
        .unwrap();

    let state = AppState::new(
        Arc::new(TokenService::new(policy.clone())),
        credentials,
        principals,
        Arc::new(security),
    );

    let routes = Router::new()
        .merge(api::v1::health_routes())
        .nest("/api", api::v1::routes())
        .route("/diag/identity", get(whoami))
        .route("/public/identity", get(whoami))
        .route("/diag/panic", get(boom))
        .route("/admin/stats", get(|| async { "stats" }));

    Harness {
        app: compose(routes, state),
        store,
        codec: TokenCodec::new(&policy),
    }
}

async fn whoami() -> Json<Value> {
    Json(json!({ "userId": identity::current_user_id() }))
}

async fn boom() -> &'static str {
    panic!("handler panicked on purpose")
}

fn get_req(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn login(app: &Router, username: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/api/auth/login",
            json!({"username": username, "password": password}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"].clone()
}

fn token<'a>(data: &'a Value, field: &str) -> &'a str {
    data[field].as_str().unwrap()
}

fn assert_unauthenticated(status: StatusCode, body: &Value, path: &str) {
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
    assert_eq!(body["message"], "unauthenticated");
    assert!(body["data"].is_null());
    assert!(body["timestamp"].is_i64());
    assert_eq!(body["path"], path);
}

#[tokio::test]
async fn login_returns_pair_for_alice() {
    let h = harness();
    let data = login(&h.app, "alice", "alice-pw").await;

    let claims = h.codec.decode(token(&data, "accessToken")).unwrap();
    assert_eq!(claims.subject, "alice");
    assert_eq!(claims.user_id, 42);
    assert!(!claims.is_refresh());
    assert!(h.codec.decode(token(&data, "refreshToken")).unwrap().is_refresh());

    assert_eq!(data["tokenType"], "Bearer");
    assert_eq!(data["expiresIn"], 3600);
    assert_eq!(data["userInfo"]["id"], 42);
    assert_eq!(data["userInfo"]["username"], "alice");
    assert_eq!(data["roleName"], "operator");
    assert_eq!(data["permissions"], json!(["pipe:read"]));
    assert_eq!(h.store.logins(), vec![42]);
}

#[tokio::test]
async fn expired_token_is_generic_401() {
    let h = harness();
    let expired = h.codec.encode(&ClaimSet::access("alice", 42), -1000).unwrap();

    let (status, body) = send(&h.app, get_req("/api/auth/me", Some(&expired))).await;
    assert_unauthenticated(status, &body, "/api/auth/me");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_alike() {
    let h = harness();

    let (status, wrong) = send(
        &h.app,
        post_json(
            "/api/auth/login",
            json!({"username": "alice", "password": "not-alice"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["message"], "invalid username or password");
    assert_eq!(wrong["path"], "/api/auth/login");

    let (status, unknown) = send(
        &h.app,
        post_json(
            "/api/auth/login",
            json!({"username": "mallory", "password": "whatever"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["message"], wrong["message"]);

    assert!(h.store.logins().is_empty());
}

#[tokio::test]
async fn disabled_account_cannot_log_in() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post_json(
            "/api/auth/login",
            json!({"username": "carol", "password": "carol-pw"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "account disabled");
}

#[tokio::test]
async fn login_input_is_validated() {
    let h = harness();

    let (status, body) = send(
        &h.app,
        post_json(
            "/api/auth/login",
            json!({"username": "alice", "password": "12345"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(body["path"], "/api/auth/login");

    let (status, _) = send(
        &h.app,
        post_json("/api/auth/login", json!({"username": "", "password": "alice-pw"}), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_json = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&h.app, bad_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn public_path_needs_no_header_protected_path_does() {
    let h = harness();

    let (status, body) = send(&h.app, get_req("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&h.app, get_req("/api/auth/me", None)).await;
    assert_unauthenticated(status, &body, "/api/auth/me");

    let (status, body) = send(&h.app, get_req("/diag/identity", None)).await;
    assert_unauthenticated(status, &body, "/diag/identity");
}

#[tokio::test]
async fn refresh_issues_new_pair_and_old_access_stays_valid() {
    let h = harness();
    let first = login(&h.app, "alice", "alice-pw").await;

    let (status, body) = send(
        &h.app,
        post_json(
            "/api/auth/refresh",
            json!({"refreshToken": token(&first, "refreshToken")}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second = &body["data"];
    assert_eq!(second["tokenType"], "Bearer");

    let claims = h.codec.decode(token(second, "accessToken")).unwrap();
    assert_eq!(claims.user_id, 42);
    assert_eq!(claims.subject, "alice");

    let (status, me) = send(&h.app, get_req("/api/auth/me", Some(token(second, "accessToken")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["username"], "alice");

    // Not revoked by the refresh.
    let (status, _) = send(&h.app, get_req("/api/auth/me", Some(token(&first, "accessToken")))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_rejects_access_tokens_and_blank_input() {
    let h = harness();
    let data = login(&h.app, "alice", "alice-pw").await;

    let (status, body) = send(
        &h.app,
        post_json(
            "/api/auth/refresh",
            json!({"refreshToken": token(&data, "accessToken")}),
            None,
        ),
    )
    .await;
    assert_unauthenticated(status, &body, "/api/auth/refresh");

    let (status, _) = send(
        &h.app,
        post_json("/api/auth/refresh", json!({"refreshToken": " "}), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_token_is_not_accepted_by_the_gate() {
    let h = harness();
    let data = login(&h.app, "alice", "alice-pw").await;

    let (status, body) = send(&h.app, get_req("/api/auth/me", Some(token(&data, "refreshToken")))).await;
    assert_unauthenticated(status, &body, "/api/auth/me");
}

#[tokio::test]
async fn tampered_and_garbage_tokens_get_the_same_answer() {
    let h = harness();
    let data = login(&h.app, "alice", "alice-pw").await;
    let mut tampered = token(&data, "accessToken").to_string();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    for bad in [tampered.as_str(), "garbage", "a.b.c"] {
        let (status, body) = send(&h.app, get_req("/api/auth/validate", Some(bad))).await;
        assert_unauthenticated(status, &body, "/api/auth/validate");
    }
}

#[tokio::test]
async fn handler_sees_identity_and_it_is_gone_afterwards() {
    let h = harness();
    let data = login(&h.app, "alice", "alice-pw").await;

    let (status, body) = send(&h.app, get_req("/diag/identity", Some(token(&data, "accessToken")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], 42);
    assert_eq!(identity::current_user_id(), None);
}

#[tokio::test]
async fn public_route_gets_no_identity_even_with_token() {
    let h = harness();
    let data = login(&h.app, "alice", "alice-pw").await;

    let (status, body) = send(&h.app, get_req("/public/identity", Some(token(&data, "accessToken")))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["userId"].is_null());
}

#[tokio::test]
async fn rejection_does_not_leak_into_next_request() {
    let h = harness();
    let alice = login(&h.app, "alice", "alice-pw").await;
    let bob = login(&h.app, "bob", "bob-pw-1").await;

    let (status, _) = send(&h.app, get_req("/diag/identity", Some(token(&alice, "refreshToken")))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(identity::current_user_id(), None);

    let (_, body) = send(&h.app, get_req("/diag/identity", Some(token(&bob, "accessToken")))).await;
    assert_eq!(body["userId"], 7);
}

#[tokio::test]
async fn panic_becomes_500_and_identity_is_released() {
    let h = harness();
    let alice = login(&h.app, "alice", "alice-pw").await;
    let bob = login(&h.app, "bob", "bob-pw-1").await;

    let (status, body) = send(&h.app, get_req("/diag/panic", Some(token(&alice, "accessToken")))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert_eq!(body["path"], "/diag/panic");
    assert_eq!(identity::current_user_id(), None);

    let (_, body) = send(&h.app, get_req("/diag/identity", Some(token(&bob, "accessToken")))).await;
    assert_eq!(body["userId"], 7);
}

#[tokio::test]
async fn parallel_requests_keep_their_own_identity() {
    let h = harness();
    let alice = login(&h.app, "alice", "alice-pw").await;
    let bob = login(&h.app, "bob", "bob-pw-1").await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let (access, expected) = if i % 2 == 0 {
            (token(&alice, "accessToken").to_string(), 42)
        } else {
            (token(&bob, "accessToken").to_string(), 7)
        };
        let app = h.app.clone();
        tasks.push(tokio::spawn(async move {
            let (_, body) = send(&app, get_req("/diag/identity", Some(&access))).await;
            (body["userId"].as_i64(), expected)
        }));
    }

    for task in tasks {
        let (seen, expected) = task.await.unwrap();
        assert_eq!(seen, Some(expected));
    }
}

#[tokio::test]
async fn permission_routes_check_fresh_principal() {
    let h = harness();
    let alice = login(&h.app, "alice", "alice-pw").await;
    let bob = login(&h.app, "bob", "bob-pw-1").await;

    let (status, body) = send(&h.app, get_req("/admin/stats", Some(token(&alice, "accessToken")))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);
    assert_eq!(body["message"], "insufficient permission");
    assert_eq!(body["path"], "/admin/stats");

    let res = h
        .app
        .clone()
        .oneshot(get_req("/admin/stats", Some(token(&bob, "accessToken"))))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"stats");

    // Valid signature, but the account is disabled.
    let carol = h.codec.encode(&ClaimSet::access("carol", 9), 60_000).unwrap();
    let (status, body) = send(&h.app, get_req("/admin/stats", Some(&carol))).await;
    assert_unauthenticated(status, &body, "/admin/stats");
}

#[tokio::test]
async fn me_validate_and_logout() {
    let h = harness();
    let data = login(&h.app, "alice", "alice-pw").await;
    let access = token(&data, "accessToken");

    let (status, me) = send(&h.app, get_req("/api/auth/me", Some(access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["id"], 42);
    assert_eq!(me["data"]["roleName"], "operator");
    assert_eq!(me["data"]["permissions"], json!(["pipe:read"]));

    let (status, v) = send(&h.app, get_req("/api/auth/validate", Some(access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["valid"], true);
    assert_eq!(v["data"]["username"], "alice");
    assert!(v["data"]["expiresAt"].is_string());

    let (status, out) = send(&h.app, post_json("/api/auth/logout", json!({}), Some(access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["code"], 200);
    assert_eq!(out["message"], "logout succeeded");

    // Stateless: logout does not revoke.
    let (status, _) = send(&h.app, get_req("/api/auth/me", Some(access))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_404_only_after_authentication() {
    let h = harness();
    let data = login(&h.app, "alice", "alice-pw").await;

    let (status, body) = send(&h.app, get_req("/api/pipes/1", None)).await;
    assert_unauthenticated(status, &body, "/api/pipes/1");

    let (status, body) = send(&h.app, get_req("/api/pipes/1", Some(token(&data, "accessToken")))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let h = harness();
    let res = h.app.clone().oneshot(get_req("/health", None)).await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));

    let res = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-123");
}

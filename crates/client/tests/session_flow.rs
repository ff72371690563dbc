use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use hospital_rbac_auth::{Action, Permission, Resource as Res, Role, View};
use hospital_rbac_client::{
    AppContext, AuditQuery, ClientConfig, DateRange, FileTokenStore, MemoryTokenStore, Route,
    SessionPhase, TokenStore,
};
use hospital_rbac_core::ApiError;

/// Knobs and recordings shared with the mock backend.
#[derive(Default)]
struct Backend {
    /// Bearer tokens the backend accepts, keyed to a user payload.
    tokens: Mutex<HashMap<String, Value>>,
    logout_fails: AtomicBool,
    logout_calls: AtomicUsize,
    /// Extra latency of `/auth/me`, in milliseconds.
    me_delay_ms: AtomicU64,
    deleted: Mutex<Vec<i64>>,
    authorization_seen: Mutex<Vec<Option<String>>>,
    request_ids_seen: Mutex<Vec<String>>,
}

impl Backend {
    fn user_for(&self, headers: &HeaderMap) -> Option<Value> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.authorization_seen.lock().unwrap().push(auth.clone());
        if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
            self.request_ids_seen.lock().unwrap().push(id.to_string());
        }

        let token = auth?.strip_prefix("Bearer ")?.to_string();
        self.tokens.lock().unwrap().get(&token).cloned()
    }

    fn revoke_all(&self) {
        self.tokens.lock().unwrap().clear();
    }
}

type Shared = Arc<Backend>;

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

async fn login(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let user = match (body["username"].as_str(), body["password"].as_str()) {
        (Some("admin"), Some("secret")) => {
            json!({ "id": 1, "username": "admin", "role_name": "Admin" })
        }
        (Some("drhouse"), Some("vicodin")) => {
            json!({ "user_id": 7, "username": "drhouse", "role_id": 2, "role_name": "Doctor" })
        }
        (Some("soft"), _) => {
            // Some deployments report bad credentials inside a 200 envelope.
            return Json(json!({ "success": false, "message": "Invalid username or password" }))
                .into_response();
        }
        _ => return unauthorized("Invalid username or password"),
    };

    let token = format!("tok-{}", user["username"].as_str().unwrap_or_default());
    backend
        .tokens
        .lock()
        .unwrap()
        .insert(token.clone(), user.clone());

    Json(json!({ "success": true, "data": { "token": token, "user": user } })).into_response()
}

async fn me(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let delay = backend.me_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    match backend.user_for(&headers) {
        Some(user) => Json(json!({ "success": true, "data": user })).into_response(),
        None => unauthorized("Invalid or expired token"),
    }
}

async fn logout(State(backend): State<Shared>) -> Response {
    backend.logout_calls.fetch_add(1, Ordering::SeqCst);
    if backend.logout_fails.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(json!({ "success": true, "message": "Logged out" })).into_response()
}

async fn change_password(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if backend.user_for(&headers).is_none() {
        return unauthorized("Access token required");
    }
    if body["current_password"] != "secret" {
        // The real backend uses 401 for a wrong current password too.
        return unauthorized("Current password is incorrect");
    }
    Json(json!({ "success": true, "message": "Password changed successfully" })).into_response()
}

async fn users(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    if backend.user_for(&headers).is_none() {
        return unauthorized("Invalid or expired token");
    }
    Json(json!({ "success": true, "data": [{ "user_id": 1, "username": "admin" }] }))
        .into_response()
}

async fn patients(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    backend.user_for(&headers);
    Json(json!({ "success": false, "message": "Database unavailable" })).into_response()
}

async fn update_patient(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if backend.user_for(&headers).is_none() {
        return unauthorized("Invalid or expired token");
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({
        "success": true,
        "data": { "id": id, "received": body, "content_type": content_type }
    }))
    .into_response()
}

async fn delete_patient(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if backend.user_for(&headers).is_none() {
        return unauthorized("Invalid or expired token");
    }
    backend.deleted.lock().unwrap().push(id);
    Json(json!({ "success": true, "message": "Patient deleted" })).into_response()
}

async fn audit_logs(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({ "success": true, "data": params }))
}

async fn forbidden() -> StatusCode {
    StatusCode::FORBIDDEN
}

async fn not_json() -> &'static str {
    "<html>gateway</html>"
}

struct TestServer {
    base_url: String,
    backend: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let backend: Shared = Arc::new(Backend::default());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/me", get(me))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/change-password", post(change_password))
            .route("/api/users", get(users))
            .route("/api/patients", get(patients))
            .route(
                "/api/patients/:id",
                put(update_patient).delete(delete_patient),
            )
            .route("/api/audit/logs", get(audit_logs))
            .route("/api/roles", get(forbidden))
            .route("/api/dashboard/stats", get(not_json))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            handle,
        }
    }

    fn context(&self, tokens: Arc<dyn TokenStore>) -> AppContext {
        let config = ClientConfig::new(&self.base_url).unwrap();
        AppContext::new(config, tokens).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn signed_in_admin(server: &TestServer) -> (AppContext, Arc<MemoryTokenStore>) {
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = server.context(tokens.clone());
    ctx.session().bootstrap().await;
    ctx.session().login("admin", "secret").await.unwrap();
    (ctx, tokens)
}

#[tokio::test]
async fn valid_login_authenticates_and_persists_token() {
    let server = TestServer::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let tokens = Arc::new(FileTokenStore::new(dir.path().join("auth_token")));
    let ctx = server.context(tokens.clone());

    assert_eq!(ctx.session().bootstrap().await, SessionPhase::Unauthenticated);

    let user = ctx.session().login("admin", "secret").await.unwrap();
    assert_eq!(user.role_name, Role::ADMIN);

    let session = ctx.snapshot();
    assert_eq!(session.phase(), SessionPhase::Authenticated);
    assert_eq!(session.role(), Some(&Role::ADMIN));
    assert_eq!(tokens.load().unwrap(), Some("tok-admin".to_string()));
    assert_eq!(ctx.navigator().current(), Route::View(View::Dashboard));
}

#[tokio::test]
async fn rejected_login_leaves_session_signed_out() {
    let server = TestServer::spawn().await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = server.context(tokens.clone());
    ctx.session().bootstrap().await;

    let err = ctx.session().login("admin", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid username or password");
    assert!(err.is_unauthorized());

    let err = ctx.session().login("soft", "whatever").await.unwrap_err();
    assert_eq!(err, ApiError::application("Invalid username or password"));

    assert_eq!(ctx.session().phase(), SessionPhase::Unauthenticated);
    assert_eq!(tokens.load().unwrap(), None);
    assert_eq!(ctx.navigator().current(), Route::Login);
}

#[tokio::test]
async fn unauthorized_response_evicts_the_session() {
    let server = TestServer::spawn().await;
    let (ctx, tokens) = signed_in_admin(&server).await;

    let list = ctx.users().crud().list(&[]).await.unwrap();
    assert_eq!(list[0]["username"], "admin");

    server.backend.revoke_all();
    // Result deliberately ignored: eviction must not depend on the caller.
    let _ = ctx.users().crud().list(&[]).await;

    assert_eq!(ctx.session().phase(), SessionPhase::Unauthenticated);
    assert_eq!(ctx.current_user(), None);
    assert_eq!(tokens.load().unwrap(), None);
    assert_eq!(ctx.navigator().current(), Route::Login);

    let next = ctx.users().crud().list(&[]).await.unwrap_err();
    assert!(next.is_unauthorized());
    let seen = server.backend.authorization_seen.lock().unwrap().clone();
    assert_eq!(seen.last(), Some(&None), "no token after eviction");
}

#[tokio::test]
async fn bootstrap_without_token_is_idempotent() {
    let server = TestServer::spawn().await;
    let ctx = server.context(Arc::new(MemoryTokenStore::new()));

    for _ in 0..3 {
        assert_eq!(ctx.session().bootstrap().await, SessionPhase::Unauthenticated);
        assert!(!ctx.session().loading());
        assert_eq!(ctx.navigator().current(), Route::Login);
    }
}

#[tokio::test]
async fn bootstrap_restores_a_valid_token() {
    let server = TestServer::spawn().await;
    server.backend.tokens.lock().unwrap().insert(
        "saved".into(),
        json!({ "user_id": 3, "username": "nina", "roles": "Nurse" }),
    );

    let ctx = server.context(Arc::new(MemoryTokenStore::with_token("saved")));
    assert_eq!(ctx.session().bootstrap().await, SessionPhase::Authenticated);

    let user = ctx.current_user().unwrap();
    assert_eq!(user.username, "nina");
    assert_eq!(user.role_name, Role::NURSE);
    assert!(ctx.snapshot().can_access_view(View::MedicalRecords));
    assert!(!ctx.snapshot().can_access_view(View::Audit));
    assert_eq!(ctx.navigator().current(), Route::View(View::Dashboard));
}

#[tokio::test]
async fn bootstrap_discards_a_rejected_token() {
    let server = TestServer::spawn().await;
    let tokens = Arc::new(MemoryTokenStore::with_token("stale"));
    let ctx = server.context(tokens.clone());

    assert_eq!(ctx.session().bootstrap().await, SessionPhase::Unauthenticated);
    assert_eq!(tokens.load().unwrap(), None);
    assert!(!ctx.session().loading());
}

#[tokio::test]
async fn logout_clears_locally_even_when_backend_fails() {
    let server = TestServer::spawn().await;
    let (ctx, tokens) = signed_in_admin(&server).await;
    server.backend.logout_fails.store(true, Ordering::SeqCst);

    ctx.session().logout().await;

    assert_eq!(server.backend.logout_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.session().phase(), SessionPhase::Unauthenticated);
    assert_eq!(tokens.load().unwrap(), None);
    assert_eq!(ctx.navigator().current(), Route::Login);

    // Signed out already: nothing to tell the backend.
    ctx.session().logout().await;
    assert_eq!(server.backend.logout_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn change_password_succeeds_with_current_password() {
    let server = TestServer::spawn().await;
    let (ctx, _tokens) = signed_in_admin(&server).await;

    ctx.session().change_password("secret", "n3w").await.unwrap();

    assert_eq!(ctx.session().phase(), SessionPhase::Authenticated);
}

#[tokio::test]
async fn wrong_current_password_keeps_the_session() {
    let server = TestServer::spawn().await;
    let (ctx, tokens) = signed_in_admin(&server).await;
    ctx.navigator().navigate(&ctx.snapshot(), View::Users).unwrap();

    let err = ctx
        .session()
        .change_password("typo", "n3w")
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::application("Current password is incorrect"));

    assert_eq!(ctx.session().phase(), SessionPhase::Authenticated);
    assert_eq!(tokens.load().unwrap(), Some("tok-admin".to_string()));
    assert_eq!(ctx.navigator().current(), Route::View(View::Users));
}

#[tokio::test]
async fn refresh_user_replaces_the_identity() {
    let server = TestServer::spawn().await;
    let (ctx, _tokens) = signed_in_admin(&server).await;
    server.backend.tokens.lock().unwrap().insert(
        "tok-admin".into(),
        json!({ "user_id": 1, "username": "admin", "role_name": "Receptionist" }),
    );

    let user = ctx.session().refresh_user().await.unwrap();
    assert_eq!(user.role_name, Role::RECEPTIONIST);
    assert_eq!(ctx.current_user().unwrap().role_name, Role::RECEPTIONIST);
    assert!(!ctx.snapshot().can_access_view(View::Users));
    assert_eq!(ctx.session().phase(), SessionPhase::Authenticated);
}

#[tokio::test]
async fn refresh_user_leaves_signed_out_session_alone() {
    let server = TestServer::spawn().await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = server.context(tokens.clone());
    ctx.session().bootstrap().await;

    assert!(ctx.session().refresh_user().await.is_err());
    assert_eq!(ctx.session().phase(), SessionPhase::Unauthenticated);
    assert_eq!(ctx.current_user(), None);
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn refresh_user_with_revoked_token_evicts() {
    let server = TestServer::spawn().await;
    let (ctx, tokens) = signed_in_admin(&server).await;
    server.backend.revoke_all();

    let err = ctx.session().refresh_user().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(ctx.session().phase(), SessionPhase::Unauthenticated);
    assert_eq!(tokens.load().unwrap(), None);
    assert_eq!(ctx.navigator().current(), Route::Login);
}

#[tokio::test]
async fn refresh_started_before_a_new_sign_in_does_not_overwrite_it() {
    let server = TestServer::spawn().await;
    let (ctx, _tokens) = signed_in_admin(&server).await;
    server.backend.me_delay_ms.store(150, Ordering::SeqCst);

    let refresh = {
        let ctx = ctx.clone();
        tokio::spawn(async move { ctx.session().refresh_user().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    ctx.session().logout().await;
    ctx.session().login("drhouse", "vicodin").await.unwrap();

    let stale = refresh.await.unwrap().unwrap();
    assert_eq!(stale.username, "admin");

    let current = ctx.current_user().unwrap();
    assert_eq!(current.username, "drhouse");
    assert_eq!(current.role_name, Role::DOCTOR);
    assert_eq!(ctx.session_handle().token(), Some("tok-drhouse".to_string()));
}

#[tokio::test]
async fn crud_update_and_delete_reach_the_backend() {
    let server = TestServer::spawn().await;
    let (ctx, _tokens) = signed_in_admin(&server).await;

    let updated = ctx
        .patients()
        .update(42, &json!({ "first_name": "Ada", "phone": "555-0100" }))
        .await
        .unwrap();
    assert_eq!(updated["id"], 42);
    assert_eq!(updated["received"]["first_name"], "Ada");
    assert!(
        updated["content_type"]
            .as_str()
            .unwrap()
            .starts_with("application/json")
    );

    let deleted = ctx.patients().delete(42).await.unwrap();
    assert_eq!(deleted, Value::Null);
    assert_eq!(*server.backend.deleted.lock().unwrap(), vec![42]);
}

#[tokio::test]
async fn requests_carry_bearer_token_and_request_id() {
    let server = TestServer::spawn().await;
    let (ctx, _tokens) = signed_in_admin(&server).await;

    ctx.users().crud().list(&[]).await.unwrap();
    ctx.users().crud().list(&[]).await.unwrap();

    let seen = server.backend.authorization_seen.lock().unwrap().clone();
    assert_eq!(seen.last(), Some(&Some("Bearer tok-admin".to_string())));

    let ids = server.backend.request_ids_seen.lock().unwrap().clone();
    assert!(ids.len() >= 2);
    assert_ne!(ids[ids.len() - 1], ids[ids.len() - 2]);
}

#[tokio::test]
async fn error_taxonomy_over_the_wire() {
    let server = TestServer::spawn().await;
    let (ctx, _tokens) = signed_in_admin(&server).await;

    let app = ctx.patients().list(&[]).await.unwrap_err();
    assert_eq!(app, ApiError::application("Database unavailable"));

    let status = ctx.roles().crud().list(&[]).await.unwrap_err();
    assert_eq!(status.status(), Some(403));
    assert_eq!(status.to_string(), "HTTP error: status 403");
    assert_eq!(ctx.session().phase(), SessionPhase::Authenticated);

    let decode = ctx.dashboard().stats().await.unwrap_err();
    assert!(matches!(decode, ApiError::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(&format!("http://{}/api", addr)).unwrap();
    let ctx = AppContext::new(config, Arc::new(MemoryTokenStore::new())).unwrap();

    let err = ctx.session().login("admin", "secret").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.to_string().starts_with("network error"));
}

#[tokio::test]
async fn audit_filters_become_query_parameters() {
    let server = TestServer::spawn().await;
    let (ctx, _tokens) = signed_in_admin(&server).await;

    let query = AuditQuery {
        date_range: DateRange::Month,
        status: Some("failed".into()),
        limit: 25,
    };
    let echoed = ctx.audit().logs(&query).await.unwrap();
    assert_eq!(
        echoed,
        json!({ "dateRange": "month", "status": "failed", "limit": "25" })
    );
}

#[tokio::test]
async fn guarded_mutations_follow_the_signed_in_role() {
    let server = TestServer::spawn().await;
    let ctx = server.context(Arc::new(MemoryTokenStore::new()));
    ctx.session().bootstrap().await;
    ctx.session().login("drhouse", "vicodin").await.unwrap();

    let api = ctx.api().clone();
    let create_user = ctx.guarded(Permission::new(Res::Users, Action::Create), move |()| {
        let api = api.clone();
        async move { api.get::<Value>("/users").await }
    });
    let before = server.backend.authorization_seen.lock().unwrap().len();
    let err = create_user.mutate(()).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(create_user.state().error.is_some());
    assert_eq!(
        server.backend.authorization_seen.lock().unwrap().len(),
        before,
        "denied mutation made no request"
    );

    assert!(ctx.navigator().navigate(&ctx.snapshot(), View::Users).is_err());
    ctx.navigator()
        .navigate(&ctx.snapshot(), View::MedicalRecords)
        .unwrap();
    assert_eq!(ctx.navigator().current(), Route::View(View::MedicalRecords));
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared fixtures: an in-process mock course backend and a shell wired to it.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use frame_shell::config::Config;
use frame_shell::models::TokenPair;
use frame_shell::services::{CredentialStore, MemoryStorage, Storage};
use frame_shell::AppState;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_EMAIL: &str = "t@x.com";
pub const TEST_PASSWORD: &str = "secret123";
pub const TEST_USER_ID: &str = "user-1";
pub const REFRESH_TOKEN: &str = "refresh-token-1";

/// Mint an HS256 token carrying the given identity claims.
///
/// `expires_in` is relative to now and may be negative.
#[allow(dead_code)]
pub fn mint_token(id: &str, email: &str, role: Option<&str>, expires_in: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + expires_in;
    let mut claims = json!({
        "id": id,
        "email": email,
        "exp": exp,
        "jti": next_token_id(),
    });
    if let Some(role) = role {
        claims["role"] = json!(role);
    }

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"mock-backend-secret"),
    )
    .expect("Failed to mint token")
}

fn next_token_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("t{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Token accepted by the mock backend right now.
#[allow(dead_code)]
pub fn valid_token() -> String {
    mint_token(TEST_USER_ID, TEST_EMAIL, Some("TEACHER"), 3600)
}

/// Knobs and counters for the mock backend.
#[derive(Default)]
pub struct MockBackend {
    valid_access_token: Mutex<Option<String>>,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub protected_calls: AtomicUsize,
    /// Refresh endpoint answers 401.
    pub refresh_fails: AtomicBool,
    /// Delay before the refresh endpoint answers.
    pub refresh_delay_ms: AtomicU64,
    /// Protected endpoints reject every token.
    pub reject_all: AtomicBool,
    /// The next lessons request revokes the current token and answers 401.
    pub revoke_on_lessons: AtomicBool,
    /// Progress and completion endpoints answer 500.
    pub progress_fails: AtomicBool,
    /// Delay between the auth check and the progress response.
    pub progress_delay_ms: AtomicU64,
    pub logout_fails: AtomicBool,
    /// Register answers without tokens.
    pub register_needs_verification: AtomicBool,
    /// Login answers with opaque, non-JWT tokens.
    pub opaque_tokens: AtomicBool,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn accept_token(&self, token: &str) {
        *self.valid_access_token.lock().unwrap() = Some(token.to_string());
    }

    pub fn revoke_token(&self) {
        *self.valid_access_token.lock().unwrap() = None;
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        self.protected_calls.fetch_add(1, Ordering::SeqCst);

        let presented = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        let valid = self.valid_access_token.lock().unwrap().clone();
        if self.reject_all.load(Ordering::SeqCst) || presented.is_none() || presented != valid {
            return Err(unauthorized());
        }
        Ok(())
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Token expired"})),
    )
        .into_response()
}

type Shared = Arc<MockBackend>;

/// Start the mock backend on an ephemeral port. Returns it and its base URL.
#[allow(dead_code)]
pub async fn spawn_backend() -> (Arc<MockBackend>, String) {
    let backend = Arc::new(MockBackend::default());

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh-token", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/courses/{id}/modules", get(list_modules).post(create_item))
        .route("/modules/{id}/lessons", get(list_lessons).post(create_item))
        .route("/lessons/{id}/contents", get(list_contents).post(create_item))
        .route("/courses/{id}/quizzes", get(list_quizzes).post(create_item))
        .route("/quizzes/{id}/questions", get(list_questions).post(create_item))
        .route("/courses/{id}/progress", get(course_progress))
        .route("/lessons/{id}/complete", post(complete_lesson))
        .route("/slow", get(slow))
        .route("/missing", get(missing))
        .with_state(Arc::clone(&backend));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("Mock backend has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend failed");
    });

    (backend, format!("http://{}", addr))
}

// ─── Auth handlers ───────────────────────────────────────────

async fn login(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["email"] != TEST_EMAIL || body["password"] != TEST_PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid email or password"})),
        )
            .into_response();
    }

    if backend.opaque_tokens.load(Ordering::SeqCst) {
        backend.accept_token("A");
        return Json(json!({"accessToken": "A", "refreshToken": "R"})).into_response();
    }

    // No role claim: the shell should default to STUDENT.
    let access = mint_token(TEST_USER_ID, TEST_EMAIL, None, 3600);
    backend.accept_token(&access);
    Json(json!({"accessToken": access, "refreshToken": REFRESH_TOKEN})).into_response()
}

async fn register(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    if backend.register_needs_verification.load(Ordering::SeqCst) {
        return (
            StatusCode::CREATED,
            Json(json!({"message": "Check your inbox", "email": body["email"]})),
        )
            .into_response();
    }

    let email = body["email"].as_str().unwrap_or(TEST_EMAIL);
    let access = mint_token("user-2", email, Some("TEACHER"), 3600);
    backend.accept_token(&access);
    Json(json!({"accessToken": access, "refreshToken": REFRESH_TOKEN})).into_response()
}

async fn refresh(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = backend.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if backend.refresh_fails.load(Ordering::SeqCst) || body["refreshToken"] != REFRESH_TOKEN {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Refresh token revoked"})),
        )
            .into_response();
    }

    let access = valid_token();
    backend.accept_token(&access);
    Json(json!({"accessToken": access})).into_response()
}

async fn logout(State(backend): State<Shared>) -> Response {
    backend.logout_calls.fetch_add(1, Ordering::SeqCst);
    if backend.logout_fails.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

// ─── Course handlers ─────────────────────────────────────────

async fn list_modules(
    State(backend): State<Shared>,
    Path(course_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    Json(json!([
        {"id": "m1", "courseId": course_id, "title": "Basics"},
        {"id": "m2", "courseId": course_id, "title": "Advanced"},
    ]))
    .into_response()
}

async fn list_lessons(
    State(backend): State<Shared>,
    Path(module_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if backend.revoke_on_lessons.swap(false, Ordering::SeqCst) {
        backend.revoke_token();
        return unauthorized();
    }
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    Json(json!([{"id": format!("{}-l1", module_id), "moduleId": module_id}])).into_response()
}

async fn list_contents(
    State(backend): State<Shared>,
    Path(lesson_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    Json(json!([{"id": format!("{}-c1", lesson_id), "kind": "TEXT"}])).into_response()
}

async fn list_quizzes(
    State(backend): State<Shared>,
    Path(course_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    // Wrapped form, as some list endpoints answer.
    Json(json!({"data": [{"id": "q1", "courseId": course_id}]})).into_response()
}

async fn list_questions(
    State(backend): State<Shared>,
    Path(quiz_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    Json(json!([{"id": format!("{}-a", quiz_id), "prompt": "2 + 2?"}])).into_response()
}

async fn create_item(
    State(backend): State<Shared>,
    Path(parent_id): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    body["id"] = json!("new-1");
    body["parentId"] = json!(parent_id);
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn course_progress(
    State(backend): State<Shared>,
    Path(course_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let authorized = backend.authorize(&headers);

    let delay = backend.progress_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if let Err(resp) = authorized {
        return resp;
    }
    if backend.progress_fails.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Progress service unavailable"})),
        )
            .into_response();
    }
    Json(json!({"courseId": course_id, "completed": 1, "total": 3})).into_response()
}

async fn complete_lesson(
    State(backend): State<Shared>,
    Path(lesson_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    if backend.progress_fails.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Progress service unavailable"})),
        )
            .into_response();
    }
    Json(json!({"lessonId": lesson_id, "completed": true})).into_response()
}

async fn slow(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({})).into_response()
}

async fn missing(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = backend.authorize(&headers) {
        return resp;
    }
    (StatusCode::NOT_FOUND, Json(json!({"message": "Course not found"}))).into_response()
}

// ─── Shell fixtures ──────────────────────────────────────────

/// A shell wired to a mock backend over in-memory storage.
pub struct TestShell {
    pub backend: Arc<MockBackend>,
    pub storage: Arc<MemoryStorage>,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestShell {
    pub fn credentials(&self) -> CredentialStore {
        CredentialStore::new(self.storage.clone() as Arc<dyn Storage>)
    }
}

/// Builder for a [`TestShell`]: seed storage, then start.
#[derive(Default)]
pub struct TestShellBuilder {
    tokens: Option<TokenPair>,
    user: Option<frame_shell::models::UserSession>,
    request_timeout: Option<Duration>,
}

#[allow(dead_code)]
impl TestShellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token pair before the shell starts.
    pub fn with_tokens(mut self, access: &str) -> Self {
        self.tokens = Some(TokenPair::new(access, REFRESH_TOKEN));
        self
    }

    pub fn with_user(mut self, user: frame_shell::models::UserSession) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub async fn start(self) -> TestShell {
        let (backend, base_url) = spawn_backend().await;
        self.start_against(backend, base_url)
    }

    pub fn start_against(self, backend: Arc<MockBackend>, base_url: String) -> TestShell {
        let storage = Arc::new(MemoryStorage::new());
        let credentials = CredentialStore::new(storage.clone() as Arc<dyn Storage>);
        if let Some(tokens) = &self.tokens {
            credentials.set_tokens(tokens);
        }
        if let Some(user) = &self.user {
            credentials.save_user(user);
        }

        let mut config = Config::test_default();
        config.api_base_url = base_url;
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }

        let state = AppState::new(config, storage.clone() as Arc<dyn Storage>)
            .expect("Failed to build shell state");

        TestShell {
            backend,
            storage,
            state: Arc::new(state),
        }
    }
}

/// A stored token the backend no longer accepts, though it has not expired.
#[allow(dead_code)]
pub fn stale_token() -> String {
    mint_token(TEST_USER_ID, TEST_EMAIL, Some("TEACHER"), 3600)
}

/// Parse a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

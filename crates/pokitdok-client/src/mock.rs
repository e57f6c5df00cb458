//! In-process stand-in for the platform, used by the client tests.
//!
//! Issues tokens from `/oauth2/token`, rejects unknown bearer tokens with 401,
//! answers a handful of API routes with canned envelopes, and echoes
//! everything else back as JSON.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const MOCK_CLIENT_ID: &str = "mock-client";
pub const MOCK_CLIENT_SECRET: &str = "mock-secret";

#[derive(Default)]
struct PlatformState {
    issued: AtomicUsize,
    valid_tokens: Mutex<HashSet<String>>,
    activities: AtomicUsize,
    /// activity id -> cancelled
    cancelled: Mutex<HashMap<String, bool>>,
}

pub struct MockPlatform {
    pub url: String,
    state: Arc<PlatformState>,
}

impl MockPlatform {
    pub fn tokens_issued(&self) -> usize {
        self.state.issued.load(Ordering::SeqCst)
    }
}

pub async fn start_mock_platform() -> MockPlatform {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let state = Arc::new(PlatformState::default());

    let app = Router::new()
        .route("/oauth2/token", post(issue_token))
        .route("/api/v4/eligibility/", post(eligibility))
        .route("/api/v4/claims/", post(claims))
        .route("/api/v4/activities/{id}", get(activity).put(transition))
        .route(
            "/api/v4/schedule/appointments/{uuid}",
            delete(cancel_appointment).fallback(echo),
        )
        .fallback(echo)
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockPlatform { url, state }
}

fn envelope(status: StatusCode, meta: Value, data: Value) -> Response {
    (status, Json(json!({"meta": meta, "data": data}))).into_response()
}

fn unauthorized() -> Response {
    envelope(
        StatusCode::UNAUTHORIZED,
        json!({}),
        json!({"errors": {"authorization": "invalid or expired access token"}}),
    )
}

fn authorized(state: &PlatformState, headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| state.valid_tokens.lock().unwrap().contains(token))
}

async fn issue_token(State(state): State<Arc<PlatformState>>, headers: HeaderMap) -> Response {
    let expected = format!(
        "Basic {}",
        STANDARD.encode(format!("{MOCK_CLIENT_ID}:{MOCK_CLIENT_SECRET}"))
    );
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != expected {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client"})),
        )
            .into_response();
    }

    let n = state.issued.fetch_add(1, Ordering::SeqCst);
    let token = format!("token-{n}");
    state.valid_tokens.lock().unwrap().insert(token.clone());
    Json(json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 3600,
    }))
    .into_response()
}

async fn eligibility(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let Some(fields) = request.as_object() else {
        return envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({}),
            json!({"errors": {"validation": {"__all__": ["Request body must be an object"]}}}),
        );
    };
    match fields.get("trading_partner_id").and_then(Value::as_str) {
        None => envelope(
            StatusCode::BAD_REQUEST,
            json!({}),
            json!({"errors": {"query": "Unable to find configuration for trading_partner_id: None"}}),
        ),
        Some(partner) => envelope(
            StatusCode::OK,
            json!({"application_mode": "test", "processing": false}),
            json!({
                "valid_request": true,
                "payer": {"id": partner},
                "coverage": {"active": true},
            }),
        ),
    }
}

async fn claims(State(state): State<Arc<PlatformState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let n = state.activities.fetch_add(1, Ordering::SeqCst);
    let id = format!("activity-{n}");
    state.cancelled.lock().unwrap().insert(id.clone(), false);
    envelope(
        StatusCode::OK,
        json!({"activity_id": id}),
        json!({"id": id, "state": {"name": "init"}, "units_of_work": 1}),
    )
}

async fn activity(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    match state.cancelled.lock().unwrap().get(&id) {
        Some(_) => envelope(StatusCode::OK, json!({}), json!({"id": id})),
        None => envelope(
            StatusCode::NOT_FOUND,
            json!({}),
            json!({"errors": {"query": "activity not found"}}),
        ),
    }
}

async fn transition(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let mut cancelled = state.cancelled.lock().unwrap();
    match cancelled.get_mut(&id) {
        None => envelope(
            StatusCode::NOT_FOUND,
            json!({}),
            json!({"errors": {"query": "activity not found"}}),
        ),
        Some(done) if *done => envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({}),
            json!({"errors": {"request": "Attempted to process an invalid transition from canceled"}}),
        ),
        Some(done) => {
            *done = true;
            envelope(
                StatusCode::OK,
                json!({"activity_id": id}),
                json!({
                    "id": id,
                    "history": [
                        {"name": "init"},
                        {"name": "scheduled"},
                        {"name": "canceled"},
                    ],
                }),
            )
        }
    }
}

async fn cancel_appointment(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(_uuid): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn echo(State(state): State<Arc<PlatformState>>, request: Request<Body>) -> Response {
    if !authorized(&state, request.headers()) {
        return unauthorized();
    }
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();
    let content_type = request
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
        .await
        .unwrap();
    Json(json!({
        "method": method,
        "path": path,
        "query": query,
        "content_type": content_type,
        "body": String::from_utf8_lossy(&body),
    }))
    .into_response()
}

//! HttpBackend against an in-process stand-in for the chat backend.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use intellisphere_config::ServerConfig;
use intellisphere_core::{
    AccountClient, ClientError, HttpBackend, KeyValueStore, MemoryStore, SessionService,
};
use intellisphere_protocol::{Domain, Message, SessionId};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

const COOKIE: &str = "session=test-cookie";

#[derive(Clone, Default)]
struct Backend {
    histories: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

fn logged_in(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(COOKIE))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Please log in to continue" })),
    )
        .into_response()
}

fn session_key(body: &Value) -> String {
    format!(
        "{}:{}",
        body["domain"].as_str().unwrap_or_default(),
        body["session_id"].as_str().unwrap_or_default()
    )
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "correct horse" {
        (
            [(header::SET_COOKIE, format!("{COOKIE}; Path=/"))],
            Json(json!({ "success": true, "message": "Login successful!" })),
        )
            .into_response()
    } else {
        Json(json!({ "success": false, "message": "Invalid email or password." })).into_response()
    }
}

async fn logout() -> Response {
    Json(json!({ "message": "Logged out successfully!" })).into_response()
}

async fn create(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !logged_in(&headers) {
        return unauthorized();
    }
    backend
        .histories
        .lock()
        .insert(session_key(&body), Vec::new());
    Json(json!({ "success": true, "session_id": body["session_id"] })).into_response()
}

async fn history(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !logged_in(&headers) {
        return unauthorized();
    }
    if body["session_id"] == "garbled" {
        return (StatusCode::OK, "<html>oops</html>").into_response();
    }
    match backend.histories.lock().get(&session_key(&body)) {
        Some(history) => Json(json!({ "history": history })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Session not found" })))
            .into_response(),
    }
}

async fn delete(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !logged_in(&headers) {
        return unauthorized();
    }
    backend.histories.lock().remove(&session_key(&body));
    Json(json!({ "success": true })).into_response()
}

async fn chat(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !logged_in(&headers) {
        return unauthorized();
    }
    let query = body["query"].as_str().unwrap_or_default().to_string();
    if query == "explode" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Error processing query: boom" })),
        )
            .into_response();
    }
    let mut histories = backend.histories.lock();
    let history = histories.entry(session_key(&body)).or_default();
    history.push(json!({ "user": query, "bot": format!("**answer** to {query}") }));
    Json(json!({ "history": history.clone() })).into_response()
}

async fn spawn_backend() -> ServerConfig {
    let app = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/create_new_session", post(create))
        .route("/get_session_history", post(history))
        .route("/delete_session", post(delete))
        .route("/chat", post(chat))
        .with_state(Backend::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    ServerConfig {
        base_url: format!("http://{addr}/"),
        timeout_secs: 10,
    }
}

async fn logged_in_backend() -> HttpBackend {
    let backend = HttpBackend::new(&spawn_backend().await).expect("backend");
    let accounts = AccountClient::new(Arc::new(backend.clone()), Arc::new(MemoryStore::new()));
    accounts
        .login("ada@example.com", "correct horse")
        .await
        .expect("login");
    backend
}

#[tokio::test]
async fn session_round_trip_uses_login_cookie() {
    let backend = logged_in_backend().await;
    let id = SessionId::new("1700000000000_abc123");

    backend
        .create_session(Domain::Law, &id)
        .await
        .expect("create");
    assert!(
        backend
            .fetch_history(Domain::Law, &id)
            .await
            .expect("history")
            .is_empty()
    );

    let history = backend
        .chat(Domain::Law, &id, "what is tort?")
        .await
        .expect("chat");
    assert_eq!(
        history,
        vec![Message::exchange(
            "what is tort?",
            "**answer** to what is tort?"
        )]
    );
    assert_eq!(
        backend.fetch_history(Domain::Law, &id).await.expect("history"),
        history
    );

    backend
        .delete_session(Domain::Law, &id)
        .await
        .expect("delete");
}

#[tokio::test]
async fn calls_without_login_surface_backend_error() {
    let backend = HttpBackend::new(&spawn_backend().await).expect("backend");
    let err = backend
        .create_session(Domain::Health, &SessionId::new("1_a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Service(ref text) if text == "Please log in to continue"));
}

#[tokio::test]
async fn unknown_session_history_is_empty() {
    let backend = logged_in_backend().await;
    let history = backend
        .fetch_history(Domain::Health, &SessionId::new("never-created"))
        .await
        .expect("history");
    assert!(history.is_empty());
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
    let backend = logged_in_backend().await;
    let err = backend
        .fetch_history(Domain::Health, &SessionId::new("garbled"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::MalformedResponse { ref endpoint, .. } if endpoint == "/get_session_history")
    );
}

#[tokio::test]
async fn chat_error_body_wins_over_status() {
    let backend = logged_in_backend().await;
    let err = backend
        .chat(Domain::Finance, &SessionId::new("1_a"), "explode")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Service(ref text) if text == "Error processing query: boom"));
}

#[tokio::test]
async fn login_and_logout_track_recorded_user() {
    let backend = HttpBackend::new(&spawn_backend().await).expect("backend");
    let store = Arc::new(MemoryStore::new());
    let accounts = AccountClient::new(Arc::new(backend), store.clone());

    let err = accounts
        .login("ada@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Service(ref text) if text == "Invalid email or password."));
    assert_eq!(accounts.status().expect("status"), None);

    let message = accounts
        .login("ada@example.com", "correct horse")
        .await
        .expect("login");
    assert_eq!(message, "Login successful!");
    assert_eq!(
        accounts.status().expect("status"),
        Some("Welcome, ada@example.com!".to_string())
    );

    accounts.logout().await.expect("logout");
    assert_eq!(store.get("user").expect("get"), None);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let backend = HttpBackend::new(&ServerConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: 5,
    })
    .expect("backend");
    let err = backend
        .delete_session(Domain::Home, &SessionId::new("1_a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use storyfill_core::clock::Clock;
use storyfill_core::repository::SessionRepository;
use storyfill_core::rng::DeterministicRng;
use storyfill_core::types::ChatId;
use storyfill_game::application::command_handlers;
use storyfill_game::domain::commands::Tick;
use storyfill_game::domain::session::TickOutcome;
use storyfill_game::application::services::GameServices;
use storyfill_game::settings::GameSettings;
use storyfill_store::pg_session_repository::PgSessionRepository;
use storyfill_test_support::{FixedClock, InMemorySessionRepository, MockRng};
use tower::ServiceExt;
use uuid::Uuid;

use storyfill_api::outbox::RenderOutbox;
use storyfill_api::routes;
use storyfill_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// A two-second lobby whose timer never fires during a test, so tests
/// drive ticks themselves.
fn test_settings() -> GameSettings {
    let mut settings = GameSettings::new(2, 2, 24);
    settings.tick_interval = Duration::from_secs(3600);
    settings
}

/// Builds application state over `repo` with a deterministic clock and RNG.
pub fn build_test_state(repo: Arc<dyn SessionRepository>) -> AppState {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
    let outbox = Arc::new(RenderOutbox::new());
    let services = GameServices::new(repo, outbox.clone(), rng, fixed_clock(), test_settings());
    AppState::new(Arc::new(services), outbox)
}

/// State backed by the in-memory repository.
pub fn in_memory_state() -> AppState {
    build_test_state(Arc::new(InMemorySessionRepository::new()))
}

/// State backed by a real `PgSessionRepository`.
pub fn postgres_state(pool: PgPool) -> AppState {
    build_test_state(Arc::new(PgSessionRepository::new(pool)))
}

/// The full app router, with the same route structure as `main.rs`.
pub fn build_test_app(state: &AppState) -> Router {
    routes::build_router(state.clone())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Delivers one countdown tick, as the lobby timer would.
pub async fn tick(state: &AppState, chat_id: ChatId) -> TickOutcome {
    let command = Tick {
        correlation_id: Uuid::new_v4(),
        chat_id,
    };
    command_handlers::handle_tick(&command, &state.services)
        .await
        .unwrap()
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

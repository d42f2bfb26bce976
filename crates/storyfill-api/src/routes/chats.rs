//! Routes that drive one chat's game.
//!
//! A chat gateway posts player actions here and drains the chat's
//! outbox to learn what to display.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use storyfill_core::types::{ChatId, PlayerId};
use storyfill_game::application::query_handlers::{self, SessionView};
use storyfill_game::application::command_handlers;
use storyfill_game::domain::commands;
use storyfill_game::domain::session::AnswerOutcome;
use storyfill_game::domain::text::sanitize_display_name;

use crate::error::ApiError;
use crate::outbox::OutboundRender;
use crate::state::AppState;

/// Request body for POST /{chat_id}/join.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// External identity of the joining player.
    pub player_id: PlayerId,
    /// Profile first name.
    pub first_name: Option<String>,
    /// Profile last name.
    pub last_name: Option<String>,
}

/// Request body for POST /{chat_id}/answer.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// Player pressing the button.
    pub player_id: PlayerId,
    /// Question the button belongs to.
    pub question_index: usize,
    /// Position of the pressed option.
    pub option_index: usize,
}

/// Response body for POST /{chat_id}/lobby.
#[derive(Debug, Serialize)]
pub struct LobbyResponse {
    /// Identifier of the new session.
    pub session_id: Uuid,
}

/// Response body for POST /{chat_id}/join.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    /// Players in the lobby after this join.
    pub player_count: usize,
}

/// Response body for POST /{chat_id}/answer.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnswerResponse {
    /// Another question is open.
    NextQuestion {
        /// Index of the open question.
        question_index: usize,
    },
    /// The story is complete and the session is gone.
    Completed {
        /// The assembled story.
        sentence: String,
    },
}

impl From<AnswerOutcome> for AnswerResponse {
    fn from(outcome: AnswerOutcome) -> Self {
        match outcome {
            AnswerOutcome::NextQuestion { question_index } => Self::NextQuestion { question_index },
            AnswerOutcome::Completed { sentence } => Self::Completed { sentence },
        }
    }
}

/// Response body for GET /{chat_id}/renders.
#[derive(Debug, Serialize)]
pub struct RendersResponse {
    /// Queued renders, oldest first.
    pub renders: Vec<OutboundRender>,
}

/// POST /{chat_id}/lobby
#[instrument(skip(state))]
async fn start_lobby(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<LobbyResponse>, ApiError> {
    let command = commands::StartLobby {
        correlation_id: Uuid::new_v4(),
        chat_id,
    };

    info!(correlation_id = %command.correlation_id, "handling start_lobby command");

    let session_id = command_handlers::handle_start_lobby(&command, &state.services).await?;

    Ok(Json(LobbyResponse { session_id }))
}

/// POST /{chat_id}/join
#[instrument(skip(state, request), fields(player_id = request.player_id))]
async fn join(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let command = commands::JoinGame {
        correlation_id: Uuid::new_v4(),
        chat_id,
        player_id: request.player_id,
        display_name: sanitize_display_name(
            request.first_name.as_deref(),
            request.last_name.as_deref(),
        ),
    };

    info!(correlation_id = %command.correlation_id, "handling join command");

    let player_count = command_handlers::handle_join(&command, &state.services).await?;

    Ok(Json(JoinResponse { player_count }))
}

/// POST /{chat_id}/answer
#[instrument(
    skip(state, request),
    fields(player_id = request.player_id, question_index = request.question_index)
)]
async fn answer(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let command = commands::SubmitAnswer {
        correlation_id: Uuid::new_v4(),
        chat_id,
        submitter_id: request.player_id,
        question_index: request.question_index,
        option_index: request.option_index,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_answer command");

    let outcome = command_handlers::handle_answer(&command, &state.services).await?;

    Ok(Json(outcome.into()))
}

/// DELETE /{chat_id}
#[instrument(skip(state))]
async fn cancel(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> Result<StatusCode, ApiError> {
    let command = commands::CancelGame {
        correlation_id: Uuid::new_v4(),
        chat_id,
    };

    info!(correlation_id = %command.correlation_id, "handling cancel command");

    command_handlers::handle_cancel(&command, &state.services).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /{chat_id}
async fn get_session(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<SessionView>, ApiError> {
    let view = query_handlers::get_session_view(chat_id, &state.services).await?;
    Ok(Json(view))
}

/// GET /{chat_id}/renders
async fn drain_renders(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> Json<RendersResponse> {
    Json(RendersResponse {
        renders: state.outbox.drain(chat_id),
    })
}

/// Returns the router for chat-scoped game routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{chat_id}", get(get_session).delete(cancel))
        .route("/{chat_id}/lobby", post(start_lobby))
        .route("/{chat_id}/join", post(join))
        .route("/{chat_id}/answer", post(answer))
        .route("/{chat_id}/renders", get(drain_renders))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use storyfill_core::clock::Clock;
    use storyfill_core::repository::SessionRepository;
    use storyfill_core::rng::DeterministicRng;
    use storyfill_game::application::services::GameServices;
    use storyfill_game::settings::GameSettings;
    use storyfill_test_support::{
        FailingSessionRepository, FixedClock, InMemorySessionRepository, MockRng,
    };
    use tower::ServiceExt;

    use crate::outbox::RenderOutbox;

    const CHAT: ChatId = -100;

    fn app_state_with(repo: Arc<dyn SessionRepository>) -> AppState {
        let outbox = Arc::new(RenderOutbox::new());
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));
        let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
        let mut settings = GameSettings::new(2, 2, 24);
        settings.tick_interval = Duration::from_secs(3600);
        let services = GameServices::new(repo, outbox.clone(), rng, clock, settings);
        AppState::new(Arc::new(services), outbox)
    }

    fn test_app_state() -> AppState {
        app_state_with(Arc::new(InMemorySessionRepository::new()))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn join_players(state: &AppState, count: i64) {
        for player_id in 1..=count {
            let (status, _) = send(
                router().with_state(state.clone()),
                "POST",
                &format!("/{CHAT}/join"),
                Some(json!({ "player_id": player_id, "first_name": format!("P{player_id}") })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_start_lobby_returns_session_id_and_queues_lobby_render() {
        // Arrange
        let state = test_app_state();
        let app = router().with_state(state.clone());

        // Act
        let (status, json) = send(app, "POST", &format!("/{CHAT}/lobby"), None).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert!(json["session_id"].is_string());
        let renders = state.outbox.drain(CHAT);
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].render.kind(), "lobby_progress");
        assert!(!renders[0].edits);
    }

    #[tokio::test]
    async fn test_second_lobby_returns_409_with_notice() {
        // Arrange
        let state = test_app_state();
        send(router().with_state(state.clone()), "POST", &format!("/{CHAT}/lobby"), None).await;

        // Act
        let (status, json) = send(
            router().with_state(state),
            "POST",
            &format!("/{CHAT}/lobby"),
            None,
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "rejected");
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn test_join_sanitizes_name_and_edits_lobby() {
        // Arrange
        let state = test_app_state();
        send(router().with_state(state.clone()), "POST", &format!("/{CHAT}/lobby"), None).await;
        let lobby_anchor = state.outbox.drain(CHAT)[0].message_id;

        // Act
        let (status, json) = send(
            router().with_state(state.clone()),
            "POST",
            &format!("/{CHAT}/join"),
            Some(json!({ "player_id": 7, "first_name": "  Aung ", "last_name": "Kyaw" })),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["player_count"], 1);
        let renders = state.outbox.drain(CHAT);
        assert_eq!(renders.len(), 1);
        assert!(renders[0].edits);
        assert_eq!(renders[0].message_id, lobby_anchor);
        let (_, view) = send(router().with_state(state), "GET", &format!("/{CHAT}"), None).await;
        assert_eq!(view["players"][0]["display_name"], "Aung Kyaw");
    }

    #[tokio::test]
    async fn test_join_without_lobby_returns_409() {
        let app = router().with_state(test_app_state());

        let (status, json) = send(
            app,
            "POST",
            &format!("/{CHAT}/join"),
            Some(json!({ "player_id": 1, "first_name": "A" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "rejected");
    }

    #[tokio::test]
    async fn test_join_with_missing_player_id_returns_422() {
        let app = router().with_state(test_app_state());

        let (status, _) = send(
            app,
            "POST",
            &format!("/{CHAT}/join"),
            Some(json!({ "first_name": "A" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_answer_without_game_returns_409() {
        let app = router().with_state(test_app_state());

        let (status, json) = send(
            app,
            "POST",
            &format!("/{CHAT}/answer"),
            Some(json!({ "player_id": 1, "question_index": 0, "option_index": 0 })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], storyfill_core::error::Rejection::NoGame.notice());
    }

    #[tokio::test]
    async fn test_get_missing_session_returns_404() {
        let app = router().with_state(test_app_state());

        let (status, json) = send(app, "GET", &format!("/{CHAT}"), None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "session_not_found");
    }

    #[tokio::test]
    async fn test_get_lobby_session_view() {
        // Arrange
        let state = test_app_state();
        send(router().with_state(state.clone()), "POST", &format!("/{CHAT}/lobby"), None).await;
        join_players(&state, 2).await;

        // Act
        let (status, json) = send(router().with_state(state), "GET", &format!("/{CHAT}"), None).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["chat_id"], CHAT);
        assert_eq!(json["status"], "countdown");
        assert_eq!(json["players"].as_array().unwrap().len(), 2);
        assert_eq!(json["countdown_remaining"], 2);
    }

    #[tokio::test]
    async fn test_cancel_returns_204_and_removes_session() {
        // Arrange
        let state = test_app_state();
        send(router().with_state(state.clone()), "POST", &format!("/{CHAT}/lobby"), None).await;
        state.outbox.drain(CHAT);

        // Act
        let (status, _) = send(router().with_state(state.clone()), "DELETE", &format!("/{CHAT}"), None).await;

        // Assert
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!state.services.countdowns.is_armed(CHAT));
        let renders = state.outbox.drain(CHAT);
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].render.kind(), "lobby_aborted");
        let (status, _) = send(router().with_state(state), "GET", &format!("/{CHAT}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_missing_session_returns_404() {
        let app = router().with_state(test_app_state());

        let (status, _) = send(app, "DELETE", &format!("/{CHAT}"), None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_renders_drain_returns_queue_once() {
        // Arrange
        let state = test_app_state();
        send(router().with_state(state.clone()), "POST", &format!("/{CHAT}/lobby"), None).await;

        // Act
        let (status, first) =
            send(router().with_state(state.clone()), "GET", &format!("/{CHAT}/renders"), None).await;
        let (_, second) = send(router().with_state(state), "GET", &format!("/{CHAT}/renders"), None).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["renders"].as_array().unwrap().len(), 1);
        assert_eq!(first["renders"][0]["render"]["type"], "lobby_progress");
        assert!(second["renders"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_lobby_returns_500_on_storage_failure() {
        let app = router().with_state(app_state_with(Arc::new(FailingSessionRepository)));

        let (status, json) = send(app, "POST", &format!("/{CHAT}/lobby"), None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "infrastructure_error");
    }
}

//! Read-only queries over sessions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyfill_core::error::DomainError;
use storyfill_core::render::RecapEntry;
use storyfill_core::types::{ChatId, PlayerId};
use uuid::Uuid;

use crate::application::services::GameServices;
use crate::domain::session::SessionStatus;

/// One player as shown in a session view.
#[derive(Debug, Serialize)]
pub struct PlayerView {
    /// External identity.
    pub player_id: PlayerId,
    /// Display name.
    pub display_name: String,
    /// Zero-based turn position, once the game started.
    pub turn_order: Option<u32>,
}

/// Read-only view of a session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Store-assigned identifier.
    pub session_id: Uuid,
    /// Hosting chat.
    pub chat_id: ChatId,
    /// Lifecycle phase.
    pub status: SessionStatus,
    /// Players in join order (lobby) or turn order (started).
    pub players: Vec<PlayerView>,
    /// Seconds left on the lobby countdown; `None` once started.
    pub countdown_remaining: Option<i32>,
    /// Zero-based index of the open question.
    pub current_question_index: usize,
    /// Number of questions in the plan.
    pub question_count: usize,
    /// Player who must answer the open question.
    pub turn_owner: Option<PlayerId>,
    /// Answers given so far, in plan order.
    pub recap: Vec<RecapEntry>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

/// Retrieves the session hosted by `chat_id`.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the chat has no session, or
/// `DomainError::Infrastructure` on storage failure.
pub async fn get_session_view(
    chat_id: ChatId,
    services: &GameServices,
) -> Result<SessionView, DomainError> {
    let session = services
        .store
        .load(chat_id)
        .await?
        .ok_or(DomainError::SessionNotFound(chat_id))?;

    Ok(SessionView {
        session_id: session.session_id,
        chat_id,
        status: session.status(),
        players: session
            .players()
            .iter()
            .map(|p| PlayerView {
                player_id: p.id,
                display_name: p.display_name.clone(),
                turn_order: p.turn_order,
            })
            .collect(),
        countdown_remaining: session
            .status()
            .accepts_joins()
            .then(|| session.countdown_remaining()),
        current_question_index: session.current_question_index(),
        question_count: session.question_plan().len(),
        turn_owner: session.turn_owner().map(|p| p.id),
        recap: session.recap(),
        created_at: session.created_at(),
        updated_at: session.updated_at(),
    })
}

/// Counts sessions currently stored.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` on storage failure.
pub async fn count_active_sessions(services: &GameServices) -> Result<u64, DomainError> {
    services.store.count_active().await
}

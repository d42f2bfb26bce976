//! Session persistence contract.
//!
//! The game engine owns the shape of a session; implementations of
//! [`SessionRepository`] only move these rows in and out of a durable
//! store. Every operation is keyed by chat id or by the store-assigned
//! session id.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::types::{ChatId, PlayerId, RenderAnchor};

/// Status names under which a session still accepts joins.
pub const OPEN_LOBBY_STATUSES: [&str; 2] = ["lobby", "countdown"];

/// Stored representation of a session header plus its child rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    /// Store-assigned session identifier.
    pub session_id: Uuid,
    /// Chat hosting the session (unique).
    pub chat_id: ChatId,
    /// Lifecycle status name.
    pub status: String,
    /// Ordered question identifiers; empty until the game starts.
    pub question_plan: Vec<String>,
    /// Index of the question currently being asked.
    pub current_question_index: i32,
    /// Options offered for the current question.
    pub current_options: Vec<String>,
    /// Seconds left on the lobby countdown.
    pub countdown_remaining: i32,
    /// Handle of the last lobby/progress message.
    pub render_anchor: Option<RenderAnchor>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session header was last written.
    pub updated_at: DateTime<Utc>,
    /// Players ordered by `turn_order`, falling back to `join_order`.
    /// Populated by `load_session`; ignored by `save_session`.
    pub players: Vec<StoredPlayer>,
    /// Answers ordered by question index.
    /// Populated by `load_session`; ignored by `save_session`.
    pub answers: Vec<StoredAnswer>,
}

/// Stored representation of a player row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPlayer {
    /// External player identity.
    pub player_id: PlayerId,
    /// Sanitized display name.
    pub display_name: String,
    /// Zero-based join position.
    pub join_order: i32,
    /// Zero-based turn position, assigned at game start.
    pub turn_order: Option<i32>,
}

/// Stored representation of an answer row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAnswer {
    /// Zero-based question index.
    pub question_index: i32,
    /// Question identifier name.
    pub question_id: String,
    /// Player who answered.
    pub player_id: PlayerId,
    /// Resolved answer text.
    pub value: String,
}

/// One child-row write carried by [`SessionRepository::commit_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredChange {
    /// Insert a player row unless present.
    AddPlayer(StoredPlayer),
    /// Persist a turn order; `turn_order[i]` plays position `i`.
    AssignTurnOrder(Vec<PlayerId>),
    /// Upsert an answer row.
    RecordAnswer(StoredAnswer),
    /// Add a value to a used pool.
    MarkUsed {
        /// Pool name.
        category: String,
        /// Value entering the pool.
        value: String,
    },
}

/// Result of inserting a player row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPlayerOutcome {
    /// The player row was inserted.
    Added,
    /// The player was already part of the session.
    AlreadyExists,
}

/// Repository trait for the durable side of the session store.
///
/// Implementations must provide read-your-writes consistency for the
/// operations of a single session.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Creates an empty session row for `chat_id` and returns its id.
    ///
    /// Fails with `DomainError::SessionExists` if the chat already has one.
    async fn create_session(
        &self,
        chat_id: ChatId,
        created_at: DateTime<Utc>,
    ) -> Result<Uuid, DomainError>;

    /// Loads the session for `chat_id`, if any.
    async fn load_session(&self, chat_id: ChatId) -> Result<Option<StoredSession>, DomainError>;

    /// Writes the header fields of an existing session.
    async fn save_session(&self, session: &StoredSession) -> Result<(), DomainError>;

    /// Applies `changes` in order and then writes the header, as one
    /// atomic unit. On error none of it is durable.
    async fn commit_session(
        &self,
        session: &StoredSession,
        changes: &[StoredChange],
    ) -> Result<(), DomainError>;

    /// Inserts a player row unless the player already joined.
    async fn add_player(
        &self,
        session_id: Uuid,
        player_id: PlayerId,
        display_name: &str,
        join_order: i32,
    ) -> Result<AddPlayerOutcome, DomainError>;

    /// Persists a turn order (`turn_order[i]` plays position `i`) and
    /// returns the players in their new order.
    async fn assign_turn_order(
        &self,
        session_id: Uuid,
        turn_order: &[PlayerId],
    ) -> Result<Vec<StoredPlayer>, DomainError>;

    /// Upserts the answer for `(session_id, answer.question_index)`.
    async fn record_answer(&self, session_id: Uuid, answer: &StoredAnswer)
    -> Result<(), DomainError>;

    /// Adds `value` to the used pool named `category`.
    async fn mark_used(&self, session_id: Uuid, category: &str, value: &str)
    -> Result<(), DomainError>;

    /// Lists the used pool named `category`.
    async fn list_used(&self, session_id: Uuid, category: &str)
    -> Result<BTreeSet<String>, DomainError>;

    /// Deletes the session for `chat_id` with all child rows.
    /// Returns `false` if there was nothing to delete.
    async fn delete_session(&self, chat_id: ChatId) -> Result<bool, DomainError>;

    /// Counts sessions currently stored.
    async fn count_active_sessions(&self) -> Result<u64, DomainError>;

    /// Lists chats whose session is still accepting joins.
    async fn list_open_lobbies(&self) -> Result<Vec<ChatId>, DomainError>;

    /// Deletes sessions last updated before `before` and returns their chats.
    async fn delete_stale_sessions(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<ChatId>, DomainError>;
}

//! `PostgreSQL` implementation of the `SessionRepository` trait.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use storyfill_core::error::DomainError;
use storyfill_core::repository::{
    AddPlayerOutcome, OPEN_LOBBY_STATUSES, SessionRepository, StoredAnswer, StoredChange,
    StoredPlayer, StoredSession,
};
use storyfill_core::types::{ChatId, PlayerId, RenderAnchor};

/// PostgreSQL-backed session repository.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Creates a new `PgSessionRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_players(&self, session_id: Uuid) -> Result<Vec<StoredPlayer>, DomainError> {
        let rows: Vec<(PlayerId, String, i32, Option<i32>)> = sqlx::query_as(
            r"
            SELECT player_id, display_name, join_order, turn_order
            FROM game_players
            WHERE session_id = $1
            ORDER BY COALESCE(turn_order, join_order), join_order
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(rows
            .into_iter()
            .map(|(player_id, display_name, join_order, turn_order)| StoredPlayer {
                player_id,
                display_name,
                join_order,
                turn_order,
            })
            .collect())
    }

    async fn load_answers(&self, session_id: Uuid) -> Result<Vec<StoredAnswer>, DomainError> {
        let rows: Vec<(i32, String, PlayerId, String)> = sqlx::query_as(
            r"
            SELECT question_index, question_id, player_id, value
            FROM game_answers
            WHERE session_id = $1
            ORDER BY question_index
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(rows
            .into_iter()
            .map(|(question_index, question_id, player_id, value)| StoredAnswer {
                question_index,
                question_id,
                player_id,
                value,
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    chat_id: ChatId,
    status: String,
    question_plan: Vec<String>,
    current_question_index: i32,
    current_options: Vec<String>,
    countdown_remaining: i32,
    render_anchor: Option<RenderAnchor>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn infrastructure(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {e}"))
}

async fn write_header<'e, E>(executor: E, session: &StoredSession) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r"
        UPDATE game_sessions SET
            status = $2,
            question_plan = $3,
            current_question_index = $4,
            current_options = $5,
            countdown_remaining = $6,
            render_anchor = $7,
            updated_at = $8
        WHERE session_id = $1
        ",
    )
    .bind(session.session_id)
    .bind(&session.status)
    .bind(&session.question_plan)
    .bind(session.current_question_index)
    .bind(&session.current_options)
    .bind(session.countdown_remaining)
    .bind(session.render_anchor)
    .bind(session.updated_at)
    .execute(executor)
    .await
    .map_err(infrastructure)?;

    if result.rows_affected() == 0 {
        return Err(DomainError::Infrastructure(format!(
            "session {} no longer exists",
            session.session_id
        )));
    }
    Ok(())
}

async fn insert_player<'e, E>(
    executor: E,
    session_id: Uuid,
    player: &StoredPlayer,
) -> Result<AddPlayerOutcome, DomainError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r"
        INSERT INTO game_players (session_id, player_id, display_name, join_order)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (session_id, player_id) DO NOTHING
        ",
    )
    .bind(session_id)
    .bind(player.player_id)
    .bind(&player.display_name)
    .bind(player.join_order)
    .execute(executor)
    .await
    .map_err(infrastructure)?;

    Ok(if result.rows_affected() == 0 {
        AddPlayerOutcome::AlreadyExists
    } else {
        AddPlayerOutcome::Added
    })
}

async fn update_turn_order<'e, E>(
    executor: E,
    session_id: Uuid,
    turn_order: &[PlayerId],
) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r"
        UPDATE game_players AS p
        SET turn_order = (o.position - 1)::INTEGER
        FROM UNNEST($2::BIGINT[]) WITH ORDINALITY AS o(player_id, position)
        WHERE p.session_id = $1 AND p.player_id = o.player_id
        ",
    )
    .bind(session_id)
    .bind(turn_order)
    .execute(executor)
    .await
    .map_err(infrastructure)?;
    Ok(())
}

async fn upsert_answer<'e, E>(
    executor: E,
    session_id: Uuid,
    answer: &StoredAnswer,
) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO game_answers (session_id, question_index, question_id, player_id, value)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (session_id, question_index) DO UPDATE SET
            question_id = EXCLUDED.question_id,
            player_id = EXCLUDED.player_id,
            value = EXCLUDED.value
        ",
    )
    .bind(session_id)
    .bind(answer.question_index)
    .bind(&answer.question_id)
    .bind(answer.player_id)
    .bind(&answer.value)
    .execute(executor)
    .await
    .map_err(infrastructure)?;
    Ok(())
}

async fn insert_used<'e, E>(
    executor: E,
    session_id: Uuid,
    category: &str,
    value: &str,
) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO game_used_values (session_id, category, value)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(session_id)
    .bind(category)
    .bind(value)
    .execute(executor)
    .await
    .map_err(infrastructure)?;
    Ok(())
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create_session(
        &self,
        chat_id: ChatId,
        created_at: DateTime<Utc>,
    ) -> Result<Uuid, DomainError> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r"
            INSERT INTO game_sessions (session_id, chat_id, status, created_at, updated_at)
            VALUES ($1, $2, 'lobby', $3, $3)
            ON CONFLICT (chat_id) DO NOTHING
            RETURNING session_id
            ",
        )
        .bind(Uuid::now_v7())
        .bind(chat_id)
        .bind(created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        inserted.ok_or(DomainError::SessionExists(chat_id))
    }

    async fn load_session(&self, chat_id: ChatId) -> Result<Option<StoredSession>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r"
            SELECT session_id, chat_id, status, question_plan, current_question_index,
                   current_options, countdown_remaining, render_anchor, created_at, updated_at
            FROM game_sessions
            WHERE chat_id = $1
            ",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let players = self.load_players(row.session_id).await?;
        let answers = self.load_answers(row.session_id).await?;
        debug!(chat_id, players = players.len(), answers = answers.len(), "session rows loaded");

        Ok(Some(StoredSession {
            session_id: row.session_id,
            chat_id: row.chat_id,
            status: row.status,
            question_plan: row.question_plan,
            current_question_index: row.current_question_index,
            current_options: row.current_options,
            countdown_remaining: row.countdown_remaining,
            render_anchor: row.render_anchor,
            created_at: row.created_at,
            updated_at: row.updated_at,
            players,
            answers,
        }))
    }

    async fn save_session(&self, session: &StoredSession) -> Result<(), DomainError> {
        write_header(&self.pool, session).await
    }

    async fn commit_session(
        &self,
        session: &StoredSession,
        changes: &[StoredChange],
    ) -> Result<(), DomainError> {
        let session_id = session.session_id;
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        for change in changes {
            match change {
                StoredChange::AddPlayer(player) => {
                    if insert_player(&mut *tx, session_id, player).await?
                        == AddPlayerOutcome::AlreadyExists
                    {
                        debug!(%session_id, player_id = player.player_id, "player row already present");
                    }
                }
                StoredChange::AssignTurnOrder(turn_order) => {
                    update_turn_order(&mut *tx, session_id, turn_order).await?;
                }
                StoredChange::RecordAnswer(answer) => {
                    upsert_answer(&mut *tx, session_id, answer).await?;
                }
                StoredChange::MarkUsed { category, value } => {
                    insert_used(&mut *tx, session_id, category, value).await?;
                }
            }
        }
        write_header(&mut *tx, session).await?;
        tx.commit().await.map_err(infrastructure)
    }

    async fn add_player(
        &self,
        session_id: Uuid,
        player_id: PlayerId,
        display_name: &str,
        join_order: i32,
    ) -> Result<AddPlayerOutcome, DomainError> {
        let player = StoredPlayer {
            player_id,
            display_name: display_name.to_owned(),
            join_order,
            turn_order: None,
        };
        insert_player(&self.pool, session_id, &player).await
    }

    async fn assign_turn_order(
        &self,
        session_id: Uuid,
        turn_order: &[PlayerId],
    ) -> Result<Vec<StoredPlayer>, DomainError> {
        update_turn_order(&self.pool, session_id, turn_order).await?;
        self.load_players(session_id).await
    }

    async fn record_answer(
        &self,
        session_id: Uuid,
        answer: &StoredAnswer,
    ) -> Result<(), DomainError> {
        upsert_answer(&self.pool, session_id, answer).await
    }

    async fn mark_used(
        &self,
        session_id: Uuid,
        category: &str,
        value: &str,
    ) -> Result<(), DomainError> {
        insert_used(&self.pool, session_id, category, value).await
    }

    async fn list_used(
        &self,
        session_id: Uuid,
        category: &str,
    ) -> Result<BTreeSet<String>, DomainError> {
        let values: Vec<String> = sqlx::query_scalar(
            "SELECT value FROM game_used_values WHERE session_id = $1 AND category = $2",
        )
        .bind(session_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(values.into_iter().collect())
    }

    async fn delete_session(&self, chat_id: ChatId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM game_sessions WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_active_sessions(&self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM game_sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(infrastructure)?;
        u64::try_from(count)
            .map_err(|_| DomainError::Infrastructure(format!("negative session count: {count}")))
    }

    async fn list_open_lobbies(&self) -> Result<Vec<ChatId>, DomainError> {
        let statuses: Vec<String> = OPEN_LOBBY_STATUSES.iter().map(|s| (*s).to_owned()).collect();
        sqlx::query_scalar(
            "SELECT chat_id FROM game_sessions WHERE status = ANY($1) ORDER BY chat_id",
        )
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)
    }

    async fn delete_stale_sessions(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<ChatId>, DomainError> {
        let mut removed: Vec<ChatId> =
            sqlx::query_scalar("DELETE FROM game_sessions WHERE updated_at < $1 RETURNING chat_id")
                .bind(before)
                .fetch_all(&self.pool)
                .await
                .map_err(infrastructure)?;
        removed.sort_unstable();
        Ok(removed)
    }
}

//! Command handlers for the turn engine.
//!
//! Every handler follows the same pipeline under the chat's lock: load
//! the session, apply one transition, persist (or delete on a terminal
//! transition), then hand the queued renders to the transport. A
//! failed write aborts the command before anything is rendered.

use std::sync::Arc;

use storyfill_core::error::{DomainError, Rejection};
use storyfill_core::types::ChatId;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::countdown::start_countdown;
use crate::application::services::GameServices;
use crate::domain::commands::{CancelGame, JoinGame, StartLobby, SubmitAnswer, Tick};
use crate::domain::session::{AnswerOutcome, PendingRender, Session, TickOutcome};

/// Handles `StartLobby`: creates the session, renders the lobby, and
/// arms the countdown.
///
/// # Errors
///
/// Returns `DomainError::Rejected(GameAlreadyRunning)` if the chat
/// already hosts a session, or `DomainError::Infrastructure` on
/// storage failure.
#[instrument(skip(command, services), fields(chat_id = command.chat_id, correlation_id = %command.correlation_id))]
pub async fn handle_start_lobby(
    command: &StartLobby,
    services: &Arc<GameServices>,
) -> Result<Uuid, DomainError> {
    let chat_id = command.chat_id;
    let _chat_guard = services.store.lock_chat(chat_id).await;

    if services.store.load(chat_id).await?.is_some() {
        return Err(Rejection::GameAlreadyRunning.into());
    }
    let now = services.clock.now();
    let mut session = match services
        .store
        .create(chat_id, services.settings.countdown_seconds, now)
        .await
    {
        Err(DomainError::SessionExists(_)) => return Err(Rejection::GameAlreadyRunning.into()),
        created => created?,
    };

    session.begin_countdown();
    session.announce_lobby();
    let renders = session.take_pending_renders();
    if let Err(e) = services.store.commit(&mut session, now).await {
        if let Err(cleanup) = services.store.delete(chat_id).await {
            warn!(error = %cleanup, "failed to remove half-created session");
        }
        return Err(e);
    }

    info!(session_id = %session.session_id, "lobby opened");
    dispatch_renders(services, &mut session, renders).await;
    start_countdown(services, chat_id);
    Ok(session.session_id)
}

/// Handles `JoinGame` and returns the new player count.
///
/// # Errors
///
/// Returns `DomainError::Rejected` for a missing lobby, a started game,
/// a duplicate join, or a full lobby. Returns
/// `DomainError::Infrastructure` on storage failure.
#[instrument(skip(command, services), fields(chat_id = command.chat_id, player_id = command.player_id))]
pub async fn handle_join(
    command: &JoinGame,
    services: &Arc<GameServices>,
) -> Result<usize, DomainError> {
    let chat_id = command.chat_id;
    let _chat_guard = services.store.lock_chat(chat_id).await;

    let Some(mut session) = services.store.load(chat_id).await? else {
        return Err(Rejection::NoLobby.into());
    };
    let player_count = session.join(command.player_id, command.display_name.clone())?;
    let renders = session.take_pending_renders();
    services
        .store
        .commit(&mut session, services.clock.now())
        .await?;

    info!(player_count, "player joined");
    dispatch_renders(services, &mut session, renders).await;
    Ok(player_count)
}

/// Handles a countdown `Tick`.
///
/// A tick for a deleted or already started session is a no-op.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` on storage failure.
#[instrument(skip(command, services), fields(chat_id = command.chat_id))]
pub async fn handle_tick(
    command: &Tick,
    services: &Arc<GameServices>,
) -> Result<TickOutcome, DomainError> {
    let chat_id = command.chat_id;
    let _chat_guard = services.store.lock_chat(chat_id).await;

    let Some(mut session) = services.store.load(chat_id).await? else {
        debug!("tick for missing session ignored");
        return Ok(TickOutcome::Ignored);
    };
    let step = services.settings.tick_seconds;
    let outcome = services.with_rng(|rng| session.tick(step, rng))?;
    let renders = session.take_pending_renders();

    match outcome {
        TickOutcome::Ignored => return Ok(outcome),
        TickOutcome::Continue => {
            services
                .store
                .commit(&mut session, services.clock.now())
                .await?;
        }
        TickOutcome::Started => {
            services
                .store
                .commit(&mut session, services.clock.now())
                .await?;
            info!(
                player_count = session.players().len(),
                question_count = session.question_plan().len(),
                "game started"
            );
        }
        TickOutcome::Aborted => {
            services.store.delete(chat_id).await?;
            info!(player_count = session.players().len(), "lobby aborted");
        }
    }

    dispatch_renders(services, &mut session, renders).await;
    Ok(outcome)
}

/// Handles `SubmitAnswer`.
///
/// # Errors
///
/// Returns `DomainError::Rejected` when no game runs, the question is
/// not open, the submitter does not own the turn, the question was
/// already answered, or the option does not exist. Returns
/// `DomainError::Infrastructure` on storage failure.
#[instrument(
    skip(command, services),
    fields(chat_id = command.chat_id, player_id = command.submitter_id, question_index = command.question_index)
)]
pub async fn handle_answer(
    command: &SubmitAnswer,
    services: &Arc<GameServices>,
) -> Result<AnswerOutcome, DomainError> {
    let chat_id = command.chat_id;
    let _chat_guard = services.store.lock_chat(chat_id).await;

    let Some(mut session) = services.store.load(chat_id).await? else {
        return Err(Rejection::NoGame.into());
    };
    let outcome = services.with_rng(|rng| {
        session.answer(
            command.submitter_id,
            command.question_index,
            command.option_index,
            rng,
        )
    })??;
    let renders = session.take_pending_renders();

    let completed = matches!(outcome, AnswerOutcome::Completed { .. });
    if completed {
        services.store.delete(chat_id).await?;
        info!("game completed");
    } else {
        services
            .store
            .commit(&mut session, services.clock.now())
            .await?;
        info!("answer recorded");
    }

    dispatch_renders(services, &mut session, renders).await;
    Ok(outcome)
}

/// Handles `CancelGame`: deletes the session in any phase and stops its
/// countdown.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the chat has no session, or
/// `DomainError::Infrastructure` on storage failure.
#[instrument(skip(command, services), fields(chat_id = command.chat_id))]
pub async fn handle_cancel(
    command: &CancelGame,
    services: &Arc<GameServices>,
) -> Result<(), DomainError> {
    let chat_id = command.chat_id;
    let _chat_guard = services.store.lock_chat(chat_id).await;

    services.countdowns.cancel(chat_id);
    let Some(mut session) = services.store.load(chat_id).await? else {
        return Err(DomainError::SessionNotFound(chat_id));
    };
    session.cancel();
    let renders = session.take_pending_renders();
    services.store.delete(chat_id).await?;

    info!("game cancelled");
    dispatch_renders(services, &mut session, renders).await;
    Ok(())
}

/// Deletes sessions idle for longer than the configured age and stops
/// their countdowns. Returns the affected chats.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` on storage failure.
#[instrument(skip(services))]
pub async fn handle_sweep_stale_sessions(
    services: &Arc<GameServices>,
) -> Result<Vec<ChatId>, DomainError> {
    let before = services.clock.now() - services.settings.stale_after;
    let removed = services.store.delete_stale(before).await?;
    for chat_id in &removed {
        services.countdowns.cancel(*chat_id);
    }
    if !removed.is_empty() {
        info!(count = removed.len(), %before, "stale sessions swept");
    }
    Ok(removed)
}

/// Re-arms the countdown of every lobby left open by a previous process.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` on storage failure.
pub async fn resume_countdowns(services: &Arc<GameServices>) -> Result<Vec<ChatId>, DomainError> {
    let open = services.store.open_lobbies().await?;
    for chat_id in &open {
        start_countdown(services, *chat_id);
    }
    if !open.is_empty() {
        info!(count = open.len(), "lobby countdowns resumed");
    }
    Ok(open)
}

/// Sends queued renders in order and tracks the transport's anchor.
///
/// Delivery failures are logged and never undo the committed state.
/// When a live session's anchor moved, the session is saved again so
/// edits keep working after a restart.
async fn dispatch_renders(
    services: &GameServices,
    session: &mut Session,
    renders: Vec<PendingRender>,
) {
    let chat_id = session.chat_id;
    let mut anchor = session.render_anchor();
    for pending in renders {
        let target = if pending.edits_anchor { anchor } else { None };
        match services
            .renderer
            .render(chat_id, target, &pending.render)
            .await
        {
            Ok(Some(handle)) => anchor = Some(handle),
            Ok(None) => {}
            Err(e) => warn!(chat_id, kind = pending.render.kind(), error = %e, "render failed"),
        }
    }

    let Some(anchor) = anchor else {
        return;
    };
    if session.status().is_terminal() || session.render_anchor() == Some(anchor) {
        return;
    }
    session.set_render_anchor(anchor);
    if let Err(e) = services.store.commit(session, services.clock.now()).await {
        warn!(chat_id, error = %e, "failed to persist render anchor");
    }
}

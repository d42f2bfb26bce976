//! Test repositories: `SessionRepository` implementations for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storyfill_core::error::DomainError;
use storyfill_core::repository::{
    AddPlayerOutcome, OPEN_LOBBY_STATUSES, SessionRepository, StoredAnswer, StoredChange,
    StoredPlayer, StoredSession,
};
use storyfill_core::types::{ChatId, PlayerId};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct SessionRecord {
    header: StoredSession,
    players: Vec<StoredPlayer>,
    answers: BTreeMap<i32, StoredAnswer>,
    used: BTreeMap<String, BTreeSet<String>>,
}

impl SessionRecord {
    fn ordered_players(&self) -> Vec<StoredPlayer> {
        let mut players = self.players.clone();
        players.sort_by_key(|p| (p.turn_order.unwrap_or(p.join_order), p.join_order));
        players
    }

    fn add_player(&mut self, player: &StoredPlayer) -> AddPlayerOutcome {
        if self.players.iter().any(|p| p.player_id == player.player_id) {
            return AddPlayerOutcome::AlreadyExists;
        }
        self.players.push(StoredPlayer {
            turn_order: None,
            ..player.clone()
        });
        AddPlayerOutcome::Added
    }

    fn assign_turn_order(&mut self, turn_order: &[PlayerId]) {
        for player in &mut self.players {
            player.turn_order = turn_order
                .iter()
                .position(|id| *id == player.player_id)
                .and_then(|position| i32::try_from(position).ok());
        }
    }

    fn record_answer(&mut self, answer: &StoredAnswer) {
        self.answers.insert(answer.question_index, answer.clone());
    }

    fn mark_used(&mut self, category: &str, value: &str) {
        self.used
            .entry(category.to_owned())
            .or_default()
            .insert(value.to_owned());
    }

    fn apply(&mut self, change: &StoredChange) {
        match change {
            StoredChange::AddPlayer(player) => {
                self.add_player(player);
            }
            StoredChange::AssignTurnOrder(turn_order) => self.assign_turn_order(turn_order),
            StoredChange::RecordAnswer(answer) => self.record_answer(answer),
            StoredChange::MarkUsed { category, value } => self.mark_used(category, value),
        }
    }

    fn set_header(&mut self, session: &StoredSession) {
        self.header = StoredSession {
            players: Vec::new(),
            answers: Vec::new(),
            ..session.clone()
        };
    }
}

/// A session repository kept entirely in memory, honoring the full
/// persistence contract. Writes can be switched to fail on demand.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<ChatId, SessionRecord>>,
    fail_writes: AtomicBool,
    failing_header_writes: AtomicU32,
}

impl InMemorySessionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with an infrastructure error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` header writes fail. Inside
    /// `commit_session` the failure strikes after the child rows were
    /// applied, so the whole commit must be discarded.
    pub fn fail_next_header_writes(&self, count: u32) {
        self.failing_header_writes.store(count, Ordering::SeqCst);
    }

    fn check_header_writable(&self) -> Result<(), DomainError> {
        let armed = self
            .failing_header_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if armed {
            return Err(DomainError::Infrastructure("header write lost".into()));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("write refused".into()));
        }
        Ok(())
    }

    fn with_session<T>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Result<T, DomainError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .values_mut()
            .find(|record| record.header.session_id == session_id)
            .map(f)
            .ok_or_else(|| DomainError::Infrastructure(format!("unknown session {session_id}")))
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create_session(
        &self,
        chat_id: ChatId,
        created_at: DateTime<Utc>,
    ) -> Result<Uuid, DomainError> {
        self.check_writable()?;
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&chat_id) {
            return Err(DomainError::SessionExists(chat_id));
        }
        let session_id = Uuid::new_v4();
        sessions.insert(
            chat_id,
            SessionRecord {
                header: StoredSession {
                    session_id,
                    chat_id,
                    status: "lobby".to_owned(),
                    question_plan: Vec::new(),
                    current_question_index: 0,
                    current_options: Vec::new(),
                    countdown_remaining: 0,
                    render_anchor: None,
                    created_at,
                    updated_at: created_at,
                    players: Vec::new(),
                    answers: Vec::new(),
                },
                players: Vec::new(),
                answers: BTreeMap::new(),
                used: BTreeMap::new(),
            },
        );
        Ok(session_id)
    }

    async fn load_session(&self, chat_id: ChatId) -> Result<Option<StoredSession>, DomainError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions.get(&chat_id).map(|record| StoredSession {
            players: record.ordered_players(),
            answers: record.answers.values().cloned().collect(),
            ..record.header.clone()
        }))
    }

    async fn save_session(&self, session: &StoredSession) -> Result<(), DomainError> {
        self.check_writable()?;
        self.check_header_writable()?;
        self.with_session(session.session_id, |record| record.set_header(session))
    }

    async fn commit_session(
        &self,
        session: &StoredSession,
        changes: &[StoredChange],
    ) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut working = self.with_session(session.session_id, |record| record.clone())?;
        for change in changes {
            working.apply(change);
        }
        self.check_header_writable()?;
        working.set_header(session);
        self.with_session(session.session_id, |record| *record = working)
    }

    async fn add_player(
        &self,
        session_id: Uuid,
        player_id: PlayerId,
        display_name: &str,
        join_order: i32,
    ) -> Result<AddPlayerOutcome, DomainError> {
        self.check_writable()?;
        let player = StoredPlayer {
            player_id,
            display_name: display_name.to_owned(),
            join_order,
            turn_order: None,
        };
        self.with_session(session_id, |record| record.add_player(&player))
    }

    async fn assign_turn_order(
        &self,
        session_id: Uuid,
        turn_order: &[PlayerId],
    ) -> Result<Vec<StoredPlayer>, DomainError> {
        self.check_writable()?;
        self.with_session(session_id, |record| {
            record.assign_turn_order(turn_order);
            record.ordered_players()
        })
    }

    async fn record_answer(
        &self,
        session_id: Uuid,
        answer: &StoredAnswer,
    ) -> Result<(), DomainError> {
        self.check_writable()?;
        self.with_session(session_id, |record| record.record_answer(answer))
    }

    async fn mark_used(
        &self,
        session_id: Uuid,
        category: &str,
        value: &str,
    ) -> Result<(), DomainError> {
        self.check_writable()?;
        self.with_session(session_id, |record| record.mark_used(category, value))
    }

    async fn list_used(
        &self,
        session_id: Uuid,
        category: &str,
    ) -> Result<BTreeSet<String>, DomainError> {
        self.with_session(session_id, |record| {
            record.used.get(category).cloned().unwrap_or_default()
        })
    }

    async fn delete_session(&self, chat_id: ChatId) -> Result<bool, DomainError> {
        self.check_writable()?;
        Ok(self.sessions.lock().unwrap().remove(&chat_id).is_some())
    }

    async fn count_active_sessions(&self) -> Result<u64, DomainError> {
        Ok(self.sessions.lock().unwrap().len() as u64)
    }

    async fn list_open_lobbies(&self) -> Result<Vec<ChatId>, DomainError> {
        let sessions = self.sessions.lock().unwrap();
        let mut open: Vec<ChatId> = sessions
            .values()
            .filter(|record| OPEN_LOBBY_STATUSES.contains(&record.header.status.as_str()))
            .map(|record| record.header.chat_id)
            .collect();
        open.sort_unstable();
        Ok(open)
    }

    async fn delete_stale_sessions(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<ChatId>, DomainError> {
        self.check_writable()?;
        let mut sessions = self.sessions.lock().unwrap();
        let mut stale: Vec<ChatId> = sessions
            .values()
            .filter(|record| record.header.updated_at < before)
            .map(|record| record.header.chat_id)
            .collect();
        stale.sort_unstable();
        for chat_id in &stale {
            sessions.remove(chat_id);
        }
        Ok(stale)
    }
}

/// A session repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingSessionRepository;

fn refused<T>() -> Result<T, DomainError> {
    Err(DomainError::Infrastructure("connection refused".into()))
}

#[async_trait]
impl SessionRepository for FailingSessionRepository {
    async fn create_session(
        &self,
        _chat_id: ChatId,
        _created_at: DateTime<Utc>,
    ) -> Result<Uuid, DomainError> {
        refused()
    }

    async fn load_session(&self, _chat_id: ChatId) -> Result<Option<StoredSession>, DomainError> {
        refused()
    }

    async fn save_session(&self, _session: &StoredSession) -> Result<(), DomainError> {
        refused()
    }

    async fn commit_session(
        &self,
        _session: &StoredSession,
        _changes: &[StoredChange],
    ) -> Result<(), DomainError> {
        refused()
    }

    async fn add_player(
        &self,
        _session_id: Uuid,
        _player_id: PlayerId,
        _display_name: &str,
        _join_order: i32,
    ) -> Result<AddPlayerOutcome, DomainError> {
        refused()
    }

    async fn assign_turn_order(
        &self,
        _session_id: Uuid,
        _turn_order: &[PlayerId],
    ) -> Result<Vec<StoredPlayer>, DomainError> {
        refused()
    }

    async fn record_answer(
        &self,
        _session_id: Uuid,
        _answer: &StoredAnswer,
    ) -> Result<(), DomainError> {
        refused()
    }

    async fn mark_used(
        &self,
        _session_id: Uuid,
        _category: &str,
        _value: &str,
    ) -> Result<(), DomainError> {
        refused()
    }

    async fn list_used(
        &self,
        _session_id: Uuid,
        _category: &str,
    ) -> Result<BTreeSet<String>, DomainError> {
        refused()
    }

    async fn delete_session(&self, _chat_id: ChatId) -> Result<bool, DomainError> {
        refused()
    }

    async fn count_active_sessions(&self) -> Result<u64, DomainError> {
        refused()
    }

    async fn list_open_lobbies(&self) -> Result<Vec<ChatId>, DomainError> {
        refused()
    }

    async fn delete_stale_sessions(
        &self,
        _before: DateTime<Utc>,
    ) -> Result<Vec<ChatId>, DomainError> {
        refused()
    }
}

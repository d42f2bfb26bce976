//! Session store: the repository fronted by an in-process cache.
//!
//! The cache is read-through and write-through. A session enters the
//! cache only after its writes succeeded, and any failed write evicts
//! it, so the repository stays the single source of truth.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use storyfill_content::QuestionId;
use storyfill_core::error::DomainError;
use storyfill_core::repository::{SessionRepository, StoredChange};
use storyfill_core::types::ChatId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::session::{Session, SessionChange, UsedCategory};

type ChatLocks = Arc<Mutex<HashMap<ChatId, Arc<AsyncMutex<()>>>>>;

/// Cached, write-through access to sessions keyed by chat id.
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    cache: Mutex<HashMap<ChatId, Session>>,
    chat_locks: ChatLocks,
}

/// Exclusive hold on one chat. Dropping it releases the chat and
/// forgets its lock once nobody else waits on it.
pub struct ChatGuard {
    chat_id: ChatId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: ChatLocks,
}

impl std::fmt::Debug for ChatGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatGuard")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl Drop for ChatGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.chat_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.chat_id);
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("cached", &self.cache().len())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a store over `repo` with an empty cache.
    #[must_use]
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            repo,
            cache: Mutex::new(HashMap::new()),
            chat_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serializes command processing for one chat.
    ///
    /// The guard must be held from load to commit.
    pub async fn lock_chat(&self, chat_id: ChatId) -> ChatGuard {
        let lock = {
            let mut locks = self
                .chat_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(chat_id).or_default())
        };
        ChatGuard {
            chat_id,
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.chat_locks),
        }
    }

    /// Number of chats with a live lock entry.
    #[must_use]
    pub fn locked_chats(&self) -> usize {
        self.chat_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Creates the durable session row and returns the fresh aggregate.
    ///
    /// The aggregate is not cached until its first commit.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionExists` if the chat already has a
    /// session, or `DomainError::Infrastructure` on storage failure.
    pub async fn create(
        &self,
        chat_id: ChatId,
        countdown_seconds: i32,
        now: DateTime<Utc>,
    ) -> Result<Session, DomainError> {
        let session_id = self.repo.create_session(chat_id, now).await?;
        Ok(Session::new(session_id, chat_id, countdown_seconds, now))
    }

    /// Loads the session for `chat_id`, from cache if present.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure or if the
    /// stored rows cannot be rebuilt into a session.
    pub async fn load(&self, chat_id: ChatId) -> Result<Option<Session>, DomainError> {
        let cached = self.cache().get(&chat_id).cloned();
        if cached.is_some() {
            return Ok(cached);
        }

        let Some(stored) = self.repo.load_session(chat_id).await? else {
            return Ok(None);
        };
        let session_id = stored.session_id;
        let used_characters = self
            .repo
            .list_used(session_id, &UsedCategory::Character.key())
            .await?;
        let mut used_options = BTreeMap::new();
        for question in QuestionId::ALL.into_iter().filter(|q| !q.is_character()) {
            let values = self
                .repo
                .list_used(session_id, &UsedCategory::Option(question).key())
                .await?;
            if !values.is_empty() {
                used_options.insert(question, values);
            }
        }

        let session = Session::from_stored(stored, used_characters, used_options)?;
        debug!(chat_id, "session loaded from repository");
        self.cache().insert(chat_id, session.clone());
        Ok(Some(session))
    }

    /// Persists the session's uncommitted changes and header, then
    /// refreshes the cache.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure; the
    /// cache entry for the chat is evicted in that case.
    pub async fn commit(&self, session: &mut Session, now: DateTime<Utc>) -> Result<(), DomainError> {
        let result = self.write_through(session, now).await;
        if result.is_err() {
            self.invalidate(session.chat_id);
        }
        result
    }

    /// Deletes the session for `chat_id`. Returns `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    pub async fn delete(&self, chat_id: ChatId) -> Result<bool, DomainError> {
        self.invalidate(chat_id);
        self.repo.delete_session(chat_id).await
    }

    /// Counts stored sessions.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    pub async fn count_active(&self) -> Result<u64, DomainError> {
        self.repo.count_active_sessions().await
    }

    /// Lists chats whose session still accepts joins.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    pub async fn open_lobbies(&self) -> Result<Vec<ChatId>, DomainError> {
        self.repo.list_open_lobbies().await
    }

    /// Deletes sessions idle since before `before` and returns their chats.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    pub async fn delete_stale(&self, before: DateTime<Utc>) -> Result<Vec<ChatId>, DomainError> {
        let removed = self.repo.delete_stale_sessions(before).await?;
        for chat_id in &removed {
            self.invalidate(*chat_id);
        }
        Ok(removed)
    }

    /// Evicts the cached copy for `chat_id`.
    pub fn invalidate(&self, chat_id: ChatId) {
        self.cache().remove(&chat_id);
    }

    /// Whether a copy of the chat's session is cached.
    #[must_use]
    pub fn is_cached(&self, chat_id: ChatId) -> bool {
        self.cache().contains_key(&chat_id)
    }

    async fn write_through(&self, session: &mut Session, now: DateTime<Utc>) -> Result<(), DomainError> {
        let changes: Vec<StoredChange> = session
            .uncommitted_changes()
            .iter()
            .map(SessionChange::to_stored)
            .collect();

        session.touch(now);
        self.repo.commit_session(&session.to_stored(), &changes).await?;
        debug!(chat_id = session.chat_id, changes = changes.len(), "session committed");
        session.clear_uncommitted_changes();
        self.cache().insert(session.chat_id, session.clone());
        Ok(())
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<ChatId, Session>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

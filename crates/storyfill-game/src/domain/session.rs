//! Aggregate root for one game session.
//!
//! A session moves `Lobby → Countdown → InProgress → Completed`, or ends
//! in `Aborted`. Domain methods validate, mutate in memory, and queue
//! two kinds of output: uncommitted changes (rows the session store must
//! write) and pending renders (what the transport shows once the
//! changes are durable).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyfill_content::{QuestionId, WILDCARD};
use storyfill_core::error::{DomainError, Rejection};
use storyfill_core::render::{PlayerRef, RecapEntry, Render};
use storyfill_core::repository::{StoredAnswer, StoredChange, StoredPlayer, StoredSession};
use storyfill_core::rng::{DeterministicRng, shuffle};
use storyfill_core::types::{ChatId, PlayerId, RenderAnchor};
use uuid::Uuid;

use super::options::{resolve_wildcard, select_options};
use super::plan::{MAX_PLAYERS, MIN_PLAYERS, build_plan};
use super::result::assemble;
use super::text::option_label;

/// Shown when the countdown ends below the player floor.
pub const INSUFFICIENT_PLAYERS_REASON: &str =
    "❌ လူအရေအတွက် မလောက်လို့ game မစနိုင်ပါ။ (အနည်းဆုံး 4 ယောက် လိုအပ်ပါတယ်)";

/// Shown when a session is cancelled explicitly.
pub const CANCELLED_REASON: &str = "🛑 Game cancelled.";

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, timer not armed yet.
    Lobby,
    /// Accepting joins while the countdown runs.
    Countdown,
    /// Questions are being answered.
    InProgress,
    /// Every question answered; terminal.
    Completed,
    /// Closed without a result; terminal.
    Aborted,
}

impl SessionStatus {
    /// Stable status name, used for persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Countdown => "countdown",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    /// Parses a stored status name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` for unknown names.
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        match name {
            "lobby" => Ok(Self::Lobby),
            "countdown" => Ok(Self::Countdown),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "aborted" => Ok(Self::Aborted),
            other => Err(DomainError::Infrastructure(format!(
                "unknown session status: {other}"
            ))),
        }
    }

    /// Whether joins and ticks are accepted.
    #[must_use]
    pub fn accepts_joins(self) -> bool {
        matches!(self, Self::Lobby | Self::Countdown)
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// A participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// External identity.
    pub id: PlayerId,
    /// Sanitized display name.
    pub display_name: String,
    /// Zero-based join position.
    pub join_order: u32,
    /// Zero-based turn position; `None` until the game starts.
    pub turn_order: Option<u32>,
}

impl Player {
    /// Converts the player into its stored row.
    #[must_use]
    pub fn to_stored(&self) -> StoredPlayer {
        StoredPlayer {
            player_id: self.id,
            display_name: self.display_name.clone(),
            join_order: i32::try_from(self.join_order).unwrap_or(i32::MAX),
            turn_order: self.turn_order.map(|t| i32::try_from(t).unwrap_or(i32::MAX)),
        }
    }

    fn to_ref(&self) -> PlayerRef {
        PlayerRef {
            player_id: self.id,
            display_name: self.display_name.clone(),
        }
    }
}

/// The accepted answer of one question. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Zero-based question index.
    pub question_index: usize,
    /// The question answered.
    pub question_id: QuestionId,
    /// The turn owner who answered.
    pub owner_id: PlayerId,
    /// Resolved answer text; never the wildcard sentinel.
    pub value: String,
}

impl AnswerRecord {
    /// Converts the answer into its stored row.
    #[must_use]
    pub fn to_stored(&self) -> StoredAnswer {
        StoredAnswer {
            question_index: to_stored_index(self.question_index),
            question_id: self.question_id.as_str().to_owned(),
            player_id: self.owner_id,
            value: self.value.clone(),
        }
    }
}

/// Names a used-value pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsedCategory {
    /// The session-wide character pool.
    Character,
    /// The pool of one non-character question type.
    Option(QuestionId),
}

impl UsedCategory {
    /// Storage key of the pool.
    #[must_use]
    pub fn key(self) -> String {
        match self {
            Self::Character => "character".to_owned(),
            Self::Option(question) => format!("option_{}", question.as_str()),
        }
    }
}

/// A row-level change the session store must persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// A player joined the lobby.
    PlayerJoined(Player),
    /// Players were shuffled; `turn_order[i]` plays position `i`.
    TurnOrderAssigned(Vec<PlayerId>),
    /// An answer was accepted.
    AnswerRecorded(AnswerRecord),
    /// A value entered a used pool.
    MarkedUsed {
        /// The pool.
        category: UsedCategory,
        /// The value.
        value: String,
    },
}

impl SessionChange {
    /// Converts the change into the row write the repository applies.
    #[must_use]
    pub fn to_stored(&self) -> StoredChange {
        match self {
            Self::PlayerJoined(player) => StoredChange::AddPlayer(player.to_stored()),
            Self::TurnOrderAssigned(turn_order) => StoredChange::AssignTurnOrder(turn_order.clone()),
            Self::AnswerRecorded(answer) => StoredChange::RecordAnswer(answer.to_stored()),
            Self::MarkedUsed { category, value } => StoredChange::MarkUsed {
                category: category.key(),
                value: value.clone(),
            },
        }
    }
}

/// A render waiting for its state change to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRender {
    /// What to show.
    pub render: Render,
    /// Whether to edit the anchored message instead of posting.
    pub edits_anchor: bool,
}

/// Result of a countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown still running.
    Continue,
    /// Enough players; the game started.
    Started,
    /// Too few players; the session is aborted.
    Aborted,
    /// The session is not counting down; nothing happened.
    Ignored,
}

/// Result of an accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The next question was asked.
    NextQuestion {
        /// Index of the question now open.
        question_index: usize,
    },
    /// That was the last question.
    Completed {
        /// The assembled story.
        sentence: String,
    },
}

/// The aggregate root for a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Store-assigned identifier.
    pub session_id: Uuid,
    /// Chat hosting the session.
    pub chat_id: ChatId,
    status: SessionStatus,
    /// Join order in the lobby, turn order once started.
    players: Vec<Player>,
    question_plan: Vec<QuestionId>,
    current_question_index: usize,
    /// Options offered for the current question.
    current_options: Vec<String>,
    answers: BTreeMap<usize, AnswerRecord>,
    used_characters: BTreeSet<String>,
    used_options: BTreeMap<QuestionId, BTreeSet<String>>,
    /// Meaningful only while the session accepts joins.
    countdown_remaining: i32,
    render_anchor: Option<RenderAnchor>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    uncommitted_changes: Vec<SessionChange>,
    pending_renders: Vec<PendingRender>,
}

impl Session {
    /// Creates an empty lobby.
    #[must_use]
    pub fn new(
        session_id: Uuid,
        chat_id: ChatId,
        countdown_seconds: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            chat_id,
            status: SessionStatus::Lobby,
            players: Vec::new(),
            question_plan: Vec::new(),
            current_question_index: 0,
            current_options: Vec::new(),
            answers: BTreeMap::new(),
            used_characters: BTreeSet::new(),
            used_options: BTreeMap::new(),
            countdown_remaining: countdown_seconds,
            render_anchor: None,
            created_at: now,
            updated_at: now,
            uncommitted_changes: Vec::new(),
            pending_renders: Vec::new(),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Players in join order (lobby) or turn order (started).
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// The question plan; empty until the game starts.
    #[must_use]
    pub fn question_plan(&self) -> &[QuestionId] {
        &self.question_plan
    }

    /// Index of the open question; equals the plan length once completed.
    #[must_use]
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    /// Options offered for the open question.
    #[must_use]
    pub fn current_options(&self) -> &[String] {
        &self.current_options
    }

    /// Accepted answers by question index.
    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, AnswerRecord> {
        &self.answers
    }

    /// Characters consumed so far.
    #[must_use]
    pub fn used_characters(&self) -> &BTreeSet<String> {
        &self.used_characters
    }

    /// Option values consumed so far, per question type.
    #[must_use]
    pub fn used_options(&self) -> &BTreeMap<QuestionId, BTreeSet<String>> {
        &self.used_options
    }

    /// Seconds left on the lobby countdown.
    #[must_use]
    pub fn countdown_remaining(&self) -> i32 {
        self.countdown_remaining
    }

    /// Handle of the last lobby/progress message.
    #[must_use]
    pub fn render_anchor(&self) -> Option<RenderAnchor> {
        self.render_anchor
    }

    /// Records the transport's handle of the last lobby/progress message.
    pub fn set_render_anchor(&mut self, anchor: RenderAnchor) {
        self.render_anchor = Some(anchor);
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session was last persisted.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Marks the session as written at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// The question currently open, if any.
    #[must_use]
    pub fn current_question(&self) -> Option<QuestionId> {
        self.question_plan.get(self.current_question_index).copied()
    }

    /// The player entitled to answer question `question_index`.
    ///
    /// Round-robin over the turn order: `players[index mod len]`.
    #[must_use]
    pub fn turn_owner_at(&self, question_index: usize) -> Option<&Player> {
        if self.players.is_empty() {
            return None;
        }
        self.players.get(question_index % self.players.len())
    }

    /// The player entitled to answer the open question.
    #[must_use]
    pub fn turn_owner(&self) -> Option<&Player> {
        self.current_question()
            .and_then(|_| self.turn_owner_at(self.current_question_index))
    }

    /// Row-level changes not yet persisted.
    #[must_use]
    pub fn uncommitted_changes(&self) -> &[SessionChange] {
        &self.uncommitted_changes
    }

    /// Clears uncommitted changes after persistence.
    pub fn clear_uncommitted_changes(&mut self) {
        self.uncommitted_changes.clear();
    }

    /// Takes the renders queued by the last transitions.
    pub fn take_pending_renders(&mut self) -> Vec<PendingRender> {
        std::mem::take(&mut self.pending_renders)
    }

    /// Arms the countdown. Only meaningful in `Lobby`.
    pub fn begin_countdown(&mut self) {
        if self.status == SessionStatus::Lobby {
            self.status = SessionStatus::Countdown;
        }
    }

    /// Renders the lobby state for the anchored lobby message.
    pub fn announce_lobby(&mut self) {
        let render = self.lobby_progress();
        self.queue(render, true);
    }

    /// Adds a player to the lobby and returns the new player count.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` if the lobby is closed, the player already
    /// joined, or the lobby is full. Nothing changes in that case.
    #[allow(clippy::cast_possible_truncation)]
    pub fn join(&mut self, player_id: PlayerId, display_name: String) -> Result<usize, Rejection> {
        if !self.status.accepts_joins() {
            return Err(Rejection::GameAlreadyStarted);
        }
        if self.players.iter().any(|p| p.id == player_id) {
            return Err(Rejection::AlreadyJoined);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(Rejection::LobbyFull);
        }

        let player = Player {
            id: player_id,
            display_name,
            join_order: self.players.len() as u32,
            turn_order: None,
        };
        self.players.push(player.clone());
        self.uncommitted_changes
            .push(SessionChange::PlayerJoined(player));
        self.announce_lobby();
        Ok(self.players.len())
    }

    /// Advances the countdown by `step_seconds`.
    ///
    /// When the countdown runs out or the lobby is full, the game starts
    /// with at least [`MIN_PLAYERS`] players and aborts otherwise.
    pub fn tick(&mut self, step_seconds: i32, rng: &mut dyn DeterministicRng) -> TickOutcome {
        if !self.status.accepts_joins() {
            return TickOutcome::Ignored;
        }
        self.status = SessionStatus::Countdown;
        self.countdown_remaining = (self.countdown_remaining - step_seconds).max(0);

        if self.countdown_remaining > 0 && self.players.len() < MAX_PLAYERS {
            self.announce_lobby();
            return TickOutcome::Continue;
        }

        if self.players.len() >= MIN_PLAYERS {
            self.start_game(rng);
            TickOutcome::Started
        } else {
            self.status = SessionStatus::Aborted;
            self.queue(
                Render::LobbyAborted {
                    reason: INSUFFICIENT_PLAYERS_REASON.to_owned(),
                },
                true,
            );
            TickOutcome::Aborted
        }
    }

    /// Records the turn owner's pick for `question_index`.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` if no game is running, the question is not
    /// open, the submitter does not own the turn, the question was
    /// already answered, or the option slot does not exist. Nothing
    /// changes in that case.
    pub fn answer(
        &mut self,
        submitter_id: PlayerId,
        question_index: usize,
        option_index: usize,
        rng: &mut dyn DeterministicRng,
    ) -> Result<AnswerOutcome, Rejection> {
        if self.status != SessionStatus::InProgress {
            return Err(Rejection::NoGame);
        }
        let Some(&question) = self.question_plan.get(question_index) else {
            return Err(Rejection::QuestionNotActive);
        };
        let owner = self
            .turn_owner_at(question_index)
            .ok_or(Rejection::NoGame)?;
        if owner.id != submitter_id {
            return Err(Rejection::NotYourTurn {
                turn_owner: owner.display_name.clone(),
            });
        }
        if self.answers.contains_key(&question_index) {
            return Err(Rejection::AlreadyAnswered);
        }
        if question_index != self.current_question_index {
            return Err(Rejection::QuestionNotActive);
        }
        let Some(picked) = self.current_options.get(option_index).cloned() else {
            return Err(Rejection::InvalidOption);
        };
        let owner_name = owner.display_name.clone();

        let value = if picked == WILDCARD {
            resolve_wildcard(&self.used_characters, rng)
        } else {
            picked
        };
        let record = AnswerRecord {
            question_index,
            question_id: question,
            owner_id: submitter_id,
            value: value.clone(),
        };
        self.answers.insert(question_index, record.clone());
        self.uncommitted_changes
            .push(SessionChange::AnswerRecorded(record));
        self.mark_used(question, &value);
        self.current_question_index += 1;
        self.current_options.clear();

        let question_count = self.question_plan.len();
        self.queue(
            Render::AnswerRecorded {
                question_number: question_index + 1,
                question_count,
                question_text: question.prompt().to_owned(),
                player_name: owner_name,
                answer: value,
            },
            true,
        );

        if self.current_question_index == question_count {
            self.status = SessionStatus::Completed;
            let sentence = self.sentence();
            self.queue(
                Render::FinalResult {
                    sentence: sentence.clone(),
                    recap: self.recap(),
                },
                false,
            );
            Ok(AnswerOutcome::Completed { sentence })
        } else {
            self.enter_question(rng);
            Ok(AnswerOutcome::NextQuestion {
                question_index: self.current_question_index,
            })
        }
    }

    /// Ends the session in any phase.
    pub fn cancel(&mut self) {
        let in_lobby = self.status.accepts_joins();
        self.status = SessionStatus::Aborted;
        self.queue(
            Render::LobbyAborted {
                reason: CANCELLED_REASON.to_owned(),
            },
            in_lobby,
        );
    }

    /// The story assembled from the answers given so far.
    #[must_use]
    pub fn sentence(&self) -> String {
        assemble(
            self.question_plan
                .iter()
                .enumerate()
                .filter_map(|(index, question)| {
                    self.answers
                        .get(&index)
                        .map(|answer| (*question, answer.value.as_str()))
                }),
        )
    }

    /// Per-question recap of the answers given so far, in plan order.
    #[must_use]
    pub fn recap(&self) -> Vec<RecapEntry> {
        self.question_plan
            .iter()
            .enumerate()
            .filter_map(|(index, question)| {
                self.answers.get(&index).map(|answer| RecapEntry {
                    question_text: question.prompt().to_owned(),
                    player_name: self.player_name(answer.owner_id),
                    answer: answer.value.clone(),
                })
            })
            .collect()
    }

    /// Converts the session into its stored form.
    #[must_use]
    pub fn to_stored(&self) -> StoredSession {
        StoredSession {
            session_id: self.session_id,
            chat_id: self.chat_id,
            status: self.status.as_str().to_owned(),
            question_plan: self
                .question_plan
                .iter()
                .map(|q| q.as_str().to_owned())
                .collect(),
            current_question_index: to_stored_index(self.current_question_index),
            current_options: self.current_options.clone(),
            countdown_remaining: self.countdown_remaining,
            render_anchor: self.render_anchor,
            created_at: self.created_at,
            updated_at: self.updated_at,
            players: self.players.iter().map(Player::to_stored).collect(),
            answers: self.answers.values().map(AnswerRecord::to_stored).collect(),
        }
    }

    /// Rebuilds a session from its stored form and used pools.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a stored value is invalid.
    pub fn from_stored(
        stored: StoredSession,
        used_characters: BTreeSet<String>,
        used_options: BTreeMap<QuestionId, BTreeSet<String>>,
    ) -> Result<Self, DomainError> {
        let question_plan = stored
            .question_plan
            .iter()
            .map(|name| parse_question(name))
            .collect::<Result<Vec<_>, _>>()?;
        let players = stored
            .players
            .into_iter()
            .map(|p| {
                Ok(Player {
                    id: p.player_id,
                    display_name: p.display_name,
                    join_order: to_position(p.join_order, "join_order")?,
                    turn_order: p
                        .turn_order
                        .map(|t| to_position(t, "turn_order"))
                        .transpose()?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let answers = stored
            .answers
            .into_iter()
            .map(|a| {
                let question_index = to_index(a.question_index, "question_index")?;
                Ok((
                    question_index,
                    AnswerRecord {
                        question_index,
                        question_id: parse_question(&a.question_id)?,
                        owner_id: a.player_id,
                        value: a.value,
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>, DomainError>>()?;

        Ok(Self {
            session_id: stored.session_id,
            chat_id: stored.chat_id,
            status: SessionStatus::parse(&stored.status)?,
            players,
            question_plan,
            current_question_index: to_index(
                stored.current_question_index,
                "current_question_index",
            )?,
            current_options: stored.current_options,
            answers,
            used_characters,
            used_options,
            countdown_remaining: stored.countdown_remaining,
            render_anchor: stored.render_anchor,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            uncommitted_changes: Vec::new(),
            pending_renders: Vec::new(),
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn start_game(&mut self, rng: &mut dyn DeterministicRng) {
        shuffle(rng, &mut self.players);
        for (position, player) in self.players.iter_mut().enumerate() {
            player.turn_order = Some(position as u32);
        }
        self.uncommitted_changes
            .push(SessionChange::TurnOrderAssigned(
                self.players.iter().map(|p| p.id).collect(),
            ));
        self.question_plan = build_plan(self.players.len());
        self.current_question_index = 0;
        self.status = SessionStatus::InProgress;
        self.queue(Render::GameStarting, true);
        self.enter_question(rng);
    }

    fn enter_question(&mut self, rng: &mut dyn DeterministicRng) {
        let Some(question) = self.current_question() else {
            return;
        };
        let no_options = BTreeSet::new();
        let options = select_options(
            question,
            &self.used_characters,
            self.used_options.get(&question).unwrap_or(&no_options),
            rng,
        );
        self.current_options = options;

        let Some(owner) = self.turn_owner() else {
            return;
        };
        let render = Render::QuestionPrompt {
            question_index: self.current_question_index,
            question_number: self.current_question_index + 1,
            question_count: self.question_plan.len(),
            question_text: question.prompt().to_owned(),
            option_labels: self
                .current_options
                .iter()
                .map(|o| option_label(o))
                .collect(),
            turn_owner: owner.to_ref(),
        };
        self.queue(render, false);
    }

    fn mark_used(&mut self, question: QuestionId, value: &str) {
        let (category, inserted) = if question.is_character() {
            (
                UsedCategory::Character,
                self.used_characters.insert(value.to_owned()),
            )
        } else {
            (
                UsedCategory::Option(question),
                self.used_options
                    .entry(question)
                    .or_default()
                    .insert(value.to_owned()),
            )
        };
        if inserted {
            self.uncommitted_changes.push(SessionChange::MarkedUsed {
                category,
                value: value.to_owned(),
            });
        }
    }

    fn lobby_progress(&self) -> Render {
        Render::LobbyProgress {
            player_count: self.players.len(),
            max_players: MAX_PLAYERS,
            player_names: self
                .players
                .iter()
                .map(|p| p.display_name.clone())
                .collect(),
            seconds_remaining: self.countdown_remaining,
        }
    }

    fn player_name(&self, player_id: PlayerId) -> String {
        self.players
            .iter()
            .find(|p| p.id == player_id)
            .map_or_else(|| player_id.to_string(), |p| p.display_name.clone())
    }

    fn queue(&mut self, render: Render, edits_anchor: bool) {
        self.pending_renders.push(PendingRender {
            render,
            edits_anchor,
        });
    }
}

fn to_stored_index(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn parse_question(name: &str) -> Result<QuestionId, DomainError> {
    name.parse::<QuestionId>()
        .map_err(|e| DomainError::Infrastructure(e.to_string()))
}

fn to_index(value: i32, field: &str) -> Result<usize, DomainError> {
    usize::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("negative {field}: {value}")))
}

fn to_position(value: i32, field: &str) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("negative {field}: {value}")))
}

//! Domain error types.

use thiserror::Error;

use crate::types::ChatId;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session exists for the chat.
    #[error("session not found for chat {0}")]
    SessionNotFound(ChatId),

    /// A session already exists for the chat.
    #[error("session already exists for chat {0}")]
    SessionExists(ChatId),

    /// A user action was refused without mutating state.
    #[error("rejected: {0}")]
    Rejected(Rejection),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<Rejection> for DomainError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// Expected, user-facing refusals. None of these mutate the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// `StartLobby` while the chat already hosts a session.
    #[error("a game is already running in this chat")]
    GameAlreadyRunning,

    /// `Join` without an open lobby.
    #[error("no lobby is open in this chat")]
    NoLobby,

    /// `Join` after the game left the lobby phase.
    #[error("the game has already started")]
    GameAlreadyStarted,

    /// `Join` by a player who is already in the lobby.
    #[error("player already joined")]
    AlreadyJoined,

    /// `Join` when the lobby holds the maximum number of players.
    #[error("the lobby is full")]
    LobbyFull,

    /// `Answer` without a game in progress.
    #[error("no game is in progress in this chat")]
    NoGame,

    /// `Answer` from someone other than the turn owner.
    #[error("it is {turn_owner}'s turn")]
    NotYourTurn {
        /// Display name of the player who owns the turn.
        turn_owner: String,
    },

    /// `Answer` for a question that already has an answer.
    #[error("question already answered")]
    AlreadyAnswered,

    /// `Answer` for a question that has not been asked yet.
    #[error("question is not open")]
    QuestionNotActive,

    /// `Answer` naming an option slot that was not offered.
    #[error("option does not exist")]
    InvalidOption,
}

impl Rejection {
    /// Short notice shown to the acting user.
    #[must_use]
    pub fn notice(&self) -> String {
        match self {
            Self::GameAlreadyRunning => "⚠️ ဒီ chat မှာ game တခု ရှိနေပါပြီ!".to_owned(),
            Self::NoLobby => "⚠️ Game lobby မရှိပါ!".to_owned(),
            Self::GameAlreadyStarted => "⚠️ Game စပြီးပါပြီ!".to_owned(),
            Self::AlreadyJoined => "⚠️ သင် join ပြီးပါပြီ!".to_owned(),
            Self::LobbyFull => "⚠️ ပွဲပြည့်ပါပြီ!".to_owned(),
            Self::NoGame => "⚠️ Game မရှိပါ!".to_owned(),
            Self::NotYourTurn { turn_owner } => format!("⚠️ {turn_owner} က ရွေးရမှာပါ!"),
            Self::AlreadyAnswered => "⚠️ ရွေးပြီးပါပြီ!".to_owned(),
            Self::QuestionNotActive => "⚠️ ဒီမေးခွန်း မရောက်သေးပါ!".to_owned(),
            Self::InvalidOption => "⚠️ ဒီ option မရှိပါ!".to_owned(),
        }
    }
}

//! Commands accepted by the turn engine.

use storyfill_core::command::Command;
use storyfill_core::types::{ChatId, PlayerId};
use uuid::Uuid;

/// Command to open a lobby in a chat.
#[derive(Debug, Clone)]
pub struct StartLobby {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The chat to open the lobby in.
    pub chat_id: ChatId,
}

impl Command for StartLobby {
    fn command_type(&self) -> &'static str {
        "game.start_lobby"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

/// Command to join an open lobby.
#[derive(Debug, Clone)]
pub struct JoinGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The chat hosting the lobby.
    pub chat_id: ChatId,
    /// The joining player.
    pub player_id: PlayerId,
    /// Sanitized display name.
    pub display_name: String,
}

impl Command for JoinGame {
    fn command_type(&self) -> &'static str {
        "game.join"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

/// Countdown tick, issued by the session's timer.
#[derive(Debug, Clone)]
pub struct Tick {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The chat whose countdown advances.
    pub chat_id: ChatId,
}

impl Command for Tick {
    fn command_type(&self) -> &'static str {
        "game.tick"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

/// Command to pick an option for a question.
#[derive(Debug, Clone)]
pub struct SubmitAnswer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The chat hosting the game.
    pub chat_id: ChatId,
    /// The player pressing the option.
    pub submitter_id: PlayerId,
    /// Zero-based question index the option belongs to.
    pub question_index: usize,
    /// Zero-based option slot.
    pub option_index: usize,
}

impl Command for SubmitAnswer {
    fn command_type(&self) -> &'static str {
        "game.submit_answer"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

/// Command to discard a chat's session in any phase.
#[derive(Debug, Clone)]
pub struct CancelGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The chat whose session is discarded.
    pub chat_id: ChatId,
}

impl Command for CancelGame {
    fn command_type(&self) -> &'static str {
        "game.cancel"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

//! Outbound render interface.
//!
//! Renders describe what the transport should show; formatting into
//! chat messages is the transport's job.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DomainError;
use crate::types::{ChatId, PlayerId, RenderAnchor};

/// A player reference carried by renders that address someone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRef {
    /// External player identity, used for mentions.
    pub player_id: PlayerId,
    /// Display name.
    pub display_name: String,
}

/// One line of the final recap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecapEntry {
    /// Question prompt text.
    pub question_text: String,
    /// Who answered.
    pub player_name: String,
    /// The resolved answer.
    pub answer: String,
}

/// Everything the core asks the transport to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Render {
    /// Lobby state; edits the lobby message in place.
    LobbyProgress {
        /// Number of players joined so far.
        player_count: usize,
        /// Maximum number of players.
        max_players: usize,
        /// Display names in join order.
        player_names: Vec<String>,
        /// Seconds left before the lobby closes.
        seconds_remaining: i32,
    },
    /// The lobby closed without a game.
    LobbyAborted {
        /// Human-readable reason.
        reason: String,
    },
    /// The lobby closed and the first question is coming.
    GameStarting,
    /// A question addressed to its turn owner.
    QuestionPrompt {
        /// Zero-based question index (echoed back by `Answer`).
        question_index: usize,
        /// One-based question number.
        question_number: usize,
        /// Total number of questions.
        question_count: usize,
        /// Question prompt text.
        question_text: String,
        /// Button labels, in option order.
        option_labels: Vec<String>,
        /// The player who must answer.
        turn_owner: PlayerRef,
    },
    /// An answer was accepted; edits the question prompt in place.
    AnswerRecorded {
        /// One-based question number.
        question_number: usize,
        /// Total number of questions.
        question_count: usize,
        /// Question prompt text.
        question_text: String,
        /// Who answered.
        player_name: String,
        /// The resolved answer.
        answer: String,
    },
    /// The assembled story.
    FinalResult {
        /// Final sentence.
        sentence: String,
        /// Per-question recap, in plan order.
        recap: Vec<RecapEntry>,
    },
}

impl Render {
    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LobbyProgress { .. } => "lobby_progress",
            Self::LobbyAborted { .. } => "lobby_aborted",
            Self::GameStarting => "game_starting",
            Self::QuestionPrompt { .. } => "question_prompt",
            Self::AnswerRecorded { .. } => "answer_recorded",
            Self::FinalResult { .. } => "final_result",
        }
    }
}

/// Delivery side of the transport.
#[async_trait]
pub trait RenderSink: Send + Sync {
    /// Displays `render` in `chat_id`. With an `anchor`, the anchored
    /// message is edited in place; otherwise a new message is posted.
    ///
    /// Returns the handle of the message now showing the render, when
    /// the transport has one.
    async fn render(
        &self,
        chat_id: ChatId,
        anchor: Option<RenderAnchor>,
        render: &Render,
    ) -> Result<Option<RenderAnchor>, DomainError>;
}

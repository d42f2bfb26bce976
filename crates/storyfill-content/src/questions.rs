//! Question identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog;

/// Every question the game can ask, in canonical sentence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionId {
    /// Subject of the story.
    Who,
    /// Object of the story.
    Whom,
    /// Time of the event.
    When,
    /// Place of the event.
    Where,
    /// Possessor.
    Whose,
    /// What the story is about.
    Why,
    /// Accompanying action.
    DoingWhat,
    /// Manner of speaking; always the last question.
    HowSaid,
}

impl QuestionId {
    /// All identifiers, in canonical order.
    pub const ALL: [Self; 8] = [
        Self::Who,
        Self::Whom,
        Self::When,
        Self::Where,
        Self::Whose,
        Self::Why,
        Self::DoingWhat,
        Self::HowSaid,
    ];

    /// Stable identifier name, used for persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Who => "WHO",
            Self::Whom => "WHOM",
            Self::When => "WHEN",
            Self::Where => "WHERE",
            Self::Whose => "WHOSE",
            Self::Why => "WHY",
            Self::DoingWhat => "DOING_WHAT",
            Self::HowSaid => "HOW_SAID",
        }
    }

    /// Prompt text shown to players.
    #[must_use]
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Who => "ဘယ်သူက",
            Self::Whom => "ဘယ်သူ့ကို",
            Self::When => "ဘယ်အချိန်",
            Self::Where => "ဘယ်နေရာမှာ",
            Self::Whose => "ဘယ်သူ့ရဲ့",
            Self::Why => "ဘာအကြောင်း",
            Self::DoingWhat => "ဘာလုပ်ပြီး",
            Self::HowSaid => "ဘယ်လိုပြော",
        }
    }

    /// Marker appended after this question's answer in the final sentence.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Who => "က ",
            Self::Whom => "ကို ",
            Self::Whose => "ရဲ့ ",
            Self::When | Self::Where | Self::Why | Self::DoingWhat => " ",
            Self::HowSaid => "",
        }
    }

    /// Whether answers come from the shared character pool.
    #[must_use]
    pub fn is_character(self) -> bool {
        matches!(self, Self::Who | Self::Whom | Self::Whose)
    }

    /// Fixed option list for non-character questions; empty otherwise.
    #[must_use]
    pub fn options(self) -> &'static [&'static str] {
        match self {
            Self::When => &catalog::WHEN_OPTIONS,
            Self::Where => &catalog::WHERE_OPTIONS,
            Self::Why => &catalog::WHY_OPTIONS,
            Self::DoingWhat => &catalog::DOING_WHAT_OPTIONS,
            Self::HowSaid => &catalog::HOW_SAID_OPTIONS,
            Self::Who | Self::Whom | Self::Whose => &[],
        }
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored identifier name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown question identifier: {0}")]
pub struct ParseQuestionIdError(pub String);

impl FromStr for QuestionId {
    type Err = ParseQuestionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| ParseQuestionIdError(s.to_owned()))
    }
}

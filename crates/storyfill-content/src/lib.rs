//! Storyfill: static question and option catalog.
//!
//! Immutable tables only: the question identifiers with their prompt
//! text and sentence suffixes, the character-name pool, and the option
//! lists of every non-character question.

pub mod catalog;
pub mod questions;

pub use catalog::{CHARACTERS, WILDCARD};
pub use questions::{ParseQuestionIdError, QuestionId};

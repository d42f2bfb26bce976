//! Final sentence assembly.

use storyfill_content::QuestionId;

/// Joins answers into the final sentence.
///
/// Each answer is followed by its question's suffix; the plan order is
/// already grammatical, and `HOW_SAID` (always last) adds no suffix.
#[must_use]
pub fn assemble<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (QuestionId, &'a str)>,
{
    entries
        .into_iter()
        .fold(String::new(), |mut sentence, (question, answer)| {
            sentence.push_str(answer);
            sentence.push_str(question.suffix());
            sentence
        })
}

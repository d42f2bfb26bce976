//! Question plan builder.

use storyfill_content::QuestionId;

/// Fewest players a game can start with.
pub const MIN_PLAYERS: usize = 4;

/// Most players a lobby accepts.
pub const MAX_PLAYERS: usize = 8;

/// Returns the ordered questions for a game of `player_count` players.
///
/// Defined for `MIN_PLAYERS..=MAX_PLAYERS`, where the plan has exactly
/// one question per player. Smaller counts still yield `WHO`, `WHOM`
/// and `HOW_SAID`; larger counts yield the full eight-question plan.
#[must_use]
pub fn build_plan(player_count: usize) -> Vec<QuestionId> {
    let mut plan = vec![QuestionId::Who, QuestionId::Whom];
    if player_count >= 6 {
        plan.push(QuestionId::When);
    }
    if player_count >= 5 {
        plan.push(QuestionId::Where);
    }
    if player_count >= 7 {
        plan.push(QuestionId::Whose);
    }
    if player_count >= 4 {
        plan.push(QuestionId::Why);
    }
    if player_count >= 8 {
        plan.push(QuestionId::DoingWhat);
    }
    plan.push(QuestionId::HowSaid);
    plan
}

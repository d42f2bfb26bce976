//! Option selection with duplicate avoidance.
//!
//! Every question offers exactly [`OPTION_COUNT`] slots. Values that were
//! already used in the session are avoided until the unused pool runs
//! dry, then reused as backfill so the option set never shrinks.

use std::collections::BTreeSet;

use storyfill_content::{CHARACTERS, QuestionId, WILDCARD};
use storyfill_core::rng::{DeterministicRng, pick_index, shuffle};
use tracing::debug;

/// Number of options offered for every question.
pub const OPTION_COUNT: usize = 4;

/// Named slots offered for character questions; the last slot is the wildcard.
pub const NAMED_CHARACTER_SLOTS: usize = OPTION_COUNT - 1;

/// Produces the option set for `question`.
///
/// `used_characters` is the session-wide character pool; `used_options`
/// is the pool of this question type only.
#[must_use]
pub fn select_options(
    question: QuestionId,
    used_characters: &BTreeSet<String>,
    used_options: &BTreeSet<String>,
    rng: &mut dyn DeterministicRng,
) -> Vec<String> {
    if question.is_character() {
        let mut selected = draw_preferring_unused(
            &CHARACTERS,
            used_characters,
            NAMED_CHARACTER_SLOTS,
            rng,
        );
        selected.push(WILDCARD.to_owned());
        selected
    } else {
        draw_preferring_unused(question.options(), used_options, OPTION_COUNT, rng)
    }
}

/// Resolves a picked wildcard to a concrete character name.
///
/// Draws uniformly from the characters not used yet; once every name is
/// used, draws from the whole pool.
#[must_use]
pub fn resolve_wildcard(
    used_characters: &BTreeSet<String>,
    rng: &mut dyn DeterministicRng,
) -> String {
    let unused: Vec<&str> = CHARACTERS
        .iter()
        .copied()
        .filter(|name| !used_characters.contains(*name))
        .collect();
    let name = if unused.is_empty() {
        CHARACTERS[pick_index(rng, CHARACTERS.len())]
    } else {
        unused[pick_index(rng, unused.len())]
    };
    name.to_owned()
}

fn draw_preferring_unused(
    catalog: &[&str],
    used: &BTreeSet<String>,
    count: usize,
    rng: &mut dyn DeterministicRng,
) -> Vec<String> {
    let mut unused: Vec<&str> = catalog
        .iter()
        .copied()
        .filter(|value| !used.contains(*value))
        .collect();
    shuffle(rng, &mut unused);
    let mut selected: Vec<&str> = unused.into_iter().take(count).collect();

    if selected.len() < count {
        debug!(
            unused = selected.len(),
            wanted = count,
            "pool nearly exhausted, backfilling with used values"
        );
        let mut backfill: Vec<&str> = catalog
            .iter()
            .copied()
            .filter(|value| !selected.contains(value))
            .collect();
        shuffle(rng, &mut backfill);
        let missing = count - selected.len();
        selected.extend(backfill.into_iter().take(missing));
    }

    selected.into_iter().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use storyfill_core::rng::StdDeterministicRng;

    use super::*;

    fn names(range: std::ops::Range<usize>) -> BTreeSet<String> {
        CHARACTERS[range].iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_character_options_end_with_wildcard() {
        let mut rng = StdDeterministicRng::seeded(1);

        for question in [QuestionId::Who, QuestionId::Whom, QuestionId::Whose] {
            let options = select_options(question, &BTreeSet::new(), &BTreeSet::new(), &mut rng);

            assert_eq!(options.len(), OPTION_COUNT);
            assert_eq!(options[3], WILDCARD);
            assert!(options[..3].iter().all(|o| CHARACTERS.contains(&o.as_str())));
        }
    }

    #[test]
    fn test_character_options_skip_used_names() {
        let mut rng = StdDeterministicRng::seeded(2);
        let used = names(0..20);

        for _ in 0..50 {
            let options = select_options(QuestionId::Who, &used, &BTreeSet::new(), &mut rng);

            assert!(options[..3].iter().all(|o| !used.contains(o)));
        }
    }

    #[test]
    fn test_nearly_exhausted_pool_offers_every_remaining_name() {
        // 37 of 40 names used: the three remaining ones must all be offered.
        let mut rng = StdDeterministicRng::seeded(3);
        let used = names(0..37);

        let options = select_options(QuestionId::Whose, &used, &BTreeSet::new(), &mut rng);

        assert_eq!(options.len(), OPTION_COUNT);
        assert_eq!(options[3], WILDCARD);
        let offered: BTreeSet<String> = options[..3].iter().cloned().collect();
        assert_eq!(offered, names(37..40));
    }

    #[test]
    fn test_partially_exhausted_pool_backfills_without_duplicates() {
        let mut rng = StdDeterministicRng::seeded(4);
        let used = names(0..39);

        let options = select_options(QuestionId::Who, &used, &BTreeSet::new(), &mut rng);

        let named: HashSet<&String> = options[..3].iter().collect();
        assert_eq!(named.len(), 3);
        assert!(options.contains(&CHARACTERS[39].to_owned()));
    }

    #[test]
    fn test_fully_exhausted_pool_still_fills_three_named_slots() {
        let mut rng = StdDeterministicRng::seeded(5);
        let used = names(0..40);

        let options = select_options(QuestionId::Whom, &used, &BTreeSet::new(), &mut rng);

        let named: HashSet<&String> = options[..3].iter().collect();
        assert_eq!(named.len(), 3);
        assert_eq!(options[3], WILDCARD);
    }

    #[test]
    fn test_non_character_options_are_four_distinct_catalog_entries() {
        let mut rng = StdDeterministicRng::seeded(6);

        for question in QuestionId::ALL.into_iter().filter(|q| !q.is_character()) {
            let options = select_options(question, &BTreeSet::new(), &BTreeSet::new(), &mut rng);

            let unique: HashSet<&String> = options.iter().collect();
            assert_eq!(unique.len(), OPTION_COUNT);
            assert!(options.iter().all(|o| question.options().contains(&o.as_str())));
            assert!(!options.contains(&WILDCARD.to_owned()));
        }
    }

    #[test]
    fn test_non_character_options_prefer_unused_then_backfill() {
        let mut rng = StdDeterministicRng::seeded(7);
        let catalog = QuestionId::Why.options();
        let used: BTreeSet<String> = catalog[..8].iter().map(|s| (*s).to_owned()).collect();

        let options = select_options(QuestionId::Why, &BTreeSet::new(), &used, &mut rng);

        let unique: HashSet<&String> = options.iter().collect();
        assert_eq!(unique.len(), OPTION_COUNT);
        assert!(options.contains(&catalog[8].to_owned()));
        assert!(options.contains(&catalog[9].to_owned()));
    }

    #[test]
    fn test_character_pool_does_not_affect_non_character_questions() {
        let mut rng = StdDeterministicRng::seeded(8);
        let used_characters = names(0..40);

        let options = select_options(QuestionId::Where, &used_characters, &BTreeSet::new(), &mut rng);

        assert_eq!(options.len(), OPTION_COUNT);
    }

    #[test]
    fn test_wildcard_prefers_unused_characters() {
        let mut rng = StdDeterministicRng::seeded(9);
        let used = names(0..38);

        for _ in 0..50 {
            let name = resolve_wildcard(&used, &mut rng);

            assert!(!used.contains(&name));
        }
    }

    #[test]
    fn test_wildcard_reuses_when_every_character_is_used() {
        let mut rng = StdDeterministicRng::seeded(10);
        let used = names(0..40);

        let name = resolve_wildcard(&used, &mut rng);

        assert!(CHARACTERS.contains(&name.as_str()));
    }
}

//! Ordering of merged matches.

use std::cmp::Ordering;

use crate::query::Match;

/// Compares two matches: higher importance first, then higher usage count,
/// then higher score.
pub fn compare(lhs: &Match, rhs: &Match) -> Ordering {
    rhs.item
        .importance()
        .cmp(&lhs.item.importance())
        .then_with(|| rhs.item.usage_count().cmp(&lhs.item.usage_count()))
        .then_with(|| rhs.score.total_cmp(&lhs.score))
}

/// Sorts matches in place. The sort is stable: equal matches keep their
/// dispatch order, which follows extension registration order.
pub fn rank(matches: &mut [Match]) {
    matches.sort_by(compare);
}

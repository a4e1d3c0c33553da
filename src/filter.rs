use std::cmp::Reverse;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::model::TaskRecord;

/// Ranks `records` against `query` by task name and returns the indices of the matches.
///
/// An empty query is the identity: every index in registry order. Otherwise a record matches
/// when the query's characters appear in its name in order (case-insensitive). Matches are
/// ordered by descending skim score; equal scores keep registry order.
pub fn filter_indices(records: &[TaskRecord], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..records.len()).collect();
    }

    let matcher = SkimMatcherV2::default().ignore_case();
    let mut scored: Vec<(usize, i64)> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            matcher
                .fuzzy_match(&record.name, query)
                .map(|score| (index, score))
        })
        .collect();

    scored.sort_by_key(|&(_, score)| Reverse(score));
    scored.into_iter().map(|(index, _)| index).collect()
}

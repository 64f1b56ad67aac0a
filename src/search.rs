//! Phrase-proximity keyword search.
//!
//! Search recomputes over the full candidate list on every query; there is
//! no index. Every query token is mandatory. A candidate's score starts at
//! [`SEED`] and, for each query token in query order, is charged a gap
//! penalty when the token's word index is more than one past the previous
//! match, credited [`MATCH_BONUS`] and rescaled by
//! [`SCALE_NUMERATOR`]`/`[`SCALE_DENOMINATOR`] with integer truncation.
//! Adjacent matches therefore compound while scattered ones bleed points.
//!
//! Only words *after* the previous match are charged: a token found earlier
//! in the document than the one before it costs nothing extra.
//!
//! Arithmetic saturates. A long enough run of adjacent matches pins the
//! score at [`MAX_SCORE`], and every candidate pinned there ties.

use crate::catalog::{CatalogEntry, CatalogError, CatalogStore, CollectionFilter, OrderBy};
use crate::keywords::normalize;
use tracing::debug;

pub const SEED: i64 = -2;
pub const MATCH_BONUS: i64 = 10;
pub const SCALE_NUMERATOR: i64 = 20;
pub const SCALE_DENOMINATOR: i64 = 16;
/// Ceiling a saturated score settles at.
pub const MAX_SCORE: i64 = i64::MAX / SCALE_DENOMINATOR;

/// Anything with a stored, already-normalized keyword string.
pub trait Keyworded {
    fn keywords(&self) -> &str;
}

impl Keyworded for CatalogEntry {
    fn keywords(&self) -> &str {
        &self.keywords
    }
}

impl Keyworded for String {
    fn keywords(&self) -> &str {
        self
    }
}

impl Keyworded for &str {
    fn keywords(&self) -> &str {
        self
    }
}

/// Score one keyword string against a query.
///
/// Returns `None` when any query token is missing from `keywords`. Each
/// query token is matched against its first occurrence only, so repeating
/// a token in the query never looks further into the document.
pub fn score<S: AsRef<str>>(query: &[S], keywords: &str) -> Option<i64> {
    let words = normalize(keywords);
    let mut h = SEED;
    let mut prev: Option<usize> = None;

    for token in query {
        let token = token.as_ref();
        let i = words.iter().position(|word| word == token)?;

        if let Some(p) = prev
            && i > p + 1
        {
            h = h.saturating_sub((i - p) as i64 + 1);
        }
        h = h.saturating_add(MATCH_BONUS);
        h = h.saturating_mul(SCALE_NUMERATOR) / SCALE_DENOMINATOR;
        prev = Some(i);
    }

    Some(h)
}

/// Indices of the candidates tied at the best score, in input order.
fn winner_indices<S, T>(query: &[S], candidates: &[T]) -> Vec<usize>
where
    S: AsRef<str>,
    T: Keyworded,
{
    if query.is_empty() {
        return (0..candidates.len()).collect();
    }

    let mut best: Option<i64> = None;
    let mut winners = Vec::new();

    for (idx, candidate) in candidates.iter().enumerate() {
        let Some(h) = score(query, candidate.keywords()) else {
            continue;
        };
        match best {
            Some(b) if h < b => {}
            Some(b) if h == b => winners.push(idx),
            _ => {
                best = Some(h);
                winners.clear();
                winners.push(idx);
            }
        }
    }

    debug!(
        candidates = candidates.len(),
        winners = winners.len(),
        best = ?best,
        "ranked candidates"
    );
    winners
}

/// Every candidate tied for the highest score, in input order.
///
/// An empty query matches everything.
pub fn search<'a, S, T>(query: &[S], candidates: &'a [T]) -> Vec<&'a T>
where
    S: AsRef<str>,
    T: Keyworded,
{
    winner_indices(query, candidates)
        .into_iter()
        .map(|idx| &candidates[idx])
        .collect()
}

/// Fetch candidates from the catalog and rank them.
pub fn search_store<S: AsRef<str>>(
    store: &impl CatalogStore,
    query: &[S],
    filter: &CollectionFilter,
    order: OrderBy,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let candidates = store.list_candidates(filter, order)?;
    let keep = winner_indices(query, &candidates);

    let mut keep = keep.into_iter().peekable();
    Ok(candidates
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            if keep.peek() == Some(&idx) {
                keep.next();
                Some(entry)
            } else {
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalog;
    use crate::test_helpers::*;

    const NO_QUERY: &[&str] = &[];

    // =========================================================================
    // score
    // =========================================================================

    #[test]
    fn single_match_scores_ten() {
        // (-2 + 10) * 20 / 16 = 10
        assert_eq!(score(&["panda"], "red panda"), Some(10));
    }

    #[test]
    fn adjacent_matches_compound() {
        assert_eq!(score(&["red", "panda"], "red panda eating bamboo"), Some(25));
        // 25 + 10 = 35 → 700 / 16 = 43 (truncated)
        assert_eq!(
            score(&["red", "panda", "eating"], "red panda eating bamboo"),
            Some(43)
        );
    }

    #[test]
    fn adjacent_phrase_beats_scattered_words() {
        let adjacent = score(&["red", "panda"], "red panda eating bamboo").unwrap();
        let scattered = score(&["red", "panda"], "red fox eating bamboo today panda").unwrap();
        // gap of 5 costs 6: (10 - 6 + 10) * 20 / 16 = 17
        assert_eq!(scattered, 17);
        assert!(adjacent > scattered);
    }

    #[test]
    fn missing_token_excludes() {
        assert_eq!(score(&["red", "cat"], "red panda"), None);
        assert_eq!(score(&["red"], ""), None);
    }

    #[test]
    fn empty_query_scores_seed() {
        assert_eq!(score(NO_QUERY, "anything"), Some(SEED));
    }

    #[test]
    fn repeated_query_token_uses_first_occurrence() {
        // both "red"s resolve to index 0; no gap penalty
        assert_eq!(score(&["red", "red"], "red panda red"), Some(25));
    }

    #[test]
    fn backwards_order_is_not_penalized() {
        assert_eq!(
            score(&["panda", "red"], "red panda"),
            score(&["red", "panda"], "red panda")
        );
    }

    #[test]
    fn large_gaps_go_negative_with_truncation_toward_zero() {
        let filler = vec!["x"; 29].join(" ");
        let keywords = format!("a {filler} b");
        // b at index 30: 10 - 31 + 10 = -11 → -220 / 16 = -13
        assert_eq!(score(&["a", "b"], &keywords), Some(-13));
    }

    #[test]
    fn long_queries_saturate_instead_of_overflowing() {
        let query = vec!["a"; 200];
        assert_eq!(score(query.as_slice(), "a"), Some(MAX_SCORE));

        // a gap late in a saturated run is absorbed by the ceiling
        let mut gapped = vec!["a"; 199];
        gapped.push("b");
        assert_eq!(score(gapped.as_slice(), "a x x x b"), Some(MAX_SCORE));
    }

    #[test]
    fn saturated_candidates_tie() {
        let query = vec!["a"; 300];
        let candidates = ["a", "b", "x a"];
        assert_eq!(search(query.as_slice(), &candidates), vec![&"a", &"x a"]);
    }

    // =========================================================================
    // search
    // =========================================================================

    #[test]
    fn empty_query_returns_everything_in_order() {
        let candidates = ["b", "a", "c"];
        let winners = search(NO_QUERY, &candidates);
        assert_eq!(winners, vec![&"b", &"a", &"c"]);
    }

    #[test]
    fn only_top_score_survives() {
        let candidates = [
            "red fox eating bamboo today panda",
            "red panda eating bamboo",
            "blue panda",
        ];
        let winners = search(&["red", "panda"], &candidates);
        assert_eq!(winners, vec![&"red panda eating bamboo"]);
    }

    #[test]
    fn ties_are_all_kept_in_input_order() {
        let candidates = vec![
            "cat on a mat".to_string(),
            "red panda".to_string(),
            "cat on a mat".to_string(),
        ];
        let winners = search(&["cat", "mat"], &candidates);
        assert_eq!(winners.len(), 2);
        assert!(std::ptr::eq(winners[0], &candidates[0]));
        assert!(std::ptr::eq(winners[1], &candidates[2]));
    }

    #[test]
    fn partial_matches_never_win() {
        let candidates = ["red panda red panda red panda", "panda"];
        let winners = search(&["red", "panda", "bamboo"], &candidates);
        assert!(winners.is_empty());
    }

    #[test]
    fn negative_best_score_still_wins() {
        let filler = vec!["x"; 29].join(" ");
        let far = format!("a {filler} b");
        let candidates = [far.as_str(), "a only"];
        let winners = search(&["a", "b"], &candidates);
        assert_eq!(winners, vec![&far.as_str()]);
    }

    #[test]
    fn works_over_catalog_entries() {
        let entries = vec![
            entry_with_keywords(1, "sunset over the lake"),
            entry_with_keywords(2, "lake sunset"),
        ];
        let winners = search(&["lake", "sunset"], &entries);
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].id, 2);
    }

    // =========================================================================
    // search_store
    // =========================================================================

    #[test]
    fn search_store_filters_catalog() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        for title in ["Red Panda", "Red fox and a panda", "Blue whale"] {
            let mut e = entry(crate::catalog::EntryKind::Jpeg, title);
            catalog.create(&mut e).unwrap();
        }

        let winners = search_store(
            &catalog,
            &["red", "panda"],
            &CollectionFilter::All,
            OrderBy::IdAsc,
        )
        .unwrap();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].title, "Red Panda");

        let all = search_store(&catalog, NO_QUERY, &CollectionFilter::All, OrderBy::IdDesc).unwrap();
        let titles: Vec<_> = all.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Blue whale", "Red fox and a panda", "Red Panda"]);
    }
}

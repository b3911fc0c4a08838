use crate::config::clamp_distance;
use crate::text_map::token::{is_single_token, tokenize};

/// How a span matched its term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy(u8),
}

/// Half-open byte range `[start, end)` of the full text that matched `term`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    pub term: String,
    pub kind: MatchKind,
}

impl MatchSpan {
    /// The matched substring
    pub fn snippet<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or_default()
    }
}

/// All case-insensitive, non-overlapping literal occurrences of `term`, left to right
pub fn find_exact(text: &str, term: &str) -> Vec<MatchSpan> {
    let needle: Vec<char> = term.chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut resume_at = 0;

    for (start, _) in text.char_indices() {
        if start < resume_at {
            continue;
        }
        if let Some(len) = match_len_at(&text[start..], &needle) {
            spans.push(MatchSpan {
                start,
                end: start + len,
                term: term.to_string(),
                kind: MatchKind::Exact,
            });
            resume_at = start + len;
        }
    }

    spans
}

/// Every token within `max_distance` edits of `term`.
///
/// Matching is token granular: a hit always covers one whole token. Terms that are
/// not a single token fall back to [`find_exact`].
pub fn find_fuzzy(text: &str, term: &str, max_distance: u8) -> Vec<MatchSpan> {
    if !is_single_token(term) {
        return find_exact(text, term);
    }

    let max_distance = clamp_distance(max_distance);
    let needle = fold(term.trim());

    tokenize(text)
        .into_iter()
        .filter_map(|token| {
            let candidate = fold(token.text);
            let distance = bounded_distance(&candidate, &needle, max_distance as usize)?;
            Some(MatchSpan {
                start: token.start,
                end: token.end,
                term: term.to_string(),
                kind: MatchKind::Fuzzy(distance as u8),
            })
        })
        .collect()
}

/// Exact and fuzzy hits for one term, ordered by position.
/// Spans covering the same range collapse into one, keeping the exact hit.
/// Surrounding whitespace in `term` is ignored.
pub fn find_all(text: &str, term: &str, max_distance: u8) -> Vec<MatchSpan> {
    let term = term.trim();
    if term.is_empty() {
        return Vec::new();
    }

    let mut spans = find_exact(text, term);
    spans.extend(find_fuzzy(text, term, max_distance));

    // Exact sorts before Fuzzy for equal ranges, so dedup keeps it
    spans.sort_by_key(|s| (s.start, s.end, matches!(s.kind, MatchKind::Fuzzy(_))));
    spans.dedup_by(|later, earlier| later.start == earlier.start && later.end == earlier.end);
    spans
}

/// Levenshtein distance between `a` and `b` if it is at most `k`, computed over a
/// diagonal band of width `2k + 1`.
pub fn bounded_distance(a: &[char], b: &[char], k: usize) -> Option<usize> {
    let (n, m) = (a.len(), b.len());
    if n.abs_diff(m) > k {
        return None;
    }
    if k == 0 {
        return (a == b).then_some(0);
    }

    // anything above k is "too far"; saturate there
    let far = k + 1;
    let mut prev: Vec<usize> = (0..=m).map(|j| if j <= k { j } else { far }).collect();
    let mut cur = vec![far; m + 1];

    for i in 1..=n {
        let lo = i.saturating_sub(k).max(1);
        let hi = (i + k).min(m);

        cur[0] = if i <= k { i } else { far };
        if lo > 1 {
            cur[lo - 1] = far;
        }

        let mut row_min = cur[0];
        for j in lo..=hi {
            let substitution = prev[j - 1] + usize::from(a[i - 1] != b[j - 1]);
            let value = substitution.min(prev[j] + 1).min(cur[j - 1] + 1).min(far);
            cur[j] = value;
            row_min = row_min.min(value);
        }
        if hi < m {
            cur[hi + 1] = far;
        }

        if row_min > k {
            return None;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let distance = prev[m];
    (distance <= k).then_some(distance)
}

/// Lowercase a string char by char, the same folding `find_exact` compares with
fn fold(s: &str) -> Vec<char> {
    s.chars().flat_map(char::to_lowercase).collect()
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte length of the prefix of `haystack` matching `needle`, if it matches
fn match_len_at(haystack: &str, needle: &[char]) -> Option<usize> {
    let mut chars = haystack.char_indices();
    for &expected in needle {
        let (_, c) = chars.next()?;
        if !chars_eq_ignore_case(c, expected) {
            return None;
        }
    }
    Some(chars.next().map_or(haystack.len(), |(idx, _)| idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ranges(spans: &[MatchSpan]) -> Vec<(usize, usize)> {
        spans.iter().map(|s| (s.start, s.end)).collect()
    }

    fn distance(a: &str, b: &str, k: usize) -> Option<usize> {
        bounded_distance(&fold(a), &fold(b), k)
    }

    /// Full-table Levenshtein used as the reference
    fn levenshtein(a: &[char], b: &[char]) -> usize {
        let mut prev: Vec<usize> = (0..=b.len()).collect();
        for i in 1..=a.len() {
            let mut cur = vec![i; b.len() + 1];
            for j in 1..=b.len() {
                let cost = usize::from(a[i - 1] != b[j - 1]);
                cur[j] = (prev[j - 1] + cost).min(prev[j] + 1).min(cur[j - 1] + 1);
            }
            prev = cur;
        }
        prev[b.len()]
    }

    #[test]
    fn test_find_exact_case_insensitive() {
        let text = "Bravo bravo BRAVO";
        let spans = find_exact(text, "bravo");
        assert_eq!(ranges(&spans), vec![(0, 5), (6, 11), (12, 17)]);
        assert!(spans.iter().all(|s| s.kind == MatchKind::Exact));
        assert_eq!(spans[2].snippet(text), "BRAVO");
    }

    #[test]
    fn test_find_exact_non_overlapping() {
        assert_eq!(ranges(&find_exact("aaaa", "aa")), vec![(0, 2), (2, 4)]);
        assert_eq!(ranges(&find_exact("aaa", "aa")), vec![(0, 2)]);
    }

    #[test]
    fn test_find_exact_substring_inside_token() {
        assert_eq!(ranges(&find_exact("colorful color", "color")), vec![(0, 5), (9, 14)]);
    }

    #[test]
    fn test_find_exact_empty_term() {
        assert!(find_exact("anything", "").is_empty());
        assert!(find_exact("", "x").is_empty());
    }

    #[test]
    fn test_find_exact_multibyte_offsets() {
        let text = "Größe und GRÖSSE größe";
        let spans = find_exact(text, "größe");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].snippet(text), "größe");
    }

    #[test]
    fn test_color_colour_scenario() {
        let text = "color colour";
        let fuzzy = find_fuzzy(text, "color", 1);
        assert_eq!(ranges(&fuzzy), vec![(0, 5), (6, 12)]);
        assert_eq!(fuzzy[0].kind, MatchKind::Fuzzy(0));
        assert_eq!(fuzzy[1].kind, MatchKind::Fuzzy(1));

        let exact = find_exact(text, "color");
        assert_eq!(ranges(&exact), vec![(0, 5)]);
    }

    #[test]
    fn test_find_all_merges_exact_and_fuzzy() {
        let spans = find_all("color colour colorful", "color", 1);
        assert_eq!(ranges(&spans), vec![(0, 5), (6, 12), (13, 18)]);
        assert_eq!(spans[0].kind, MatchKind::Exact);
        assert_eq!(spans[1].kind, MatchKind::Fuzzy(1));
        assert_eq!(spans[2].kind, MatchKind::Exact);
    }

    #[test]
    fn test_padded_term_counts_each_occurrence_once() {
        let spans = find_all("Alpha Bravo", " Bravo ", 1);
        assert_eq!(ranges(&spans), vec![(6, 11)]);
        assert_eq!(spans[0].kind, MatchKind::Exact);
        assert_eq!(spans[0].term, "Bravo");
        assert!(find_all("Alpha Bravo", "   ", 1).is_empty());
    }

    #[test]
    fn test_absent_term_yields_nothing() {
        let text = "Alpha Bravo\nCharlie Delta";
        assert!(find_fuzzy(text, "Zephyr", 2).is_empty());
        assert!(find_all(text, "Zephyr", 2).is_empty());
    }

    #[test]
    fn test_multi_word_term_degrades_to_exact() {
        let text = "Alpha Bravo alpha bravo Alpah Bravo";
        let spans = find_fuzzy(text, "alpha bravo", 3);
        assert_eq!(ranges(&spans), vec![(0, 11), (12, 23)]);
        assert!(spans.iter().all(|s| s.kind == MatchKind::Exact));
    }

    #[test]
    fn test_distance_is_clamped() {
        // 8 edits apart; a requested 200 is clamped to 5
        assert!(find_fuzzy("x", "abcdefgh", 200).is_empty());
        assert_eq!(find_fuzzy("abc", "abcdefgh", 200).len(), 1);
        assert_eq!(find_fuzzy("cat", "cats", 9).len(), 1);
    }

    #[test]
    fn test_bounded_distance_basics() {
        assert_eq!(distance("kitten", "sitting", 3), Some(3));
        assert_eq!(distance("kitten", "sitting", 2), None);
        assert_eq!(distance("", "abc", 3), Some(3));
        assert_eq!(distance("abc", "", 2), None);
        assert_eq!(distance("Color", "cOLOR", 0), Some(0));
        assert_eq!(distance("flaw", "lawn", 2), Some(2));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the banded computation agrees with the full table whenever it accepts
            #[test]
            fn bounded_agrees_with_reference(a in "[a-d]{0,8}", b in "[a-d]{0,8}", k in 0usize..6) {
                let (a, b) = (fold(&a), fold(&b));
                let reference = levenshtein(&a, &b);
                let bounded = bounded_distance(&a, &b, k);
                if reference <= k {
                    prop_assert_eq!(bounded, Some(reference));
                } else {
                    prop_assert_eq!(bounded, None);
                }
            }

            /// Property: distance is symmetric
            #[test]
            fn distance_is_symmetric(a in "[a-d]{0,8}", b in "[a-d]{0,8}") {
                prop_assert_eq!(distance(&a, &b, 5), distance(&b, &a, 5));
            }

            /// Property: accepted pairs satisfy the triangle inequality
            #[test]
            fn distance_triangle_inequality(a in "[a-c]{0,6}", b in "[a-c]{0,6}", c in "[a-c]{0,6}") {
                if let (Some(ab), Some(bc), Some(ac)) =
                    (distance(&a, &b, 5), distance(&b, &c, 5), distance(&a, &c, 5))
                {
                    prop_assert!(ac <= ab + bc);
                }
            }

            /// Property: k non-overlapping occurrences give k ordered spans
            #[test]
            fn exact_counts_occurrences(k in 0usize..6, filler in "[ xyz]{1,4}") {
                let mut text = String::new();
                for i in 0..k {
                    text.push_str(&filler);
                    text.push_str(if i % 2 == 0 { "Bravo" } else { "bRAVO" });
                }
                text.push_str(&filler);
                let spans = find_exact(&text, "bravo");
                prop_assert_eq!(spans.len(), k);
                for pair in spans.windows(2) {
                    prop_assert!(pair[0].end <= pair[1].start);
                }
            }

            /// Property: distance 0 fuzzy hits are exactly the whole-token exact hits
            #[test]
            fn zero_distance_matches_whole_token_exact(words in prop::collection::vec("[abAB]{1,3}", 0..10), term in "[ab]{1,3}") {
                let text = words.join(" ");
                let token_ranges: Vec<(usize, usize)> =
                    tokenize(&text).iter().map(|t| (t.start, t.end)).collect();
                let exact: Vec<(usize, usize)> = ranges(&find_exact(&text, &term))
                    .into_iter()
                    .filter(|r| token_ranges.contains(r))
                    .collect();
                prop_assert_eq!(ranges(&find_fuzzy(&text, &term, 0)), exact);
            }
        }
    }
}

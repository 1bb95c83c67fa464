//! String metrics
//!
//! Both metrics operate on Unicode scalar values, so lengths here are
//! `chars().count()`, not byte lengths.

use crate::types::MetricBundle;

/// Levenshtein distance (insert, delete and substitute all cost 1)
///
/// Uses two rolling rows sized to the shorter string.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (longer, shorter) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };

    if shorter.is_empty() {
        return longer.len();
    }

    let mut prev_row: Vec<usize> = (0..=shorter.len()).collect();
    let mut current_row = vec![0usize; shorter.len() + 1];

    for (i, lc) in longer.iter().enumerate() {
        current_row[0] = i + 1;
        for (j, sc) in shorter.iter().enumerate() {
            let cost = usize::from(lc != sc);
            current_row[j + 1] = (current_row[j] + 1)
                .min(prev_row[j + 1] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut current_row);
    }

    prev_row[shorter.len()]
}

/// Length of the longest run of characters shared by `a` and `b`
pub fn longest_common_substring_length(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // dp[j] holds the run length ending at a[i-1], b[j-1]
    let mut prev = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    let mut max = 0;

    for ac in &a {
        for (j, bc) in b.iter().enumerate() {
            current[j + 1] = if ac == bc { prev[j] + 1 } else { 0 };
            max = max.max(current[j + 1]);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    max
}

/// Compute the full metric bundle for a pair of answers
///
/// Normalized values divide by the longer string's length and are 0 when
/// both strings are empty.
pub fn score(target: &str, candidate: &str) -> MetricBundle {
    let max_len = target.chars().count().max(candidate.chars().count());
    if max_len == 0 {
        return MetricBundle {
            raw_lev: 0,
            norm_lev: 0.0,
            raw_lcs: 0,
            norm_lcs: 0.0,
        };
    }

    let raw_lev = edit_distance(target, candidate);
    let raw_lcs = longest_common_substring_length(target, candidate);

    MetricBundle {
        raw_lev,
        norm_lev: raw_lev as f64 / max_len as f64,
        raw_lcs,
        norm_lcs: raw_lcs as f64 / max_len as f64,
    }
}

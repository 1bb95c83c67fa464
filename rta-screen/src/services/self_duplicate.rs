//! Self-duplicate check
//!
//! Flags answers a participant repeated across questions of the same
//! submission. Every unordered pair is scored and run through the exact
//! classifier; no length gate is applied.

use crate::matching::{score, MatchClassifier};
use std::collections::BTreeMap;

/// Flag each question whose answer matches another answer of the same participant
///
/// Pairs where both answers are empty are skipped. Every key of `cleaned`
/// appears in the result.
pub fn check_for_self_duplicate_responses(
    classifier: &MatchClassifier,
    cleaned: &BTreeMap<String, String>,
) -> BTreeMap<String, bool> {
    let mut flags: BTreeMap<String, bool> = cleaned.keys().map(|k| (k.clone(), false)).collect();
    let entries: Vec<(&String, &String)> = cleaned.iter().collect();

    for (i, (key1, s1)) in entries.iter().enumerate() {
        for (key2, s2) in &entries[i + 1..] {
            if s1.is_empty() && s2.is_empty() {
                continue;
            }
            let metrics = score(s1, s2);
            if classifier.is_match(s1, s2, &metrics) {
                tracing::debug!(first = %key1, second = %key2, "Self-duplicate pair");
                flags.insert((*key1).clone(), true);
                flags.insert((*key2).clone(), true);
            }
        }
    }

    flags
}

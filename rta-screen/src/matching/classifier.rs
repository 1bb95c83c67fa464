//! Match classifier
//!
//! Two stages share one set of thresholds:
//! 1. `should_compare` - a length-only gate evaluated before any metric is
//!    computed
//! 2. `is_match` - the exact rule evaluated on a computed `MetricBundle`
//!
//! With the default `raw_lcs` of 100 the gate rejects every pair whose
//! shorter answer is under 100 characters, even pairs `is_match` would
//! accept. Both stages keep their configured thresholds; whether the gate
//! runs at all is a configuration choice made by the caller.

use crate::types::MetricBundle;
use rta_common::config::MatchThresholds;

/// Applies the configured thresholds to answer pairs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchClassifier {
    thresholds: MatchThresholds,
}

impl Default for MatchClassifier {
    fn default() -> Self {
        Self::new(MatchThresholds::default())
    }
}

impl MatchClassifier {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    /// Stage 1: decide from lengths alone whether metrics are worth computing
    ///
    /// Admissible iff all hold, with `diff = longer - shorter`:
    /// - `diff / longer <= norm_lev`
    /// - not (`longer > 5` and `diff >= raw_lev`)
    /// - `shorter >= raw_lcs`
    /// - `shorter / longer >= norm_lcs`
    ///
    /// Two empty strings are never admissible.
    pub fn should_compare(&self, a: &str, b: &str) -> bool {
        let (len_a, len_b) = (a.chars().count(), b.chars().count());
        let longer = len_a.max(len_b);
        let shorter = len_a.min(len_b);
        if longer == 0 {
            return false;
        }
        let diff = longer - shorter;
        let t = &self.thresholds;

        diff as f64 / longer as f64 <= t.norm_lev
            && !(longer > 5 && diff >= t.raw_lev)
            && shorter >= t.raw_lcs
            && shorter as f64 / longer as f64 >= t.norm_lcs
    }

    /// Stage 2: exact duplicate decision
    ///
    /// Any single satisfied signal makes the pair a match.
    pub fn is_match(&self, s1: &str, s2: &str, metrics: &MetricBundle) -> bool {
        let max_len = s1.chars().count().max(s2.chars().count());
        let t = &self.thresholds;

        metrics.norm_lev < t.norm_lev
            || (metrics.raw_lev < t.raw_lev && max_len > 5)
            || (metrics.raw_lev <= 1 && max_len > 2)
            || metrics.norm_lcs >= t.norm_lcs
            || metrics.raw_lcs >= t.raw_lcs
    }
}

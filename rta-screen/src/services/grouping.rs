//! Grouping resolver
//!
//! Turns the scored candidates of one question into a group decision:
//! 1. Keep candidates the classifier calls a match
//! 2. Drop candidates whose historical group id is untrusted
//! 3. Restrict to the candidates with the smallest raw edit distance
//! 4. Majority vote over their group ids, with an explicit tie-break
//!
//! The duplicate list reports every trusted match, including those whose
//! group lost the vote.

use crate::matching::MatchClassifier;
use crate::types::ScoredCandidate;
use rta_common::config::TieBreak;

/// Outcome of resolving one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No trusted match; the caller allocates a fresh group
    NoMatch,
    /// Join `group`; `duplicates` lists every matching historical answer
    Matched { group: i64, duplicates: Vec<String> },
}

/// Resolves group membership from scored candidates
#[derive(Debug, Clone, Copy)]
pub struct GroupingResolver {
    classifier: MatchClassifier,
    tie_break: TieBreak,
}

impl GroupingResolver {
    pub fn new(classifier: MatchClassifier, tie_break: TieBreak) -> Self {
        Self {
            classifier,
            tie_break,
        }
    }

    /// Resolve a question from the candidates of all successful batches
    ///
    /// The result depends only on the candidate set and its order, never on
    /// which batch finished first.
    pub fn resolve(&self, scored: &[ScoredCandidate]) -> Resolution {
        let matches: Vec<(&ScoredCandidate, i64)> = scored
            .iter()
            .filter(|s| {
                self.classifier
                    .is_match(&s.target, &s.candidate.response, &s.metrics)
            })
            .filter_map(|s| s.candidate.response_group.map(|group| (s, group)))
            .collect();

        let Some(min_raw_lev) = matches.iter().map(|(s, _)| s.metrics.raw_lev).min() else {
            return Resolution::NoMatch;
        };

        // (group, votes) in first-seen order
        let mut votes: Vec<(i64, usize)> = Vec::new();
        for (_, group) in matches.iter().filter(|(s, _)| s.metrics.raw_lev == min_raw_lev) {
            match votes.iter_mut().find(|(g, _)| g == group) {
                Some((_, count)) => *count += 1,
                None => votes.push((*group, 1)),
            }
        }

        let Some(group) = self.pick(&votes) else {
            return Resolution::NoMatch;
        };

        tracing::debug!(
            group,
            min_raw_lev,
            matches = matches.len(),
            candidate_groups = votes.len(),
            "Resolved response group"
        );

        Resolution::Matched {
            group,
            duplicates: matches
                .iter()
                .map(|(s, _)| s.candidate.response.clone())
                .collect(),
        }
    }

    fn pick(&self, votes: &[(i64, usize)]) -> Option<i64> {
        let top = votes.iter().map(|(_, count)| *count).max()?;
        let mut leaders = votes.iter().filter(|(_, count)| *count == top);
        match self.tie_break {
            TieBreak::FirstSeen => leaders.next().map(|(group, _)| *group),
            TieBreak::LowestGroup => leaders.map(|(group, _)| *group).min(),
        }
    }
}

//! Core types for cross-duplicate screening
//!
//! Data flows through these types in order:
//! - `HistoricalRecord`: a stored submission from another participant
//! - `Candidate`: one historical answer paired against the current answer
//! - `ScoredCandidate`: a candidate with its `MetricBundle` attached
//! - `CrossDuplicateReport`: the per-question outcome returned to callers

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Group reserved for empty answers
pub const EMPTY_ANSWER_GROUP: i64 = 0;

/// One participant's stored submission for a survey
///
/// Answers are kept as submitted; they are cleaned when candidates are
/// built. Group ids are kept as raw JSON because stored data may carry
/// values that are not integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub participant_id: String,
    pub responses: BTreeMap<String, String>,
    #[serde(default)]
    pub response_groups: BTreeMap<String, Value>,
}

impl HistoricalRecord {
    /// Group previously assigned to `question_id`
    ///
    /// Missing, `null` and `false` read as group 0. Integral numbers are
    /// trusted. Anything else (strings, fractions, objects) is `None` and
    /// never anchors a grouping decision.
    pub fn group_for(&self, question_id: &str) -> Option<i64> {
        match self.response_groups.get(question_id) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Some(EMPTY_ANSWER_GROUP),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Some(i)
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                }
            }
            Some(_) => None,
        }
    }
}

/// A historical answer to compare against the current answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Cleaned historical answer
    #[serde(rename = "finalState")]
    pub response: String,
    /// Participant who gave the historical answer
    #[serde(rename = "participantId")]
    pub participant_id: String,
    /// That participant's group for the question (`None` when untrusted)
    #[serde(rename = "responseGroup")]
    pub response_group: Option<i64>,
}

/// Edit-distance and common-substring metrics for one pair of answers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub raw_lev: usize,
    pub norm_lev: f64,
    pub raw_lcs: usize,
    pub norm_lcs: f64,
}

/// A candidate annotated with metrics against the current answer
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Current participant's cleaned answer
    pub target: String,
    pub candidate: Candidate,
    pub metrics: MetricBundle,
}

/// How a question's group id was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSource {
    /// Empty answer, reserved group 0
    EmptyAnswer,
    /// Joined the best-supported group of matching historical answers
    Matched,
    /// Fresh id from the group counter
    Allocated,
    /// Pseudo-random id issued because the counter or pipeline failed
    Fallback,
}

/// Group assigned to one question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignment {
    pub group: i64,
    pub source: GroupSource,
}

impl GroupAssignment {
    pub fn empty_answer() -> Self {
        Self {
            group: EMPTY_ANSWER_GROUP,
            source: GroupSource::EmptyAnswer,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == GroupSource::Fallback
    }
}

/// Cross-duplicate outcome for one submission
///
/// Every question id of the submission appears in both maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossDuplicateReport {
    pub duplicate_responses: BTreeMap<String, Vec<String>>,
    pub response_groups: BTreeMap<String, i64>,
    /// Question ids whose group id is a non-authoritative fallback
    pub degraded_groups: BTreeSet<String>,
}

impl CrossDuplicateReport {
    /// Record the outcome for one question
    pub fn insert(&mut self, question_id: &str, duplicates: Vec<String>, assignment: GroupAssignment) {
        self.duplicate_responses
            .insert(question_id.to_string(), duplicates);
        self.response_groups
            .insert(question_id.to_string(), assignment.group);
        if assignment.is_fallback() {
            self.degraded_groups.insert(question_id.to_string());
        }
    }
}

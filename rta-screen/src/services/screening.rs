//! Screening service
//!
//! Runs the quality checks for one submission:
//! - validates the decoded request body
//! - cleans every answer once
//! - runs the cross-duplicate and self-duplicate checks under one timeout
//! - saves the submission with its assigned groups

use super::cross_duplicate::CrossDuplicateChecker;
use super::self_duplicate::check_for_self_duplicate_responses;
use crate::store::ResponseStore;
use crate::types::HistoricalRecord;
use rta_common::clean_response;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Check label for an answer that matches another participant's answer
pub const CROSS_DUPLICATE_CHECK: &str = "Cross-duplicate response";

/// Check label for an answer that matches another answer of the same participant
pub const SELF_DUPLICATE_CHECK: &str = "Self-duplicate response";

/// Raw answers shorter than this never receive the cross-duplicate flag
pub const CROSS_DUPLICATE_MIN_CHARS: usize = 20;

/// Screening errors
#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("{0}")]
    Invalid(String),

    #[error("Request timed out")]
    TimedOut,
}

/// A validated screening request
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningRequest {
    pub survey_id: String,
    pub participant_id: String,
    /// Question text per question id
    pub questions: BTreeMap<String, Value>,
    /// Raw answer per question id, same keys as `questions`
    pub responses: BTreeMap<String, String>,
}

impl ScreeningRequest {
    /// Validate a decoded request body
    pub fn from_json(body: Value) -> Result<Self, ScreeningError> {
        let mut fields = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut take = |name: &'static str| match fields.remove(name) {
            None | Some(Value::Null) => (name, None),
            Some(value) => (name, Some(value)),
        };
        let questions = take("questions");
        let survey_id = take("survey_id");
        let participant_id = take("participant_id");
        let responses = take("responses");

        let missing: Vec<&str> = [&questions, &survey_id, &participant_id, &responses]
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ScreeningError::Invalid(format!("Missing {}", missing.join(", "))));
        }

        let (questions, responses) = match (questions.1, responses.1) {
            (Some(Value::Object(q)), Some(Value::Object(r))) => (q, r),
            (q, r) => {
                let non_objects: Vec<&str> = [("questions", q), ("responses", r)]
                    .into_iter()
                    .filter(|(_, v)| !matches!(v, Some(Value::Object(_))))
                    .map(|(name, _)| name)
                    .collect();
                return Err(ScreeningError::Invalid(format!(
                    "The following fields must be objects: {}",
                    non_objects.join(", ")
                )));
            }
        };

        let (survey_id, participant_id) = match (survey_id.1, participant_id.1) {
            (Some(Value::String(s)), Some(Value::String(p))) => (s, p),
            (s, p) => {
                let bad: Vec<&str> = [("survey_id", s), ("participant_id", p)]
                    .into_iter()
                    .filter(|(_, v)| !matches!(v, Some(Value::String(_))))
                    .map(|(name, _)| name)
                    .collect();
                return Err(ScreeningError::Invalid(format!(
                    "The following fields must be strings: {}",
                    bad.join(", ")
                )));
            }
        };

        let question_keys: BTreeSet<&String> = questions.keys().collect();
        let response_keys: BTreeSet<&String> = responses.keys().collect();
        if question_keys != response_keys {
            return Err(ScreeningError::Invalid(
                "Questions and responses must have the same keys".to_string(),
            ));
        }

        let mut answers = BTreeMap::new();
        for (question_id, value) in responses {
            let answer = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(ScreeningError::Invalid(format!(
                        "Response for {} must be a string",
                        question_id
                    )));
                }
            };
            answers.insert(question_id, answer);
        }

        Ok(Self {
            survey_id,
            participant_id,
            questions: questions.into_iter().collect(),
            responses: answers,
        })
    }
}

/// Result of screening one submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningOutcome {
    /// Check labels raised per question id (empty list when clean)
    pub checks: BTreeMap<String, Vec<String>>,
    /// Response group per question id
    pub response_groups: BTreeMap<String, i64>,
    /// Question ids whose group is a non-authoritative fallback
    pub degraded_groups: BTreeSet<String>,
}

/// Screening entry point shared by the HTTP handlers
#[derive(Clone)]
pub struct ScreeningService {
    checker: CrossDuplicateChecker,
    store: Arc<dyn ResponseStore>,
    timeout: Duration,
}

impl ScreeningService {
    pub fn new(checker: CrossDuplicateChecker, store: Arc<dyn ResponseStore>, timeout: Duration) -> Self {
        Self {
            checker,
            store,
            timeout,
        }
    }

    /// Screen one submission
    ///
    /// # Errors
    /// `TimedOut` when the checks do not finish within the configured bound.
    /// Work already in flight is abandoned, not cancelled, and nothing is
    /// saved for a timed-out request.
    pub async fn screen(&self, request: ScreeningRequest) -> Result<ScreeningOutcome, ScreeningError> {
        let cleaned: BTreeMap<String, String> = request
            .responses
            .iter()
            .map(|(id, answer)| (id.clone(), clean_response(answer)))
            .collect();

        let checks = async {
            let classifier = *self.checker.classifier();
            let own_answers = cleaned.clone();
            let self_duplicates = tokio::task::spawn_blocking(move || {
                check_for_self_duplicate_responses(&classifier, &own_answers)
            });

            let report = self
                .checker
                .check_for_cross_duplicate_responses(
                    &cleaned,
                    &request.survey_id,
                    &request.participant_id,
                )
                .await;

            let self_duplicates = self_duplicates.await.unwrap_or_else(|e| {
                error!(error = %e, "Self-duplicate check failed");
                BTreeMap::new()
            });
            (report, self_duplicates)
        };

        let (report, self_duplicates) = tokio::time::timeout(self.timeout, checks)
            .await
            .map_err(|_| {
                warn!(
                    survey_id = %request.survey_id,
                    participant_id = %request.participant_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Screening timed out"
                );
                ScreeningError::TimedOut
            })?;

        let mut checks: BTreeMap<String, Vec<String>> = request
            .questions
            .keys()
            .map(|id| (id.clone(), Vec::new()))
            .collect();

        for (question_id, duplicates) in &report.duplicate_responses {
            let long_enough = request
                .responses
                .get(question_id)
                .is_some_and(|raw| raw.chars().count() >= CROSS_DUPLICATE_MIN_CHARS);
            if long_enough && !duplicates.is_empty() {
                checks
                    .entry(question_id.clone())
                    .or_default()
                    .push(CROSS_DUPLICATE_CHECK.to_string());
            }
        }

        for (question_id, flagged) in &self_duplicates {
            if *flagged {
                checks
                    .entry(question_id.clone())
                    .or_default()
                    .push(SELF_DUPLICATE_CHECK.to_string());
            }
        }

        let flagged = checks.values().filter(|c| !c.is_empty()).count();
        info!(
            survey_id = %request.survey_id,
            participant_id = %request.participant_id,
            questions = checks.len(),
            flagged,
            "Submission screened"
        );

        self.save(&request, &report.response_groups).await;

        Ok(ScreeningOutcome {
            checks,
            response_groups: report.response_groups,
            degraded_groups: report.degraded_groups,
        })
    }

    async fn save(&self, request: &ScreeningRequest, groups: &BTreeMap<String, i64>) {
        let record = HistoricalRecord {
            participant_id: request.participant_id.clone(),
            responses: request.responses.clone(),
            response_groups: groups
                .iter()
                .map(|(id, group)| (id.clone(), Value::from(*group)))
                .collect(),
        };

        match self.store.save_submission(&request.survey_id, &record).await {
            Ok(()) => debug!(survey_id = %request.survey_id, "Submission stored"),
            Err(e) => warn!(
                survey_id = %request.survey_id,
                participant_id = %request.participant_id,
                backend = self.store.name(),
                error = %e,
                "Failed to store submission"
            ),
        }
    }
}

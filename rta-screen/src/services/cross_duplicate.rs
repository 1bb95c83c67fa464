//! Cross-duplicate checker
//!
//! Compares one participant's cleaned answers with the answers other
//! participants already gave to the same questions, and assigns every
//! question a response group.
//!
//! **Pipeline:**
//! 1. Fetch the survey's history once (shared read-only by all questions)
//! 2. Per non-empty question: gate candidates by length, split into batches
//! 3. Score every (question, batch) pair concurrently; a failed batch counts
//!    as "no matches" without affecting its siblings
//! 4. Per question: resolve the best-supported group, or allocate a fresh one
//!
//! Nothing in here surfaces an error to the caller. The worst case is fewer
//! duplicates found, or a fallback group id that is tagged as such.

use super::grouping::{GroupingResolver, Resolution};
use super::metrics_worker::MetricsWorker;
use super::statistics::ScreeningStats;
use crate::matching::{partition, MatchClassifier};
use crate::store::ResponseStore;
use crate::types::{
    Candidate, CrossDuplicateReport, GroupAssignment, GroupSource, HistoricalRecord,
    ScoredCandidate,
};
use futures::future::join_all;
use rand::Rng;
use rta_common::clean_response;
use rta_common::config::ScreenConfig;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Range fallback group ids are drawn from
///
/// Disjoint from realistic counter values so audits can tell them apart.
pub const FALLBACK_GROUP_RANGE: Range<i64> = 1_000_000..(i32::MAX as i64 + 1);

/// Draw a non-authoritative group id
pub fn fallback_group_id() -> i64 {
    rand::thread_rng().gen_range(FALLBACK_GROUP_RANGE)
}

/// Cross-duplicate detection and response grouping engine
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct CrossDuplicateChecker {
    store: Arc<dyn ResponseStore>,
    worker: Arc<dyn MetricsWorker>,
    stats: Arc<ScreeningStats>,
    classifier: MatchClassifier,
    resolver: GroupingResolver,
    length_prefilter: bool,
    max_batch_size: usize,
}

impl CrossDuplicateChecker {
    pub fn new(
        store: Arc<dyn ResponseStore>,
        worker: Arc<dyn MetricsWorker>,
        stats: Arc<ScreeningStats>,
        config: &ScreenConfig,
    ) -> Self {
        let classifier = MatchClassifier::new(config.thresholds);
        Self {
            store,
            worker,
            stats,
            classifier,
            resolver: GroupingResolver::new(classifier, config.tie_break),
            length_prefilter: config.length_prefilter,
            max_batch_size: config.max_batch_size.max(1),
        }
    }

    pub fn classifier(&self) -> &MatchClassifier {
        &self.classifier
    }

    /// Check a submission against other participants' history
    ///
    /// Every key of `cleaned` appears in both maps of the report. A failure
    /// of the whole pipeline (including a panic) yields empty duplicate
    /// lists and fallback group ids rather than an error.
    pub async fn check_for_cross_duplicate_responses(
        &self,
        cleaned: &BTreeMap<String, String>,
        survey_id: &str,
        participant_id: &str,
    ) -> CrossDuplicateReport {
        self.stats.record_request();
        debug!(
            survey_id = %survey_id,
            participant_id = %participant_id,
            questions = cleaned.len(),
            "Checking for cross-duplicate responses"
        );

        let this = self.clone();
        let answers = cleaned.clone();
        let survey = survey_id.to_string();
        let participant = participant_id.to_string();

        // Own task so a panic anywhere in the pipeline is contained
        let outcome =
            tokio::spawn(async move { this.run_pipeline(&answers, &survey, &participant).await })
                .await;

        match outcome {
            Ok(report) if cleaned.keys().all(|id| report.response_groups.contains_key(id)) => {
                info!(
                    survey_id = %survey_id,
                    questions = cleaned.len(),
                    with_duplicates = report.duplicate_responses.values().filter(|d| !d.is_empty()).count(),
                    degraded = report.degraded_groups.len(),
                    "Cross-duplicate check complete"
                );
                report
            }
            Ok(_) => {
                error!(survey_id = %survey_id, "Cross-duplicate pipeline left questions unassigned");
                self.fallback_report(cleaned)
            }
            Err(e) => {
                error!(survey_id = %survey_id, error = %e, "Cross-duplicate pipeline failed");
                self.fallback_report(cleaned)
            }
        }
    }

    async fn run_pipeline(
        &self,
        cleaned: &BTreeMap<String, String>,
        survey_id: &str,
        participant_id: &str,
    ) -> CrossDuplicateReport {
        let history = match self.store.fetch_historical_records(survey_id).await {
            Ok(records) => records,
            Err(e) => {
                self.stats.record_history_failure();
                warn!(
                    survey_id = %survey_id,
                    backend = self.store.name(),
                    error = %e,
                    "History fetch failed, continuing without historical data"
                );
                Vec::new()
            }
        };

        let mut candidates = collect_candidates(&history, cleaned, participant_id);

        // Fan out every (question, batch) pair together
        let mut batches = Vec::new();
        for (question_id, target) in cleaned.iter().filter(|(_, answer)| !answer.is_empty()) {
            let pool = candidates.remove(question_id).unwrap_or_default();
            let total = pool.len();
            let admitted: Vec<Candidate> = if self.length_prefilter {
                pool.into_iter()
                    .filter(|c| self.classifier.should_compare(target, &c.response))
                    .collect()
            } else {
                pool
            };
            debug!(
                question_id = %question_id,
                candidates = total,
                admitted = admitted.len(),
                "Candidates gated"
            );

            for (batch, chunk) in partition(admitted, self.max_batch_size)
                .into_iter()
                .enumerate()
            {
                batches.push(self.score_batch(question_id, target, batch, chunk));
            }
        }

        // join_all keeps input order, so merged candidates follow batch order
        let mut scored_by_question: HashMap<&str, Vec<ScoredCandidate>> = HashMap::new();
        for (question_id, scored) in join_all(batches).await {
            scored_by_question
                .entry(question_id)
                .or_default()
                .extend(scored);
        }

        let mut assignments = Vec::with_capacity(cleaned.len());
        for (question_id, answer) in cleaned {
            let scored = scored_by_question
                .remove(question_id.as_str())
                .unwrap_or_default();
            assignments.push(async move {
                let (duplicates, assignment) = self
                    .assign_group(survey_id, question_id, answer, &scored)
                    .await;
                (question_id, duplicates, assignment)
            });
        }
        let assignments = join_all(assignments).await;

        let mut report = CrossDuplicateReport::default();
        for (question_id, duplicates, assignment) in assignments {
            report.insert(question_id, duplicates, assignment);
        }
        report
    }

    /// Score one batch; a failed batch contributes no candidates
    async fn score_batch<'a>(
        &self,
        question_id: &'a str,
        target: &str,
        batch: usize,
        chunk: Vec<Candidate>,
    ) -> (&'a str, Vec<ScoredCandidate>) {
        let size = chunk.len();
        match self.worker.compute_metrics(target, chunk).await {
            Ok(scored) => {
                debug!(question_id = %question_id, batch, size, "Batch scored");
                (question_id, scored)
            }
            Err(e) => {
                self.stats.record_batch_failure();
                warn!(
                    question_id = %question_id,
                    batch,
                    size,
                    worker = self.worker.name(),
                    error = %e,
                    "Metrics batch failed, treating as no matches"
                );
                (question_id, Vec::new())
            }
        }
    }

    async fn assign_group(
        &self,
        survey_id: &str,
        question_id: &str,
        answer: &str,
        scored: &[ScoredCandidate],
    ) -> (Vec<String>, GroupAssignment) {
        if answer.is_empty() {
            return (Vec::new(), GroupAssignment::empty_answer());
        }

        match self.resolver.resolve(scored) {
            Resolution::Matched { group, duplicates } => {
                debug!(
                    question_id = %question_id,
                    group,
                    duplicates = duplicates.len(),
                    "Joined existing response group"
                );
                (
                    duplicates,
                    GroupAssignment {
                        group,
                        source: GroupSource::Matched,
                    },
                )
            }
            Resolution::NoMatch => (Vec::new(), self.allocate_group(survey_id, question_id).await),
        }
    }

    /// Fresh group id from the counter, or a tagged fallback if it fails
    async fn allocate_group(&self, survey_id: &str, question_id: &str) -> GroupAssignment {
        match self
            .store
            .increment_group_counter(survey_id, question_id)
            .await
        {
            Ok(group) => GroupAssignment {
                group,
                source: GroupSource::Allocated,
            },
            Err(e) => {
                self.stats.record_counter_fallback();
                let group = fallback_group_id();
                warn!(
                    survey_id = %survey_id,
                    question_id = %question_id,
                    group,
                    error = %e,
                    "Group counter failed, issued fallback group id"
                );
                GroupAssignment {
                    group,
                    source: GroupSource::Fallback,
                }
            }
        }
    }

    fn fallback_report(&self, cleaned: &BTreeMap<String, String>) -> CrossDuplicateReport {
        self.stats.record_pipeline_failure();
        let mut report = CrossDuplicateReport::default();
        for (question_id, answer) in cleaned {
            let assignment = if answer.is_empty() {
                GroupAssignment::empty_answer()
            } else {
                GroupAssignment {
                    group: fallback_group_id(),
                    source: GroupSource::Fallback,
                }
            };
            report.insert(question_id, Vec::new(), assignment);
        }
        report
    }
}

/// Build per-question candidate lists from other participants' history
///
/// Only questions present in `cleaned` are collected. Historical answers
/// are cleaned the same way as the current submission; records owned by
/// `participant_id` are skipped.
pub fn collect_candidates(
    history: &[HistoricalRecord],
    cleaned: &BTreeMap<String, String>,
    participant_id: &str,
) -> HashMap<String, Vec<Candidate>> {
    let mut candidates: HashMap<String, Vec<Candidate>> = HashMap::new();

    for record in history.iter().filter(|r| r.participant_id != participant_id) {
        for (question_id, answer) in &record.responses {
            if !cleaned.contains_key(question_id) {
                continue;
            }
            candidates
                .entry(question_id.clone())
                .or_default()
                .push(Candidate {
                    response: clean_response(answer),
                    participant_id: record.participant_id.clone(),
                    response_group: record.group_for(question_id),
                });
        }
    }

    candidates
}

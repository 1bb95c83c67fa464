//! Shared fixtures and test doubles for rta-screen integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rta_common::config::ScreenConfig;
use rta_screen::services::{
    CrossDuplicateChecker, LocalMetricsWorker, MetricsWorker, ScreeningStats, WorkerError,
};
use rta_screen::store::{HistoryPage, MemoryStore, ResponseStore, StoreError};
use rta_screen::types::{Candidate, HistoricalRecord, ScoredCandidate};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Fixtures
// =============================================================================

/// Historical submission with one answer per question and explicit groups
pub fn record(participant_id: &str, answers: &[(&str, &str)], groups: Value) -> HistoricalRecord {
    HistoricalRecord {
        participant_id: participant_id.to_string(),
        responses: answers
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect(),
        response_groups: serde_json::from_value(groups).expect("groups must be a JSON object"),
    }
}

/// Cleaned answers keyed by question id
pub fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(q, a)| (q.to_string(), a.to_string()))
        .collect()
}

pub fn checker_with(
    store: Arc<dyn ResponseStore>,
    worker: Arc<dyn MetricsWorker>,
    config: &ScreenConfig,
) -> CrossDuplicateChecker {
    CrossDuplicateChecker::new(store, worker, Arc::new(ScreeningStats::new()), config)
}

pub fn local_checker(store: Arc<dyn ResponseStore>, config: &ScreenConfig) -> CrossDuplicateChecker {
    checker_with(store, Arc::new(LocalMetricsWorker), config)
}

// =============================================================================
// Metrics worker doubles
// =============================================================================

/// Fails every batch
pub struct FailingWorker;

#[async_trait]
impl MetricsWorker for FailingWorker {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn compute_metrics(
        &self,
        _target: &str,
        _candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>, WorkerError> {
        Err(WorkerError::Network("connection refused".to_string()))
    }
}

/// Scores locally and records batch sizes
#[derive(Default)]
pub struct CountingWorker {
    pub calls: AtomicUsize,
    pub candidates: AtomicUsize,
    pub largest_batch: AtomicUsize,
}

impl CountingWorker {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn candidates(&self) -> usize {
        self.candidates.load(Ordering::SeqCst)
    }

    pub fn largest_batch(&self) -> usize {
        self.largest_batch.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsWorker for CountingWorker {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn compute_metrics(
        &self,
        target: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>, WorkerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.candidates.fetch_add(candidates.len(), Ordering::SeqCst);
        self.largest_batch.fetch_max(candidates.len(), Ordering::SeqCst);
        LocalMetricsWorker.compute_metrics(target, candidates).await
    }
}

/// Fails every other batch, starting with the first
#[derive(Default)]
pub struct AlternatingWorker {
    calls: AtomicUsize,
}

#[async_trait]
impl MetricsWorker for AlternatingWorker {
    fn name(&self) -> &'static str {
        "alternating"
    }

    async fn compute_metrics(
        &self,
        target: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>, WorkerError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            return Err(WorkerError::Status(502, "bad gateway".to_string()));
        }
        LocalMetricsWorker.compute_metrics(target, candidates).await
    }
}

/// Sleeps before scoring
pub struct SlowWorker(pub Duration);

#[async_trait]
impl MetricsWorker for SlowWorker {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn compute_metrics(
        &self,
        target: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>, WorkerError> {
        tokio::time::sleep(self.0).await;
        LocalMetricsWorker.compute_metrics(target, candidates).await
    }
}

/// Panics on every batch
pub struct PanickingWorker;

#[async_trait]
impl MetricsWorker for PanickingWorker {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn compute_metrics(
        &self,
        _target: &str,
        _candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>, WorkerError> {
        panic!("worker exploded");
    }
}

// =============================================================================
// Store doubles
// =============================================================================

/// Memory store whose history reads or counter can be made to fail
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_history: bool,
    pub fail_counter: bool,
}

impl FlakyStore {
    pub fn failing_history() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_history: true,
            fail_counter: false,
        }
    }

    pub fn failing_counter() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_history: false,
            fail_counter: true,
        }
    }
}

#[async_trait]
impl ResponseStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn fetch_page(
        &self,
        survey_id: &str,
        cursor: Option<i64>,
    ) -> Result<HistoryPage, StoreError> {
        if self.fail_history {
            return Err(StoreError::Unavailable("history offline".to_string()));
        }
        self.inner.fetch_page(survey_id, cursor).await
    }

    async fn increment_group_counter(
        &self,
        survey_id: &str,
        question_id: &str,
    ) -> Result<i64, StoreError> {
        if self.fail_counter {
            return Err(StoreError::Unavailable("counter offline".to_string()));
        }
        self.inner.increment_group_counter(survey_id, question_id).await
    }

    async fn save_submission(
        &self,
        survey_id: &str,
        record: &HistoricalRecord,
    ) -> Result<(), StoreError> {
        self.inner.save_submission(survey_id, record).await
    }
}

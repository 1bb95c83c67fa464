//! Integration tests for cross-duplicate detection and response grouping
//!
//! Tests cover:
//! - Joining an existing group from matching history
//! - The length-only gate with default and relaxed thresholds
//! - Fresh group allocation, including concurrent first submissions
//! - Degraded paths: failing worker, history, counter and whole pipeline

mod helpers;

use helpers::*;
use rta_common::config::ScreenConfig;
use rta_screen::services::cross_duplicate::FALLBACK_GROUP_RANGE;
use rta_screen::services::{CrossDuplicateChecker, ScreeningStats};
use rta_screen::store::{MemoryStore, ResponseStore};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

const OCEAN: &str = "ocean vacation with sunshine";

async fn ocean_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_records(
            "survey-1",
            vec![
                record("alice", &[("q2", OCEAN)], json!({"q2": 5})),
                record("bob", &[("q2", OCEAN)], json!({"q2": 5})),
            ],
        )
        .await;
    store
}

// =============================================================================
// Grouping
// =============================================================================

#[tokio::test]
async fn test_identical_answer_joins_group_with_gate_disabled() {
    let store = ocean_store().await;
    let config = ScreenConfig {
        length_prefilter: false,
        ..ScreenConfig::default()
    };
    let checker = local_checker(store, &config);

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q2", OCEAN)]), "survey-1", "carol")
        .await;

    assert_eq!(report.response_groups["q2"], 5);
    assert_eq!(report.duplicate_responses["q2"], vec![OCEAN.to_string(), OCEAN.to_string()]);
    assert!(report.degraded_groups.is_empty());
}

#[tokio::test]
async fn test_identical_short_answer_is_gated_with_default_thresholds() {
    // Shorter than raw_lcs (100 chars), so the length gate rejects the pair
    // before the exact classifier could call it a match
    let store = ocean_store().await;
    let checker = local_checker(store, &ScreenConfig::default());

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q2", OCEAN)]), "survey-1", "carol")
        .await;

    assert!(report.duplicate_responses["q2"].is_empty());
    assert_eq!(report.response_groups["q2"], 1);
}

#[tokio::test]
async fn test_relaxed_raw_lcs_admits_short_answers() {
    let store = ocean_store().await;
    let mut config = ScreenConfig::default();
    config.thresholds.raw_lcs = 10;
    let checker = local_checker(store, &config);

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q2", OCEAN)]), "survey-1", "carol")
        .await;

    assert_eq!(report.response_groups["q2"], 5);
    assert_eq!(report.duplicate_responses["q2"].len(), 2);
}

#[tokio::test]
async fn test_long_identical_answer_matches_with_defaults() {
    let long_answer = "we spent two weeks on a quiet island with friends swimming every \
                       morning reading every afternoon and cooking fresh fish every night";
    assert!(long_answer.chars().count() >= 100);

    let store = Arc::new(MemoryStore::new());
    store
        .insert_records(
            "survey-1",
            vec![record("alice", &[("q1", long_answer)], json!({"q1": 12}))],
        )
        .await;
    let checker = local_checker(store, &ScreenConfig::default());

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q1", long_answer)]), "survey-1", "bob")
        .await;

    assert_eq!(report.response_groups["q1"], 12);
    assert_eq!(report.duplicate_responses["q1"], vec![long_answer.to_string()]);
}

#[tokio::test]
async fn test_historical_answers_are_cleaned_before_matching() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_records(
            "survey-1",
            vec![record("alice", &[("q2", "Ocean vacation, with SUNSHINE!")], json!({"q2": 8}))],
        )
        .await;
    let config = ScreenConfig {
        length_prefilter: false,
        ..ScreenConfig::default()
    };
    let checker = local_checker(store, &config);

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q2", OCEAN)]), "survey-1", "carol")
        .await;

    assert_eq!(report.response_groups["q2"], 8);
    assert_eq!(report.duplicate_responses["q2"], vec![OCEAN.to_string()]);
}

#[tokio::test]
async fn test_own_history_is_ignored() {
    let store = ocean_store().await;
    let config = ScreenConfig {
        length_prefilter: false,
        ..ScreenConfig::default()
    };
    let checker = local_checker(store, &config);

    // alice resubmits; only bob's answer counts
    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q2", OCEAN)]), "survey-1", "alice")
        .await;

    assert_eq!(report.duplicate_responses["q2"], vec![OCEAN.to_string()]);
    assert_eq!(report.response_groups["q2"], 5);
}

#[tokio::test]
async fn test_untrusted_history_group_allocates_fresh_group() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_records(
            "survey-1",
            vec![record("alice", &[("q2", OCEAN)], json!({"q2": "five"}))],
        )
        .await;
    let config = ScreenConfig {
        length_prefilter: false,
        ..ScreenConfig::default()
    };
    let checker = local_checker(store, &config);

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q2", OCEAN)]), "survey-1", "carol")
        .await;

    assert!(report.duplicate_responses["q2"].is_empty());
    assert_eq!(report.response_groups["q2"], 1);
}

#[tokio::test]
async fn test_batches_respect_cap_and_merge() {
    let store = Arc::new(MemoryStore::new());
    let records = (0..5)
        .map(|i| record(&format!("p{i}"), &[("q1", OCEAN)], json!({"q1": 3})))
        .collect();
    store.insert_records("survey-1", records).await;

    let worker = Arc::new(CountingWorker::default());
    let config = ScreenConfig {
        length_prefilter: false,
        max_batch_size: 2,
        ..ScreenConfig::default()
    };
    let checker = checker_with(store, worker.clone(), &config);

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q1", OCEAN)]), "survey-1", "carol")
        .await;

    assert_eq!(worker.calls(), 3);
    assert_eq!(worker.candidates(), 5);
    assert!(worker.largest_batch() <= 2);
    assert_eq!(report.response_groups["q1"], 3);
    assert_eq!(report.duplicate_responses["q1"].len(), 5);
}

// =============================================================================
// Allocation
// =============================================================================

#[tokio::test]
async fn test_no_history_allocates_groups_and_zero_for_empty() {
    let store = Arc::new(MemoryStore::new());
    let worker = Arc::new(CountingWorker::default());
    let checker = checker_with(store.clone(), worker.clone(), &ScreenConfig::default());

    let report = checker
        .check_for_cross_duplicate_responses(
            &answers(&[("q1", "first answer"), ("q2", ""), ("q3", "third answer")]),
            "survey-1",
            "carol",
        )
        .await;

    for id in ["q1", "q2", "q3"] {
        assert!(report.duplicate_responses[id].is_empty());
    }
    assert_eq!(report.response_groups["q1"], 1);
    assert_eq!(report.response_groups["q2"], 0);
    assert_eq!(report.response_groups["q3"], 1);

    // Empty answers never touch the worker or the counter
    assert_eq!(worker.calls(), 0);
    assert_eq!(store.increment_group_counter("survey-1", "q2").await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_first_submissions_get_distinct_groups() {
    let store: Arc<dyn ResponseStore> = Arc::new(MemoryStore::new());
    let checker = local_checker(store, &ScreenConfig::default());

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let checker: CrossDuplicateChecker = checker.clone();
        tasks.spawn(async move {
            let participant = format!("p{i}");
            let answer = format!("a unique answer number {i}");
            checker
                .check_for_cross_duplicate_responses(&answers(&[("q1", answer.as_str())]), "survey-1", &participant)
                .await
        });
    }

    let mut groups = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        let report = result.unwrap();
        let group = report.response_groups["q1"];
        assert_ne!(group, 0);
        assert!(groups.insert(group), "group {} issued twice", group);
    }
    assert_eq!(groups.len(), 20);
}

// =============================================================================
// Degraded paths
// =============================================================================

#[tokio::test]
async fn test_always_failing_worker_still_returns() {
    let store = ocean_store().await;
    let config = ScreenConfig {
        length_prefilter: false,
        ..ScreenConfig::default()
    };
    let stats = Arc::new(ScreeningStats::new());
    let checker = CrossDuplicateChecker::new(store, Arc::new(FailingWorker), stats.clone(), &config);

    let report = checker
        .check_for_cross_duplicate_responses(
            &answers(&[("q1", "something else"), ("q2", OCEAN)]),
            "survey-1",
            "carol",
        )
        .await;

    assert!(report.duplicate_responses["q1"].is_empty());
    assert!(report.duplicate_responses["q2"].is_empty());
    assert_eq!(report.response_groups.len(), 2);
    assert_eq!(stats.snapshot().batch_failures, 1);
    assert_eq!(stats.snapshot().pipeline_failures, 0);
}

#[tokio::test]
async fn test_failed_batch_does_not_discard_siblings() {
    let store = Arc::new(MemoryStore::new());
    let records = (0..4)
        .map(|i| record(&format!("p{i}"), &[("q1", OCEAN)], json!({"q1": 6})))
        .collect();
    store.insert_records("survey-1", records).await;

    let config = ScreenConfig {
        length_prefilter: false,
        max_batch_size: 2,
        ..ScreenConfig::default()
    };
    let stats = Arc::new(ScreeningStats::new());
    let checker = CrossDuplicateChecker::new(
        store,
        Arc::new(AlternatingWorker::default()),
        stats.clone(),
        &config,
    );

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q1", OCEAN)]), "survey-1", "carol")
        .await;

    assert_eq!(report.response_groups["q1"], 6);
    assert_eq!(report.duplicate_responses["q1"].len(), 2);
    assert_eq!(stats.snapshot().batch_failures, 1);
}

#[tokio::test]
async fn test_history_failure_falls_back_to_allocation() {
    let store = Arc::new(FlakyStore::failing_history());
    let stats = Arc::new(ScreeningStats::new());
    let checker = CrossDuplicateChecker::new(
        store,
        Arc::new(rta_screen::services::LocalMetricsWorker),
        stats.clone(),
        &ScreenConfig::default(),
    );

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q1", OCEAN)]), "survey-1", "carol")
        .await;

    assert!(report.duplicate_responses["q1"].is_empty());
    assert_eq!(report.response_groups["q1"], 1);
    assert_eq!(stats.snapshot().history_failures, 1);
}

#[tokio::test]
async fn test_counter_failure_issues_tagged_fallback() {
    let store = Arc::new(FlakyStore::failing_counter());
    let stats = Arc::new(ScreeningStats::new());
    let checker = CrossDuplicateChecker::new(
        store,
        Arc::new(rta_screen::services::LocalMetricsWorker),
        stats.clone(),
        &ScreenConfig::default(),
    );

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q1", OCEAN), ("q2", "")]), "survey-1", "carol")
        .await;

    assert!(FALLBACK_GROUP_RANGE.contains(&report.response_groups["q1"]));
    assert!(report.degraded_groups.contains("q1"));
    assert_eq!(report.response_groups["q2"], 0);
    assert!(!report.degraded_groups.contains("q2"));
    assert_eq!(stats.snapshot().counter_fallbacks, 1);
}

#[tokio::test]
async fn test_pipeline_panic_falls_back_for_every_question() {
    let store = ocean_store().await;
    let config = ScreenConfig {
        length_prefilter: false,
        ..ScreenConfig::default()
    };
    let stats = Arc::new(ScreeningStats::new());
    let checker = CrossDuplicateChecker::new(store, Arc::new(PanickingWorker), stats.clone(), &config);

    let report = checker
        .check_for_cross_duplicate_responses(&answers(&[("q1", ""), ("q2", OCEAN)]), "survey-1", "carol")
        .await;

    assert_eq!(report.response_groups["q1"], 0);
    assert!(FALLBACK_GROUP_RANGE.contains(&report.response_groups["q2"]));
    assert!(report.duplicate_responses.values().all(Vec::is_empty));
    assert_eq!(report.degraded_groups.len(), 1);
    assert_eq!(stats.snapshot().pipeline_failures, 1);
}

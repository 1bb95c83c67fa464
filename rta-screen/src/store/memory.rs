//! In-process response store
//!
//! Holds submissions and counters in maps owned by the store instance. Used
//! for local development and tests; contents are lost on restart.

use super::{HistoryPage, ResponseStore, StoreError};
use crate::types::HistoricalRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

/// Records returned per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Process-local store
pub struct MemoryStore {
    submissions: RwLock<HashMap<String, Vec<HistoricalRecord>>>,
    counters: Mutex<HashMap<(String, String), i64>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            submissions: RwLock::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Seed a survey with existing submissions
    pub async fn insert_records(&self, survey_id: &str, records: Vec<HistoricalRecord>) {
        self.submissions
            .write()
            .await
            .entry(survey_id.to_string())
            .or_default()
            .extend(records);
    }

    /// Number of stored submissions for a survey
    pub async fn submission_count(&self, survey_id: &str) -> usize {
        self.submissions
            .read()
            .await
            .get(survey_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_page(
        &self,
        survey_id: &str,
        cursor: Option<i64>,
    ) -> Result<HistoryPage, StoreError> {
        let map = self.submissions.read().await;
        let all = map.get(survey_id).map(Vec::as_slice).unwrap_or(&[]);

        let start = usize::try_from(cursor.unwrap_or(0))
            .map_err(|_| StoreError::Unavailable(format!("Invalid cursor: {:?}", cursor)))?
            .min(all.len());
        let end = (start + self.page_size).min(all.len());

        let next_cursor = (end < all.len()).then_some(end as i64);

        Ok(HistoryPage {
            records: all[start..end].to_vec(),
            next_cursor,
        })
    }

    async fn increment_group_counter(
        &self,
        survey_id: &str,
        question_id: &str,
    ) -> Result<i64, StoreError> {
        let mut counters = self.counters.lock().await;
        let counter = counters
            .entry((survey_id.to_string(), question_id.to_string()))
            .or_insert(0);
        *counter += 1;

        tracing::debug!(
            survey_id = %survey_id,
            question_id = %question_id,
            value = *counter,
            "Group counter incremented"
        );

        Ok(*counter)
    }

    async fn save_submission(
        &self,
        survey_id: &str,
        record: &HistoricalRecord,
    ) -> Result<(), StoreError> {
        self.insert_records(survey_id, vec![record.clone()]).await;
        Ok(())
    }
}

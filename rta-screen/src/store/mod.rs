//! Response storage
//!
//! `ResponseStore` covers everything the screening service needs from
//! durable storage:
//! - paginated reads of other participants' submissions
//! - the atomic per-question group counter
//! - persisting a submission once screening has finished
//!
//! Two adapters exist: `SqliteStore` (durable) and `MemoryStore`
//! (process-local). The backend is chosen once, from configuration, when the
//! application state is built.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::HistoricalRecord;
use async_trait::async_trait;
use rta_common::config::{ScreenConfig, StorageBackend};
use std::sync::Arc;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// One page of historical records
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub records: Vec<HistoricalRecord>,
    /// Cursor for the next page; `None` once the survey is exhausted
    pub next_cursor: Option<i64>,
}

/// Durable storage seam for screening
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Fetch one page of a survey's stored submissions, oldest first
    async fn fetch_page(&self, survey_id: &str, cursor: Option<i64>)
        -> Result<HistoryPage, StoreError>;

    /// Fetch every stored submission of a survey
    ///
    /// Follows pagination until exhausted and concatenates the pages.
    async fn fetch_historical_records(
        &self,
        survey_id: &str,
    ) -> Result<Vec<HistoricalRecord>, StoreError> {
        let mut records = Vec::new();
        let mut cursor = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(survey_id, cursor).await?;
            pages += 1;
            records.extend(page.records);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            survey_id = %survey_id,
            backend = self.name(),
            pages,
            records = records.len(),
            "Fetched historical records"
        );

        Ok(records)
    }

    /// Atomically increment the group counter for (survey, question)
    ///
    /// Counters start at 0; the first call returns 1. Concurrent callers for
    /// the same key never observe the same value.
    async fn increment_group_counter(
        &self,
        survey_id: &str,
        question_id: &str,
    ) -> Result<i64, StoreError>;

    /// Persist a screened submission
    async fn save_submission(
        &self,
        survey_id: &str,
        record: &HistoricalRecord,
    ) -> Result<(), StoreError>;
}

/// Open the storage backend named in configuration
pub async fn open_store(config: &ScreenConfig) -> rta_common::Result<Arc<dyn ResponseStore>> {
    match config.storage {
        StorageBackend::Sqlite => {
            let pool = rta_common::db::init_database(&config.database_path).await?;
            tracing::info!(path = %config.database_path.display(), "Using SQLite response store");
            Ok(Arc::new(SqliteStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory response store (data is lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

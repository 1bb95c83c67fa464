//! SQLite response store

use super::{HistoryPage, ResponseStore, StoreError};
use crate::types::HistoricalRecord;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// Rows returned per page
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Durable store backed by the shared SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
    page_size: i64,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size (clamped to at least 1)
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

#[async_trait]
impl ResponseStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_page(
        &self,
        survey_id: &str,
        cursor: Option<i64>,
    ) -> Result<HistoryPage, StoreError> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            r#"
            SELECT id, participant_id, responses, response_groups
            FROM survey_responses
            WHERE survey_id = ? AND id > ?
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(survey_id)
        .bind(cursor.unwrap_or(0))
        .bind(self.page_size)
        .fetch_all(&self.db)
        .await?;

        let next_cursor = if rows.len() as i64 == self.page_size {
            rows.last().map(|(id, ..)| *id)
        } else {
            None
        };

        let mut records = Vec::with_capacity(rows.len());
        for (id, participant_id, responses, response_groups) in rows {
            // A corrupt row is skipped rather than failing the whole survey
            let responses: BTreeMap<String, String> = match serde_json::from_str(&responses) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(row_id = id, error = %e, "Skipping stored submission with unreadable responses");
                    continue;
                }
            };
            let response_groups = serde_json::from_str(&response_groups).unwrap_or_else(|e| {
                tracing::warn!(row_id = id, error = %e, "Unreadable response groups, treating as empty");
                BTreeMap::new()
            });

            records.push(HistoricalRecord {
                participant_id,
                responses,
                response_groups,
            });
        }

        Ok(HistoryPage {
            records,
            next_cursor,
        })
    }

    async fn increment_group_counter(
        &self,
        survey_id: &str,
        question_id: &str,
    ) -> Result<i64, StoreError> {
        // Single statement: SQLite serializes writers, so this is a fetch-and-add
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO survey_groups (survey_id, question_id, group_counter)
            VALUES (?, ?, 1)
            ON CONFLICT(survey_id, question_id)
            DO UPDATE SET group_counter = group_counter + 1
            RETURNING group_counter
            "#,
        )
        .bind(survey_id)
        .bind(question_id)
        .fetch_one(&self.db)
        .await?;

        tracing::debug!(survey_id = %survey_id, question_id = %question_id, value, "Group counter incremented");

        Ok(value)
    }

    async fn save_submission(
        &self,
        survey_id: &str,
        record: &HistoricalRecord,
    ) -> Result<(), StoreError> {
        let responses = serde_json::to_string(&record.responses)?;
        let response_groups = serde_json::to_string(&record.response_groups)?;

        sqlx::query(
            r#"
            INSERT INTO survey_responses (survey_id, participant_id, responses, response_groups)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(survey_id)
        .bind(&record.participant_id)
        .bind(responses)
        .bind(response_groups)
        .execute(&self.db)
        .await?;

        tracing::debug!(
            survey_id = %survey_id,
            participant_id = %record.participant_id,
            "Submission saved"
        );

        Ok(())
    }
}

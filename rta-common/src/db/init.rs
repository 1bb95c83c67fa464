//! Database initialization
//!
//! Opens (or creates) the SQLite database and ensures the screening tables
//! exist. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets request handlers read history while a submission is written
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create the screening tables (idempotent)
///
/// - `survey_responses`: one row per persisted submission; `responses` and
///   `response_groups` are JSON objects keyed by question id
/// - `survey_groups`: per (survey, question) group counter
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            survey_id TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            responses TEXT NOT NULL,
            response_groups TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_survey_responses_survey ON survey_responses(survey_id, id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_groups (
            survey_id TEXT NOT NULL,
            question_id TEXT NOT NULL,
            group_counter INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (survey_id, question_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database tables initialized (survey_responses, survey_groups)");

    Ok(())
}

//! Pipeline database operations
//!
//! Write-through SQLite store for jobs, the A2A message log and system settings.
//! The in-memory `AppState` stays authoritative; this store lets a restarted
//! server show earlier jobs and messages.

use crate::protocol::A2AMessage;
use crate::state::app_state::ProcessingJob;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Error types for persistence operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Database could not be opened
    #[error("Connection error: {0}")]
    Connection(String),
    /// A migration statement failed
    #[error("Migration failed: {0}")]
    Migration(String),
    /// Query failed
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
    /// Stored JSON could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings seeded on first start
const DEFAULT_CONFIG: &[(&str, &str)] = &[("demo_mode", "true")];

/// Fixed-width timestamps so text ordering matches time ordering
fn sortable(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Database connection pool for pipeline data
#[derive(Clone)]
pub struct PipelineDb {
    pool: SqlitePool,
}

impl PipelineDb {
    /// Open (or create) the database and run migrations
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(PipelineDb)` if successful
    /// * `Err(PersistenceError)` if connection or migration failed
    pub async fn new(db_path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Connection(format!("Failed to create db directory: {}", e))
            })?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| PersistenceError::Connection(format!("Invalid database path: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;

        info!(path = %db_path.display(), "Connected to SQLite database");

        let db = Self { pool };
        db.run_migrations().await?;
        db.seed_defaults().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), PersistenceError> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../../migrations/001_create_pipeline.sql");

        // Strip comments, then execute statement by statement
        let mut cleaned_sql = String::new();
        for line in migration_sql.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            let without_comments = match trimmed.find("--") {
                Some(pos) => &trimmed[..pos],
                None => trimmed,
            };
            cleaned_sql.push_str(without_comments.trim());
            cleaned_sql.push(' ');
        }

        for statement in cleaned_sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    PersistenceError::Migration(format!(
                        "{} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    async fn seed_defaults(&self) -> Result<(), PersistenceError> {
        let now = Utc::now().to_rfc3339();
        for (key, value) in DEFAULT_CONFIG {
            sqlx::query(
                "INSERT OR IGNORE INTO system_config (key, value, updated_at) VALUES (?, ?, ?)",
            )
            .bind(key)
            .bind(value)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Insert or replace a job snapshot
    pub async fn upsert_job(&self, job: &ProcessingJob) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(job)?;
        sqlx::query(
            "INSERT INTO processing_jobs (id, file_name, file_type, status, progress, payload, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                progress = excluded.progress,
                payload = excluded.payload,
                updated_at = excluded.updated_at",
        )
        .bind(&job.id)
        .bind(&job.file_name)
        .bind(&job.file_type)
        .bind(job.status.as_str())
        .bind(job.progress as f64)
        .bind(payload)
        .bind(sortable(job.created_at))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(job_id = %job.id, status = job.status.as_str(), "Persisted job");
        Ok(())
    }

    /// Load every stored job, oldest first
    pub async fn load_jobs(&self) -> Result<Vec<ProcessingJob>, PersistenceError> {
        let rows = sqlx::query("SELECT payload FROM processing_jobs ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<ProcessingJob, PersistenceError> {
                let payload: String = row.try_get("payload")?;
                Ok(serde_json::from_str(&payload)?)
            })
            .collect()
    }

    /// Append a message to the log table
    pub async fn insert_message(&self, message: &A2AMessage) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(message)?;
        sqlx::query(
            "INSERT OR IGNORE INTO agent_messages (id, from_agent, to_agent, action, transport, payload, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.header.message_id)
        .bind(&message.header.from_agent)
        .bind(&message.header.to_agent)
        .bind(&message.payload.action)
        .bind(message.header.transport.as_str())
        .bind(payload)
        .bind(sortable(message.header.timestamp))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent messages, newest first
    pub async fn recent_messages(&self, limit: usize) -> Result<Vec<A2AMessage>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT payload FROM agent_messages ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<A2AMessage, PersistenceError> {
                let payload: String = row.try_get("payload")?;
                Ok(serde_json::from_str(&payload)?)
            })
            .collect()
    }

    /// Read a system setting
    pub async fn config_value(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM system_config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Write a system setting
    pub async fn set_config_value(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO system_config (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

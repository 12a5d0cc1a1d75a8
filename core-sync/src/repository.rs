//! # Sync Repositories
//!
//! Persistence for integrations and sync logs.
//!
//! The sync engine only ever writes an integration's health fields
//! (`status`, `last_sync_at`, `error_message`); creating and editing the rest
//! of the record belongs to the host. `insert` exists for that host and for
//! tests.

use crate::integration::{Integration, IntegrationId, IntegrationStatus};
use crate::sync_log::{SyncLog, SyncLogId};
use crate::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, SqlitePool};

/// Integration persistence
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn insert(&self, integration: &Integration) -> Result<()>;

    async fn find_by_id(&self, id: &IntegrationId) -> Result<Option<Integration>>;

    /// Find an integration only if it belongs to `owner_id`
    async fn find_for_owner(
        &self,
        id: &IntegrationId,
        owner_id: &str,
    ) -> Result<Option<Integration>>;

    /// Record the outcome of a sync run
    async fn update_health(
        &self,
        id: &IntegrationId,
        status: IntegrationStatus,
        last_sync_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Record the outcome of a connection check
    async fn update_connection_status(
        &self,
        id: &IntegrationId,
        status: IntegrationStatus,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()>;
}

/// Sync log persistence
#[async_trait]
pub trait SyncLogRepository: Send + Sync {
    async fn insert(&self, log: &SyncLog) -> Result<()>;

    /// Persist status, counts and completion of an existing log
    async fn update(&self, log: &SyncLog) -> Result<()>;

    async fn find_by_id(&self, id: &SyncLogId) -> Result<Option<SyncLog>>;

    /// Run history for an integration, newest first
    async fn find_by_integration(
        &self,
        integration_id: &IntegrationId,
        limit: u32,
    ) -> Result<Vec<SyncLog>>;
}

fn db_err(e: sqlx::Error) -> SyncError {
    SyncError::Database(e.to_string())
}

fn from_millis(value: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| SyncError::Database(format!("Invalid timestamp: {}", value)))
}

fn parse_json(column: &str, raw: &str) -> Result<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(raw)
        .map_err(|e| SyncError::Database(format!("Invalid JSON in {}: {}", column, e)))
}

// ============================================================================
// Integrations
// ============================================================================

/// SQLite implementation of IntegrationRepository
pub struct SqliteIntegrationRepository {
    pool: SqlitePool,
}

impl SqliteIntegrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct IntegrationRow {
    id: String,
    owner_id: String,
    readspace_id: String,
    provider: String,
    integration_name: String,
    credentials: String,
    sync_settings: String,
    status: String,
    last_sync_at: Option<i64>,
    error_message: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<IntegrationRow> for Integration {
    type Error = SyncError;

    fn try_from(row: IntegrationRow) -> Result<Self> {
        Ok(Integration {
            id: IntegrationId::from_string(&row.id)?,
            owner_id: row.owner_id,
            readspace_id: row.readspace_id,
            provider: row.provider,
            integration_name: row.integration_name,
            credentials: parse_json("credentials", &row.credentials)?,
            sync_settings: parse_json("sync_settings", &row.sync_settings)?,
            status: row.status.parse()?,
            last_sync_at: row.last_sync_at.map(from_millis).transpose()?,
            error_message: row.error_message,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

const INTEGRATION_COLUMNS: &str = "id, owner_id, readspace_id, provider, integration_name, \
     credentials, sync_settings, status, last_sync_at, error_message, created_at, updated_at";

#[async_trait]
impl IntegrationRepository for SqliteIntegrationRepository {
    async fn insert(&self, integration: &Integration) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO integrations (
                id, owner_id, readspace_id, provider, integration_name,
                credentials, sync_settings, status, last_sync_at, error_message,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(integration.id.as_str())
        .bind(&integration.owner_id)
        .bind(&integration.readspace_id)
        .bind(&integration.provider)
        .bind(&integration.integration_name)
        .bind(integration.credentials.to_string())
        .bind(integration.sync_settings.to_string())
        .bind(integration.status.as_str())
        .bind(integration.last_sync_at.map(|t| t.timestamp_millis()))
        .bind(&integration.error_message)
        .bind(integration.created_at.timestamp_millis())
        .bind(integration.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &IntegrationId) -> Result<Option<Integration>> {
        let row = sqlx::query_as::<_, IntegrationRow>(&format!(
            "SELECT {} FROM integrations WHERE id = ?",
            INTEGRATION_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Integration::try_from).transpose()
    }

    async fn find_for_owner(
        &self,
        id: &IntegrationId,
        owner_id: &str,
    ) -> Result<Option<Integration>> {
        let row = sqlx::query_as::<_, IntegrationRow>(&format!(
            "SELECT {} FROM integrations WHERE id = ? AND owner_id = ?",
            INTEGRATION_COLUMNS
        ))
        .bind(id.as_str())
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Integration::try_from).transpose()
    }

    async fn update_health(
        &self,
        id: &IntegrationId,
        status: IntegrationStatus,
        last_sync_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE integrations SET status = ?, last_sync_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(last_sync_at.timestamp_millis())
        .bind(last_sync_at.timestamp_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::IntegrationNotFound {
                integration_id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn update_connection_status(
        &self,
        id: &IntegrationId,
        status: IntegrationStatus,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE integrations SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(now.timestamp_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::IntegrationNotFound {
                integration_id: id.to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Sync logs
// ============================================================================

/// SQLite implementation of SyncLogRepository
pub struct SqliteSyncLogRepository {
    pool: SqlitePool,
}

impl SqliteSyncLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SyncLogRow {
    id: String,
    integration_id: String,
    run_type: String,
    status: String,
    items_synced: i64,
    items_failed: i64,
    error_details: Option<String>,
    started_at: i64,
    completed_at: Option<i64>,
}

impl TryFrom<SyncLogRow> for SyncLog {
    type Error = SyncError;

    fn try_from(row: SyncLogRow) -> Result<Self> {
        Ok(SyncLog {
            id: SyncLogId::from_string(&row.id)?,
            integration_id: IntegrationId::from_string(&row.integration_id)?,
            run_type: row.run_type.parse()?,
            status: row.status.parse()?,
            items_synced: row.items_synced.max(0) as u64,
            items_failed: row.items_failed.max(0) as u64,
            error_details: row.error_details,
            started_at: from_millis(row.started_at)?,
            completed_at: row.completed_at.map(from_millis).transpose()?,
        })
    }
}

const SYNC_LOG_COLUMNS: &str = "id, integration_id, run_type, status, items_synced, \
     items_failed, error_details, started_at, completed_at";

#[async_trait]
impl SyncLogRepository for SqliteSyncLogRepository {
    async fn insert(&self, log: &SyncLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_logs (
                id, integration_id, run_type, status, items_synced, items_failed,
                error_details, started_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.id.as_str())
        .bind(log.integration_id.as_str())
        .bind(log.run_type.as_str())
        .bind(log.status.as_str())
        .bind(log.items_synced as i64)
        .bind(log.items_failed as i64)
        .bind(&log.error_details)
        .bind(log.started_at.timestamp_millis())
        .bind(log.completed_at.map(|t| t.timestamp_millis()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn update(&self, log: &SyncLog) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sync_logs SET
                status = ?,
                items_synced = ?,
                items_failed = ?,
                error_details = ?,
                completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(log.status.as_str())
        .bind(log.items_synced as i64)
        .bind(log.items_failed as i64)
        .bind(&log.error_details)
        .bind(log.completed_at.map(|t| t.timestamp_millis()))
        .bind(log.id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::SyncLogNotFound {
                log_id: log.id.to_string(),
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &SyncLogId) -> Result<Option<SyncLog>> {
        let row = sqlx::query_as::<_, SyncLogRow>(&format!(
            "SELECT {} FROM sync_logs WHERE id = ?",
            SYNC_LOG_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SyncLog::try_from).transpose()
    }

    async fn find_by_integration(
        &self,
        integration_id: &IntegrationId,
        limit: u32,
    ) -> Result<Vec<SyncLog>> {
        let rows = sqlx::query_as::<_, SyncLogRow>(&format!(
            "SELECT {} FROM sync_logs WHERE integration_id = ? \
             ORDER BY started_at DESC, rowid DESC LIMIT ?",
            SYNC_LOG_COLUMNS
        ))
        .bind(integration_id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(SyncLog::try_from).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

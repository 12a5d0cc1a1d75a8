//! # Sync Log State Machine
//!
//! One `SyncLog` is written per run that passes authorization. It is created
//! `Pending` when the run starts and closed exactly once.
//!
//! ```text
//! Pending ──complete──→ Synced
//!    │
//!    └─────fail───────→ Error
//! ```
//!
//! `Synced` means the run finished and the counts are final; individual items
//! may still have failed (`items_failed > 0`). `Error` means the run could not
//! produce a breakdown at all.

use crate::{IntegrationId, Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a sync log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncLogId(Uuid);

impl SyncLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::InvalidId(format!("{}: {}", s, e)))
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a run was triggered. Recorded only; item selection is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Full,
    Incremental,
    #[default]
    Manual,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Full => "full",
            RunType::Incremental => "incremental",
            RunType::Manual => "manual",
        }
    }
}

impl FromStr for RunType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "full" => Ok(RunType::Full),
            "incremental" => Ok(RunType::Incremental),
            "manual" => Ok(RunType::Manual),
            _ => Err(SyncError::InvalidRunType(s.to_string())),
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncLogStatus {
    Pending,
    Synced,
    Error,
}

impl SyncLogStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncLogStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncLogStatus::Pending => "pending",
            SyncLogStatus::Synced => "synced",
            SyncLogStatus::Error => "error",
        }
    }
}

impl FromStr for SyncLogStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncLogStatus::Pending),
            "synced" => Ok(SyncLogStatus::Synced),
            "error" => Ok(SyncLogStatus::Error),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for SyncLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of one sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: SyncLogId,
    pub integration_id: IntegrationId,
    pub run_type: RunType,
    pub status: SyncLogStatus,
    pub items_synced: u64,
    pub items_failed: u64,
    pub error_details: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncLog {
    /// Open a pending log for a run starting at `now`
    pub fn start(integration_id: IntegrationId, run_type: RunType, now: DateTime<Utc>) -> Self {
        Self {
            id: SyncLogId::new(),
            integration_id,
            run_type,
            status: SyncLogStatus::Pending,
            items_synced: 0,
            items_failed: 0,
            error_details: None,
            started_at: now,
            completed_at: None,
        }
    }

    /// Close the run with its final counts
    ///
    /// # Errors
    ///
    /// Returns an error if the log is already closed
    pub fn complete(mut self, items_synced: u64, items_failed: u64, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncLogStatus::Synced)?;
        self.status = SyncLogStatus::Synced;
        self.items_synced = items_synced;
        self.items_failed = items_failed;
        self.completed_at = Some(now);
        Ok(self)
    }

    /// Close the run as failed
    ///
    /// # Errors
    ///
    /// Returns an error if the log is already closed
    pub fn fail(mut self, details: impl Into<String>, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncLogStatus::Error)?;
        self.status = SyncLogStatus::Error;
        self.error_details = Some(details.into());
        self.completed_at = Some(now);
        Ok(self)
    }

    /// Wall time of a closed run in milliseconds
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|completed| (completed - self.started_at).num_milliseconds())
    }

    fn validate_transition(&self, to: SyncLogStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: "Sync log is already closed".to_string(),
            });
        }
        Ok(())
    }
}

//! # Content Sync Engine
//!
//! Pushes a readspace's books and quotes to an external provider and keeps
//! track of what happened.
//!
//! ## Components
//!
//! - **Integrations** (`integration`): provider link, settings and the
//!   health rule applied after each run
//! - **Sync Log** (`sync_log`): one record per run, `pending` until closed
//!   exactly once as `synced` or `error`
//! - **Provider Adapters** (`provider`): the capability trait each provider
//!   implements, the per-phase `SyncResult` and the adapter registry
//! - **Repositories** (`repository`): SQLite persistence for integrations and
//!   sync logs
//! - **Sync Orchestrator** (`coordinator`): runs books then quotes and
//!   records the outcome
//! - **Destination Directory** (`destinations`): connection checks and
//!   container listing outside of runs

pub mod coordinator;
pub mod destinations;
pub mod error;
pub mod integration;
pub mod provider;
pub mod repository;
pub mod sync_log;

pub use coordinator::{ContentSyncResults, SyncOrchestrator, SyncRunOutcome};
pub use destinations::DestinationDirectory;
pub use error::{Result, SyncError};
pub use integration::{
    Integration, IntegrationId, IntegrationStatus, ProviderKind, SyncDirection, SyncFrequency,
    SyncSettings,
};
pub use provider::{
    AdapterFactory, Destination, DestinationKind, FailedItem, ParentLookup, ProviderRegistry,
    ProviderSyncAdapter, SyncResult, SyncedIndex,
};
pub use repository::{
    IntegrationRepository, SqliteIntegrationRepository, SqliteSyncLogRepository,
    SyncLogRepository,
};
pub use sync_log::{RunType, SyncLog, SyncLogId, SyncLogStatus};

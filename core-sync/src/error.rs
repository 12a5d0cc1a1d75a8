use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing, foreign or inactive integration. Raised before a sync log exists.
    #[error("Integration {integration_id} not found or not active")]
    NotFoundOrInactive { integration_id: String },

    #[error("Integration {integration_id} not found")]
    IntegrationNotFound { integration_id: String },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid sync settings for {provider}: {message}")]
    InvalidSettings { provider: String, message: String },

    /// The content store could not be read or written
    #[error("Content store error: {0}")]
    ContentStore(#[from] LibraryError),

    #[error("Sync log {log_id} not found")]
    SyncLogNotFound { log_id: String },

    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid run type: {0}")]
    InvalidRunType(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(String),
}

impl SyncError {
    /// Whether the error happened while building a provider adapter
    pub fn is_adapter_resolution(&self) -> bool {
        matches!(
            self,
            SyncError::UnsupportedProvider(_) | SyncError::InvalidSettings { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

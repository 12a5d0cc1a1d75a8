//! Error types for the Notion provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Notion provider errors
///
/// These never leave the adapter as errors: sync calls turn them into failed
/// items, and connection checks turn them into `false`.
#[derive(Error, Debug)]
pub enum NotionError {
    /// API returned a non-success status
    #[error("Notion API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by Notion, retry after {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    /// Failed to parse an API response
    #[error("Failed to parse Notion response: {0}")]
    ParseError(String),

    /// Quote whose parent book has no Notion page yet
    #[error("Book not synced to Notion yet")]
    MissingParent { book_id: String },

    /// A container id the operation needs is absent from the target config
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, NotionError>;

impl From<NotionError> for BridgeError {
    fn from(error: NotionError) -> Self {
        match error {
            NotionError::Bridge(e) => e,
            NotionError::RateLimited {
                retry_after_seconds,
            } => BridgeError::OperationFailed(format!(
                "Rate limited, retry after {} seconds",
                retry_after_seconds
            )),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

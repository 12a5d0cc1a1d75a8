//! # Repository Pattern Implementation
//!
//! Content store access for the sync engine.
//!
//! - Traits define the interface, so the orchestrator can run against fakes
//! - SQLite implementations use sqlx
//! - Reads are scoped to one readspace; the only write the sync engine needs
//!   besides fixtures is replacing an item's `sync_data`

pub mod book;
pub mod quote;

pub use book::{BookRepository, SqliteBookRepository};
pub use quote::{QuoteRepository, SqliteQuoteRepository};

use crate::error::{LibraryError, Result};
use crate::models::ItemSyncData;

pub(crate) fn decode_sync_data(id: &str, raw: &str) -> Result<ItemSyncData> {
    ItemSyncData::from_json(raw).map_err(|e| LibraryError::InvalidSyncData {
        id: id.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn encode_sync_data(id: &str, data: &ItemSyncData) -> Result<String> {
    data.to_json().map_err(|e| LibraryError::InvalidSyncData {
        id: id.to_string(),
        message: e.to_string(),
    })
}

//! Domain models for the content store
//!
//! Books and quotes are owned by a readspace (a user's content workspace).
//! Each item carries `sync_data`, a per-provider record of where the item
//! lives remotely and how its last push went.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// Sync bookkeeping
// =============================================================================

/// Outcome of the last push of an item to one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSyncStatus {
    Pending,
    Synced,
    Error,
}

impl ItemSyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSyncStatus::Pending => "pending",
            ItemSyncStatus::Synced => "synced",
            ItemSyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for ItemSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemSyncStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemSyncStatus::Pending),
            "synced" => Ok(ItemSyncStatus::Synced),
            "error" => Ok(ItemSyncStatus::Error),
            other => Err(format!("Invalid item sync status: {}", other)),
        }
    }
}

/// Remote identity of an item at one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub last_synced_at: DateTime<Utc>,
    pub sync_status: ItemSyncStatus,
}

impl SyncRecord {
    /// Record for an item the provider just accepted
    pub fn synced(
        external_id: impl Into<String>,
        url: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            url,
            last_synced_at: at,
            sync_status: ItemSyncStatus::Synced,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.sync_status == ItemSyncStatus::Synced && !self.external_id.is_empty()
    }
}

/// Per-provider sync records keyed by provider identifier (`"notion"`, ...)
///
/// Stored as a JSON object in the `sync_data` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemSyncData(BTreeMap<String, SyncRecord>);

impl ItemSyncData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, provider: &str) -> Option<&SyncRecord> {
        self.0.get(provider)
    }

    /// Insert or replace the record for `provider`
    pub fn record(&mut self, provider: impl Into<String>, record: SyncRecord) {
        self.0.insert(provider.into(), record);
    }

    /// External id of a successfully synced record for `provider`
    pub fn synced_external_id(&self, provider: &str) -> Option<&str> {
        self.get(provider)
            .filter(|record| record.is_synced())
            .map(|record| record.external_id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse the stored column value. Empty and `null` values are treated as
    /// no records.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::default());
        }
        serde_json::from_str(trimmed)
    }
}

/// Shared view over books and quotes used by the sync engine
pub trait ContentItem {
    fn id(&self) -> &str;
    fn sync_data(&self) -> &ItemSyncData;
    fn sync_data_mut(&mut self) -> &mut ItemSyncData;
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// =============================================================================
// Books
// =============================================================================

/// A book in a readspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub readspace_id: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publish_year: Option<i32>,
    pub page_count: Option<i32>,
    /// Soft-delete flag; deleted books are never synced
    pub is_deleted: bool,
    /// Unix epoch milliseconds
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub sync_data: ItemSyncData,
}

impl Book {
    pub fn new(readspace_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            readspace_id: readspace_id.into(),
            title: title.into(),
            author: None,
            description: None,
            publisher: None,
            publish_year: None,
            page_count: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            sync_data: ItemSyncData::default(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Book id cannot be empty".to_string());
        }
        if self.readspace_id.trim().is_empty() {
            return Err("Book readspace_id cannot be empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("Book title cannot be empty".to_string());
        }
        if matches!(self.page_count, Some(count) if count < 0) {
            return Err("Book page_count cannot be negative".to_string());
        }
        Ok(())
    }
}

impl ContentItem for Book {
    fn id(&self) -> &str {
        &self.id
    }

    fn sync_data(&self) -> &ItemSyncData {
        &self.sync_data
    }

    fn sync_data_mut(&mut self) -> &mut ItemSyncData {
        &mut self.sync_data
    }
}

// =============================================================================
// Quotes
// =============================================================================

/// A quote, optionally belonging to a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub readspace_id: String,
    pub book_id: Option<String>,
    pub content: Option<String>,
    pub page: Option<i32>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub sync_data: ItemSyncData,
    /// Parent book as loaded alongside the quote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
}

impl Quote {
    pub fn new(readspace_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            readspace_id: readspace_id.into(),
            book_id: None,
            content: Some(content.into()),
            page: None,
            created_at: now_millis(),
            updated_at: None,
            sync_data: ItemSyncData::default(),
            book: None,
        }
    }

    pub fn for_book(mut self, book: &Book) -> Self {
        self.book_id = Some(book.id.clone());
        self.book = Some(book.clone());
        self
    }

    pub fn with_page(mut self, page: i32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Quote id cannot be empty".to_string());
        }
        if self.readspace_id.trim().is_empty() {
            return Err("Quote readspace_id cannot be empty".to_string());
        }
        if let (Some(book_id), Some(book)) = (&self.book_id, &self.book) {
            if &book.id != book_id {
                return Err("Quote book does not match book_id".to_string());
            }
        }
        Ok(())
    }
}

impl ContentItem for Quote {
    fn id(&self) -> &str {
        &self.id
    }

    fn sync_data(&self) -> &ItemSyncData {
        &self.sync_data
    }

    fn sync_data_mut(&mut self) -> &mut ItemSyncData {
        &mut self.sync_data
    }
}

//! # Provider Sync Adapters
//!
//! The capability set every provider implements, plus the pieces the
//! orchestrator and adapters share:
//!
//! - [`SyncResult`]: per-phase `{success, failed}` built as a fold over items
//! - [`SyncedIndex`]: book id → synced remote record, handed from the books
//!   phase to the quotes phase
//! - [`ProviderRegistry`]: resolves an adapter for an integration, failing
//!   with [`SyncError::UnsupportedProvider`] for providers without one
//!
//! Adapters never raise for item-level problems. `sync_books`/`sync_quotes`
//! convert every per-item failure into a [`FailedItem`], and
//! `validate_connection`/`list_destinations` degrade to `false` / empty.

use crate::integration::{Integration, ProviderKind, SyncSettings};
use crate::{Result, SyncError};
use async_trait::async_trait;
use core_library::{Book, Quote, SyncRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Results
// ============================================================================

/// An item the provider did not accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub id: String,
    pub error: String,
}

/// Outcome of one phase, in item order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: Vec<String>,
    pub failed: Vec<FailedItem>,
}

impl SyncResult {
    /// Fold step: append one item's outcome
    pub fn with_outcome<E: fmt::Display>(
        mut self,
        id: &str,
        outcome: std::result::Result<(), E>,
    ) -> Self {
        match outcome {
            Ok(()) => self.success.push(id.to_string()),
            Err(error) => self.failed.push(FailedItem {
                id: id.to_string(),
                error: error.to_string(),
            }),
        }
        self
    }

    pub fn success_count(&self) -> u64 {
        self.success.len() as u64
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.len() as u64
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<E: fmt::Display> FromIterator<(String, std::result::Result<(), E>)> for SyncResult {
    fn from_iter<I: IntoIterator<Item = (String, std::result::Result<(), E>)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(SyncResult::default(), |acc, (id, outcome)| {
                acc.with_outcome(&id, outcome)
            })
    }
}

// ============================================================================
// Synced index
// ============================================================================

/// Where a quote's parent stands at the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLookup<'a> {
    /// The quote has no parent book
    NoParent,
    /// The parent exists remotely
    Synced(&'a SyncRecord),
    /// The parent has no synced record for this provider
    NotSynced { book_id: &'a str },
}

/// Book id → remote record for one provider
///
/// Built from the books after the books phase, so it holds records written
/// earlier in the same run as well as those from prior runs.
#[derive(Debug, Clone)]
pub struct SyncedIndex {
    provider: ProviderKind,
    books: HashMap<String, SyncRecord>,
}

impl SyncedIndex {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            books: HashMap::new(),
        }
    }

    /// Index every book that carries a synced record for `provider`
    pub fn from_books(provider: ProviderKind, books: &[Book]) -> Self {
        let mut index = Self::new(provider);
        for book in books {
            if let Some(record) = book.sync_data.get(provider.as_str()) {
                if record.is_synced() {
                    index.insert(book.id.clone(), record.clone());
                }
            }
        }
        debug!(provider = provider.as_str(), books = index.len(), "Built synced book index");
        index
    }

    pub fn insert(&mut self, book_id: impl Into<String>, record: SyncRecord) {
        self.books.insert(book_id.into(), record);
    }

    pub fn get(&self, book_id: &str) -> Option<&SyncRecord> {
        self.books.get(book_id)
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Dependency check for a quote
    ///
    /// Looks in the index first, then in the parent book loaded with the
    /// quote (which covers a parent that is no longer in the active set).
    pub fn parent_of<'a>(&'a self, quote: &'a Quote) -> ParentLookup<'a> {
        let Some(book_id) = quote.book_id.as_deref() else {
            return ParentLookup::NoParent;
        };

        if let Some(record) = self.get(book_id) {
            return ParentLookup::Synced(record);
        }

        quote
            .book
            .as_ref()
            .and_then(|book| book.sync_data.get(self.provider.as_str()))
            .filter(|record| record.is_synced())
            .map(ParentLookup::Synced)
            .unwrap_or(ParentLookup::NotSynced { book_id })
    }
}

// ============================================================================
// Destinations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Page,
    Database,
    Folder,
}

/// A provider-side container items can be written into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DestinationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
}

// ============================================================================
// Adapter contract
// ============================================================================

/// Per-provider implementation of the sync capability set
///
/// An adapter is built for one integration and owns its credentials and
/// target configuration, so the sync calls only take the items.
#[async_trait]
pub trait ProviderSyncAdapter: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Whether the credentials are accepted. Never fails.
    async fn validate_connection(&self) -> bool;

    /// Containers the user could target. Empty on any remote error.
    async fn list_destinations(&self) -> Vec<Destination>;

    /// Create (or reuse) one remote container per book
    ///
    /// On success the book's `sync_data[provider]` is set to a synced record.
    /// Failed books keep their previous `sync_data`.
    async fn sync_books(&self, books: &mut [Book]) -> SyncResult;

    /// Append each quote under its parent book, or under the fallback
    /// container when it has no parent
    ///
    /// A quote whose parent is not in `synced_books` (and has no synced
    /// record of its own) fails without any remote call.
    async fn sync_quotes(&self, quotes: &mut [Quote], synced_books: &SyncedIndex) -> SyncResult;
}

/// Builds adapters for one provider
pub trait AdapterFactory: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// # Errors
    ///
    /// [`SyncError::InvalidSettings`] when credentials or the target
    /// configuration do not fit this provider
    fn create(
        &self,
        integration: &Integration,
        settings: &SyncSettings,
    ) -> Result<Box<dyn ProviderSyncAdapter>>;
}

/// Provider name → adapter factory
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    factories: HashMap<ProviderKind, Arc<dyn AdapterFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one for the same provider
    pub fn register(&mut self, factory: Arc<dyn AdapterFactory>) {
        self.factories.insert(factory.provider(), factory);
    }

    pub fn with_factory(mut self, factory: Arc<dyn AdapterFactory>) -> Self {
        self.register(factory);
        self
    }

    pub fn supports(&self, provider: ProviderKind) -> bool {
        self.factories.contains_key(&provider)
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        self.factories.keys().copied().collect()
    }

    /// Build the adapter for an integration
    ///
    /// # Errors
    ///
    /// - [`SyncError::UnsupportedProvider`] for unknown providers and known
    ///   providers without a registered factory
    /// - [`SyncError::InvalidSettings`] for malformed settings
    pub fn resolve(&self, integration: &Integration) -> Result<Box<dyn ProviderSyncAdapter>> {
        let provider = integration.provider_kind()?;
        let factory = self
            .factories
            .get(&provider)
            .ok_or_else(|| SyncError::UnsupportedProvider(integration.provider.clone()))?;
        let settings = integration.settings()?;

        factory.create(integration, &settings)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

//! # Sync Orchestrator
//!
//! Runs one sync of an integration's books and quotes against its provider.
//!
//! ## Workflow
//!
//! 1. Load the integration for the caller; it must exist and be active.
//!    Otherwise the run is rejected before any sync log exists.
//! 2. Open a pending [`SyncLog`].
//! 3. Resolve the provider adapter from the registry.
//! 4. Fetch the readspace's active books and its quotes (with parent book).
//! 5. Books phase, then quotes phase. The quotes phase receives a
//!    [`SyncedIndex`] built from the books after the books phase.
//! 6. Close the log with the aggregated counts.
//! 7. Write integration health from the failure count.
//!
//! After each phase the sync state of every successful item is saved, even
//! when an earlier save in the same phase failed, so a later run reuses the
//! remote containers instead of creating them again.
//!
//! Item failures end up in the returned [`ContentSyncResults`]. Anything that
//! prevents a breakdown (adapter resolution, content store errors) closes the
//! log as `error` and is returned to the caller; integration health is not
//! touched in that case.
//!
//! Runs for the same integration are not serialized here. The trigger layer
//! is expected to start at most one run per integration at a time.

use crate::integration::{Integration, IntegrationId, IntegrationStatus};
use crate::provider::{ProviderRegistry, ProviderSyncAdapter, SyncResult, SyncedIndex};
use crate::repository::{IntegrationRepository, SyncLogRepository};
use crate::sync_log::{RunType, SyncLog, SyncLogId};
use crate::{Result, SyncError};
use bridge_traits::Clock;
use core_library::{Book, BookRepository, ContentItem, Quote, QuoteRepository};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Per-kind breakdown of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSyncResults {
    pub books: SyncResult,
    pub quotes: SyncResult,
}

impl ContentSyncResults {
    pub fn items_synced(&self) -> u64 {
        self.books.success_count() + self.quotes.success_count()
    }

    pub fn items_failed(&self) -> u64 {
        self.books.failed_count() + self.quotes.failed_count()
    }
}

/// What a completed run reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRunOutcome {
    pub sync_log_id: SyncLogId,
    pub results: ContentSyncResults,
    /// Health written to the integration at the end of the run
    pub integration_status: IntegrationStatus,
}

pub struct SyncOrchestrator {
    integrations: Arc<dyn IntegrationRepository>,
    sync_logs: Arc<dyn SyncLogRepository>,
    books: Arc<dyn BookRepository>,
    quotes: Arc<dyn QuoteRepository>,
    registry: Arc<ProviderRegistry>,
    clock: Arc<dyn Clock>,
}

impl SyncOrchestrator {
    pub fn new(
        integrations: Arc<dyn IntegrationRepository>,
        sync_logs: Arc<dyn SyncLogRepository>,
        books: Arc<dyn BookRepository>,
        quotes: Arc<dyn QuoteRepository>,
        registry: Arc<ProviderRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            integrations,
            sync_logs,
            books,
            quotes,
            registry,
            clock,
        }
    }

    /// Sync all content of an integration's readspace to its provider
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotFoundOrInactive`] if the integration is missing,
    ///   belongs to someone else or is not active (no sync log is written)
    /// - [`SyncError::UnsupportedProvider`] / [`SyncError::InvalidSettings`]
    ///   if no adapter can be built (the log is closed as `error`)
    /// - [`SyncError::ContentStore`] if items cannot be read or their sync
    ///   state cannot be saved (the log is closed as `error`)
    #[instrument(skip(self), fields(integration_id = %integration_id))]
    pub async fn sync_content(
        &self,
        owner_id: &str,
        integration_id: &IntegrationId,
        run_type: RunType,
    ) -> Result<SyncRunOutcome> {
        let integration = self
            .integrations
            .find_for_owner(integration_id, owner_id)
            .await?
            .filter(Integration::is_active)
            .ok_or_else(|| SyncError::NotFoundOrInactive {
                integration_id: integration_id.to_string(),
            })?;

        let log = SyncLog::start(integration.id, run_type, self.clock.now());
        self.sync_logs.insert(&log).await?;
        info!(
            sync_log_id = %log.id,
            provider = %integration.provider,
            run_type = %run_type,
            "Started sync run"
        );

        let results = match self.run_phases(&integration).await {
            Ok(results) => results,
            Err(e) => {
                self.close_failed(log, &e).await;
                return Err(e);
            }
        };

        let items_synced = results.items_synced();
        let items_failed = results.items_failed();

        let pending = log.clone();
        let completed = log.complete(items_synced, items_failed, self.clock.now())?;
        if let Err(e) = self.sync_logs.update(&completed).await {
            self.close_failed(pending, &e).await;
            return Err(e);
        }

        let status = IntegrationStatus::from_failures(items_failed);
        self.integrations
            .update_health(&integration.id, status, self.clock.now())
            .await?;

        info!(
            sync_log_id = %completed.id,
            items_synced,
            items_failed,
            status = %status,
            duration_ms = completed.duration_ms().unwrap_or_default(),
            "Sync run completed"
        );

        Ok(SyncRunOutcome {
            sync_log_id: completed.id,
            results,
            integration_status: status,
        })
    }

    /// Recent runs of an integration, newest first
    ///
    /// # Errors
    ///
    /// [`SyncError::IntegrationNotFound`] if the caller does not own the
    /// integration
    pub async fn history(
        &self,
        owner_id: &str,
        integration_id: &IntegrationId,
        limit: u32,
    ) -> Result<Vec<SyncLog>> {
        if self
            .integrations
            .find_for_owner(integration_id, owner_id)
            .await?
            .is_none()
        {
            return Err(SyncError::IntegrationNotFound {
                integration_id: integration_id.to_string(),
            });
        }

        self.sync_logs
            .find_by_integration(integration_id, limit)
            .await
    }

    async fn run_phases(&self, integration: &Integration) -> Result<ContentSyncResults> {
        let adapter = self.registry.resolve(integration)?;
        debug!(provider = %adapter.provider(), "Adapter ready");

        let mut books = self
            .books
            .find_active_by_readspace(&integration.readspace_id)
            .await?;
        let mut quotes = self
            .quotes
            .find_by_readspace_with_book(&integration.readspace_id)
            .await?;
        debug!(
            books = books.len(),
            quotes = quotes.len(),
            "Fetched content"
        );

        let book_results = self.sync_books(adapter.as_ref(), &mut books).await?;

        let index = SyncedIndex::from_books(adapter.provider(), &books);
        let quote_results = self
            .sync_quotes(adapter.as_ref(), &mut quotes, &index)
            .await?;

        Ok(ContentSyncResults {
            books: book_results,
            quotes: quote_results,
        })
    }

    async fn sync_books(
        &self,
        adapter: &dyn ProviderSyncAdapter,
        books: &mut [Book],
    ) -> Result<SyncResult> {
        let result = adapter.sync_books(books).await;
        info!(
            synced = result.success_count(),
            failed = result.failed_count(),
            "Books phase finished"
        );

        // Successes are already remote; keep saving past a failed write
        let mut first_error = None;
        for book in succeeded(books, &result) {
            if let Err(e) = self.books.update_sync_data(&book.id, book.sync_data()).await {
                warn!(item_id = %book.id, "Failed to save book sync state: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(result),
        }
    }

    async fn sync_quotes(
        &self,
        adapter: &dyn ProviderSyncAdapter,
        quotes: &mut [Quote],
        index: &SyncedIndex,
    ) -> Result<SyncResult> {
        let result = adapter.sync_quotes(quotes, index).await;
        info!(
            synced = result.success_count(),
            failed = result.failed_count(),
            "Quotes phase finished"
        );

        let mut first_error = None;
        for quote in succeeded(quotes, &result) {
            if let Err(e) = self.quotes.update_sync_data(&quote.id, quote.sync_data()).await {
                warn!(item_id = %quote.id, "Failed to save quote sync state: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(result),
        }
    }

    async fn close_failed(&self, log: SyncLog, error: &SyncError) {
        let log_id = log.id;
        warn!(sync_log_id = %log_id, error = %error, "Sync run failed");

        match log.fail(error.to_string(), self.clock.now()) {
            Ok(failed) => {
                if let Err(e) = self.sync_logs.update(&failed).await {
                    warn!(sync_log_id = %log_id, "Failed to close sync log: {}", e);
                }
            }
            Err(e) => warn!(sync_log_id = %log_id, "Sync log already closed: {}", e),
        }
    }
}

fn succeeded<'a, T: ContentItem>(
    items: &'a [T],
    result: &'a SyncResult,
) -> impl Iterator<Item = &'a T> + 'a {
    let ids: HashSet<&str> = result.success.iter().map(String::as_str).collect();
    items.iter().filter(move |item| ids.contains(item.id()))
}

//! End-to-end runs of the sync orchestrator
//!
//! Real SQLite repositories with a scripted in-process provider. The
//! provider counts remote writes so reuse of existing containers can be
//! asserted.

use async_trait::async_trait;
use bridge_traits::{Clock, FixedClock};
use chrono::{Duration, TimeZone, Utc};
use core_library::db::create_test_pool;
use core_library::{
    Book, BookRepository, ItemSyncData, LibraryError, Quote, QuoteRepository,
    SqliteBookRepository, SqliteQuoteRepository, SyncRecord,
};
use core_sync::{
    AdapterFactory, Destination, Integration, IntegrationRepository, IntegrationStatus,
    ParentLookup, ProviderKind, ProviderRegistry, ProviderSyncAdapter, RunType,
    SqliteIntegrationRepository, SqliteSyncLogRepository, SyncError, SyncLogRepository,
    SyncLogStatus, SyncOrchestrator, SyncResult, SyncSettings, SyncedIndex,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const OWNER: &str = "owner-1";
const READSPACE: &str = "rs-1";

// ============================================================================
// Scripted provider
// ============================================================================

/// Remote side shared by every adapter the factory builds
#[derive(Default)]
struct RemoteState {
    rejected_titles: Mutex<HashSet<String>>,
    containers_created: AtomicUsize,
    blocks_appended: AtomicUsize,
}

impl RemoteState {
    fn reject(&self, title: &str) {
        self.rejected_titles.lock().unwrap().insert(title.to_string());
    }

    fn rejects(&self, title: &str) -> bool {
        self.rejected_titles.lock().unwrap().contains(title)
    }

    fn containers(&self) -> usize {
        self.containers_created.load(Ordering::SeqCst)
    }

    fn blocks(&self) -> usize {
        self.blocks_appended.load(Ordering::SeqCst)
    }
}

struct ScriptedAdapter {
    remote: Arc<RemoteState>,
    clock: Arc<dyn Clock>,
}

impl ScriptedAdapter {
    fn push_book(&self, book: &mut Book) -> Result<(), String> {
        if book.sync_data.synced_external_id("notion").is_some() {
            return Ok(());
        }
        if self.remote.rejects(&book.title) {
            return Err(format!("Remote rejected '{}'", book.title));
        }

        let n = self.remote.containers_created.fetch_add(1, Ordering::SeqCst) + 1;
        book.sync_data.record(
            "notion",
            SyncRecord::synced(format!("p{}", n), None, self.clock.now()),
        );
        Ok(())
    }

    fn push_quote(&self, quote: &mut Quote, index: &SyncedIndex) -> Result<(), String> {
        if let ParentLookup::NotSynced { book_id } = index.parent_of(quote) {
            return Err(format!("Book {} not synced to Notion yet", book_id));
        }
        if quote.sync_data.synced_external_id("notion").is_some() {
            return Ok(());
        }

        let n = self.remote.blocks_appended.fetch_add(1, Ordering::SeqCst) + 1;
        quote.sync_data.record(
            "notion",
            SyncRecord::synced(format!("b{}", n), None, self.clock.now()),
        );
        Ok(())
    }
}

#[async_trait]
impl ProviderSyncAdapter for ScriptedAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Notion
    }

    async fn validate_connection(&self) -> bool {
        true
    }

    async fn list_destinations(&self) -> Vec<Destination> {
        Vec::new()
    }

    async fn sync_books(&self, books: &mut [Book]) -> SyncResult {
        books.iter_mut().fold(SyncResult::default(), |acc, book| {
            let outcome = self.push_book(book);
            acc.with_outcome(&book.id, outcome)
        })
    }

    async fn sync_quotes(&self, quotes: &mut [Quote], synced_books: &SyncedIndex) -> SyncResult {
        quotes.iter_mut().fold(SyncResult::default(), |acc, quote| {
            let outcome = self.push_quote(quote, synced_books);
            acc.with_outcome(&quote.id, outcome)
        })
    }
}

struct ScriptedFactory {
    remote: Arc<RemoteState>,
    clock: Arc<dyn Clock>,
}

impl AdapterFactory for ScriptedFactory {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Notion
    }

    fn create(
        &self,
        _integration: &Integration,
        _settings: &SyncSettings,
    ) -> core_sync::Result<Box<dyn ProviderSyncAdapter>> {
        Ok(Box::new(ScriptedAdapter {
            remote: self.remote.clone(),
            clock: self.clock.clone(),
        }))
    }
}

/// Content store whose book query always fails
struct UnavailableBooks;

#[async_trait]
impl BookRepository for UnavailableBooks {
    async fn find_by_id(&self, _id: &str) -> core_library::Result<Option<Book>> {
        Err(LibraryError::Database(sqlx::Error::PoolClosed))
    }

    async fn insert(&self, _book: &Book) -> core_library::Result<()> {
        Err(LibraryError::Database(sqlx::Error::PoolClosed))
    }

    async fn find_active_by_readspace(&self, _readspace_id: &str) -> core_library::Result<Vec<Book>> {
        Err(LibraryError::Database(sqlx::Error::PoolClosed))
    }

    async fn update_sync_data(
        &self,
        _id: &str,
        _sync_data: &ItemSyncData,
    ) -> core_library::Result<()> {
        Err(LibraryError::Database(sqlx::Error::PoolClosed))
    }
}

/// Delegates to SQLite but fails the `fail_on`-th sync state save (1-based)
struct FlakyBooks {
    inner: Arc<SqliteBookRepository>,
    fail_on: usize,
    saves: AtomicUsize,
}

#[async_trait]
impl BookRepository for FlakyBooks {
    async fn find_by_id(&self, id: &str) -> core_library::Result<Option<Book>> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, book: &Book) -> core_library::Result<()> {
        self.inner.insert(book).await
    }

    async fn find_active_by_readspace(&self, readspace_id: &str) -> core_library::Result<Vec<Book>> {
        self.inner.find_active_by_readspace(readspace_id).await
    }

    async fn update_sync_data(&self, id: &str, sync_data: &ItemSyncData) -> core_library::Result<()> {
        if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(LibraryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.update_sync_data(id, sync_data).await
    }
}

struct FlakyQuotes {
    inner: Arc<SqliteQuoteRepository>,
    fail_on: usize,
    saves: AtomicUsize,
}

#[async_trait]
impl QuoteRepository for FlakyQuotes {
    async fn find_by_id(&self, id: &str) -> core_library::Result<Option<Quote>> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, quote: &Quote) -> core_library::Result<()> {
        self.inner.insert(quote).await
    }

    async fn find_by_readspace_with_book(
        &self,
        readspace_id: &str,
    ) -> core_library::Result<Vec<Quote>> {
        self.inner.find_by_readspace_with_book(readspace_id).await
    }

    async fn update_sync_data(&self, id: &str, sync_data: &ItemSyncData) -> core_library::Result<()> {
        if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(LibraryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.update_sync_data(id, sync_data).await
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    integrations: Arc<SqliteIntegrationRepository>,
    sync_logs: Arc<SqliteSyncLogRepository>,
    books: Arc<SqliteBookRepository>,
    quotes: Arc<SqliteQuoteRepository>,
    remote: Arc<RemoteState>,
    clock: Arc<FixedClock>,
    registry: Arc<ProviderRegistry>,
}

impl Harness {
    async fn new() -> Self {
        let pool = create_test_pool().await.unwrap();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        ));
        let remote = Arc::new(RemoteState::default());
        let registry = Arc::new(ProviderRegistry::new().with_factory(Arc::new(ScriptedFactory {
            remote: remote.clone(),
            clock: clock.clone(),
        })));

        Self {
            integrations: Arc::new(SqliteIntegrationRepository::new(pool.clone())),
            sync_logs: Arc::new(SqliteSyncLogRepository::new(pool.clone())),
            books: Arc::new(SqliteBookRepository::new(pool.clone())),
            quotes: Arc::new(SqliteQuoteRepository::new(pool)),
            remote,
            clock,
            registry,
        }
    }

    fn orchestrator(&self) -> SyncOrchestrator {
        self.orchestrator_with_books(self.books.clone())
    }

    fn orchestrator_with_books(&self, books: Arc<dyn BookRepository>) -> SyncOrchestrator {
        self.orchestrator_with(books, self.quotes.clone())
    }

    fn orchestrator_with(
        &self,
        books: Arc<dyn BookRepository>,
        quotes: Arc<dyn QuoteRepository>,
    ) -> SyncOrchestrator {
        SyncOrchestrator::new(
            self.integrations.clone(),
            self.sync_logs.clone(),
            books,
            quotes,
            self.registry.clone(),
            self.clock.clone(),
        )
    }

    fn flaky_books(&self, fail_on: usize) -> Arc<FlakyBooks> {
        Arc::new(FlakyBooks {
            inner: self.books.clone(),
            fail_on,
            saves: AtomicUsize::new(0),
        })
    }

    fn flaky_quotes(&self, fail_on: usize) -> Arc<FlakyQuotes> {
        Arc::new(FlakyQuotes {
            inner: self.quotes.clone(),
            fail_on,
            saves: AtomicUsize::new(0),
        })
    }

    async fn assert_failed_run_kept_health(&self, integration: &Integration) {
        let logs = self
            .sync_logs
            .find_by_integration(&integration.id, 10)
            .await
            .unwrap();
        assert_eq!(logs[0].status, SyncLogStatus::Error);
        assert!(logs[0].error_details.as_deref().unwrap().contains("Content store"));

        let stored = self.integrations.find_by_id(&integration.id).await.unwrap().unwrap();
        assert_eq!(stored.status, integration.status);
        assert_eq!(stored.last_sync_at, None);
    }

    async fn integration(&self, provider: &str, status: IntegrationStatus) -> Integration {
        let mut integration = Integration::new(
            OWNER,
            READSPACE,
            ProviderKind::Notion,
            json!({ "api_key": "secret_test" }),
            self.clock.now(),
        )
        .with_status(status);
        integration.provider = provider.to_string();
        self.integrations.insert(&integration).await.unwrap();
        integration
    }

    async fn book(&self, title: &str, order: i64) -> Book {
        let mut book = Book::new(READSPACE, title);
        book.created_at = order;
        self.books.insert(&book).await.unwrap();
        book
    }

    async fn quote(&self, content: &str, parent: Option<&Book>) -> Quote {
        let mut quote = Quote::new(READSPACE, content);
        if let Some(book) = parent {
            quote = quote.for_book(book);
        }
        self.quotes.insert(&quote).await.unwrap();
        quote
    }

    async fn stored_book(&self, id: &str) -> Book {
        self.books.find_by_id(id).await.unwrap().unwrap()
    }
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_mixed_run_reports_breakdown_and_marks_error() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;
    let a = h.book("X", 1).await;
    let b = h.book("Broken", 2).await;
    let quote = h.quote("A line from X", Some(&a)).await;
    h.remote.reject("Broken");

    let outcome = h
        .orchestrator()
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await
        .unwrap();

    assert_eq!(outcome.results.books.success, vec![a.id.clone()]);
    assert_eq!(outcome.results.books.failed.len(), 1);
    assert_eq!(outcome.results.books.failed[0].id, b.id);
    assert_eq!(outcome.results.quotes.success, vec![quote.id.clone()]);
    assert!(outcome.results.quotes.failed.is_empty());
    assert_eq!(outcome.results.items_synced(), 2);
    assert_eq!(outcome.results.items_failed(), 1);
    assert_eq!(outcome.integration_status, IntegrationStatus::Error);

    let log = h
        .sync_logs
        .find_by_id(&outcome.sync_log_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status, SyncLogStatus::Synced);
    assert_eq!(log.items_synced, 2);
    assert_eq!(log.items_failed, 1);
    assert!(log.completed_at.is_some());

    let stored = h.integrations.find_by_id(&integration.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntegrationStatus::Error);
    assert_eq!(stored.last_sync_at, Some(h.clock.now()));

    // Only the accepted book carries a synced record
    assert_eq!(
        h.stored_book(&a.id).await.sync_data.synced_external_id("notion"),
        Some("p1")
    );
    assert!(h.stored_book(&b.id).await.sync_data.is_empty());

    let stored_quote = h.quotes.find_by_id(&quote.id).await.unwrap().unwrap();
    assert_eq!(stored_quote.sync_data.synced_external_id("notion"), Some("b1"));
}

#[tokio::test]
async fn test_rerun_reuses_existing_container() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;
    let a = h.book("X", 1).await;
    h.quote("Once", Some(&a)).await;

    let orchestrator = h.orchestrator();
    let first = orchestrator
        .sync_content(OWNER, &integration.id, RunType::Full)
        .await
        .unwrap();
    assert_eq!(first.integration_status, IntegrationStatus::Active);
    assert_eq!(h.remote.containers(), 1);
    assert_eq!(h.remote.blocks(), 1);

    h.clock.advance(Duration::minutes(10));
    let second = orchestrator
        .sync_content(OWNER, &integration.id, RunType::Incremental)
        .await
        .unwrap();

    assert_eq!(second.results.books.success, vec![a.id.clone()]);
    assert_eq!(h.remote.containers(), 1);
    assert_eq!(h.remote.blocks(), 1);
    assert_eq!(
        h.stored_book(&a.id).await.sync_data.synced_external_id("notion"),
        Some("p1")
    );
    assert_ne!(first.sync_log_id, second.sync_log_id);
}

#[tokio::test]
async fn test_single_failure_outweighs_many_successes() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;
    for i in 0..99 {
        h.book(&format!("Book {}", i), i).await;
    }
    h.book("Broken", 100).await;
    h.remote.reject("Broken");

    let outcome = h
        .orchestrator()
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await
        .unwrap();

    assert_eq!(outcome.results.items_synced(), 99);
    assert_eq!(outcome.results.items_failed(), 1);
    assert_eq!(outcome.integration_status, IntegrationStatus::Error);

    let stored = h.integrations.find_by_id(&integration.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntegrationStatus::Error);
}

#[tokio::test]
async fn test_quote_of_unsynced_parent_fails_without_remote_write() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;
    let broken = h.book("Broken", 1).await;
    let child = h.quote("Stranded", Some(&broken)).await;
    let orphan = h.quote("Loose", None).await;
    h.remote.reject("Broken");

    let outcome = h
        .orchestrator()
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await
        .unwrap();

    let quotes = &outcome.results.quotes;
    assert_eq!(quotes.success, vec![orphan.id.clone()]);
    assert_eq!(quotes.failed.len(), 1);
    assert_eq!(quotes.failed[0].id, child.id);
    assert!(quotes.failed[0].error.contains("not synced"));
    assert_eq!(h.remote.blocks(), 1);
}

#[tokio::test]
async fn test_deleted_parent_synced_earlier_still_hosts_quotes() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;

    let mut retired = Book::new(READSPACE, "Retired");
    retired.is_deleted = true;
    retired
        .sync_data
        .record("notion", SyncRecord::synced("p-old", None, h.clock.now()));
    h.books.insert(&retired).await.unwrap();
    let quote = h.quote("Still here", Some(&retired)).await;

    let outcome = h
        .orchestrator()
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await
        .unwrap();

    assert!(outcome.results.books.success.is_empty());
    assert_eq!(outcome.results.quotes.success, vec![quote.id]);
    assert_eq!(outcome.integration_status, IntegrationStatus::Active);
}

// ============================================================================
// Rejected and failed runs
// ============================================================================

#[tokio::test]
async fn test_inactive_or_foreign_integration_writes_no_log() {
    let h = Harness::new().await;
    let inactive = h.integration("notion", IntegrationStatus::Inactive).await;
    let active = h.integration("notion", IntegrationStatus::Active).await;
    let orchestrator = h.orchestrator();

    let result = orchestrator
        .sync_content(OWNER, &inactive.id, RunType::Manual)
        .await;
    assert!(matches!(result, Err(SyncError::NotFoundOrInactive { .. })));

    let result = orchestrator
        .sync_content("intruder", &active.id, RunType::Manual)
        .await;
    assert!(matches!(result, Err(SyncError::NotFoundOrInactive { .. })));

    for id in [inactive.id, active.id] {
        let logs = h.sync_logs.find_by_integration(&id, 10).await.unwrap();
        assert!(logs.is_empty());
    }
}

#[tokio::test]
async fn test_unsupported_provider_fails_run_and_keeps_health() {
    let h = Harness::new().await;
    let integration = h.integration("onedrive", IntegrationStatus::Active).await;
    h.book("X", 1).await;

    let result = h
        .orchestrator()
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await;
    assert!(matches!(result, Err(SyncError::UnsupportedProvider(name)) if name == "onedrive"));

    let logs = h
        .sync_logs
        .find_by_integration(&integration.id, 10)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SyncLogStatus::Error);
    assert!(logs[0]
        .error_details
        .as_deref()
        .unwrap()
        .contains("Unsupported provider"));
    assert!(logs[0].completed_at.is_some());

    let stored = h.integrations.find_by_id(&integration.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntegrationStatus::Active);
    assert_eq!(stored.last_sync_at, None);
    assert_eq!(h.remote.containers(), 0);
}

#[tokio::test]
async fn test_content_store_failure_fails_run() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;

    let result = h
        .orchestrator_with_books(Arc::new(UnavailableBooks))
        .sync_content(OWNER, &integration.id, RunType::Full)
        .await;
    assert!(matches!(result, Err(SyncError::ContentStore(_))));

    let logs = h
        .sync_logs
        .find_by_integration(&integration.id, 10)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SyncLogStatus::Error);

    let stored = h.integrations.find_by_id(&integration.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntegrationStatus::Active);
    assert_eq!(stored.last_sync_at, None);
}

#[tokio::test]
async fn test_failed_book_save_keeps_other_books_synced() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;
    let a = h.book("A", 1).await;
    let b = h.book("B", 2).await;
    let c = h.book("C", 3).await;

    let result = h
        .orchestrator_with_books(h.flaky_books(2))
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await;
    assert!(matches!(result, Err(SyncError::ContentStore(_))));
    assert_eq!(h.remote.containers(), 3);
    h.assert_failed_run_kept_health(&integration).await;

    // Saves after the failed one still happened
    assert_eq!(
        h.stored_book(&a.id).await.sync_data.synced_external_id("notion"),
        Some("p1")
    );
    assert!(h.stored_book(&b.id).await.sync_data.is_empty());
    assert_eq!(
        h.stored_book(&c.id).await.sync_data.synced_external_id("notion"),
        Some("p3")
    );

    h.orchestrator()
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await
        .unwrap();

    // Only the book whose save was lost gets a second container
    assert_eq!(h.remote.containers(), 4);
    assert_eq!(
        h.stored_book(&c.id).await.sync_data.synced_external_id("notion"),
        Some("p3")
    );
}

#[tokio::test]
async fn test_failed_quote_save_keeps_books_and_other_quotes_synced() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;
    let a = h.book("A", 1).await;
    let first = h.quote("First", Some(&a)).await;
    let second = h.quote("Second", Some(&a)).await;

    let result = h
        .orchestrator_with(h.books.clone(), h.flaky_quotes(1))
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await;
    assert!(matches!(result, Err(SyncError::ContentStore(_))));
    assert_eq!(h.remote.containers(), 1);
    assert_eq!(h.remote.blocks(), 2);
    h.assert_failed_run_kept_health(&integration).await;

    assert_eq!(
        h.stored_book(&a.id).await.sync_data.synced_external_id("notion"),
        Some("p1")
    );
    let mut saved = 0;
    for id in [&first.id, &second.id] {
        let quote = h.quotes.find_by_id(id).await.unwrap().unwrap();
        if quote.sync_data.synced_external_id("notion").is_some() {
            saved += 1;
        }
    }
    assert_eq!(saved, 1);

    let rerun = h
        .orchestrator()
        .sync_content(OWNER, &integration.id, RunType::Manual)
        .await
        .unwrap();
    assert_eq!(rerun.integration_status, IntegrationStatus::Active);
    assert_eq!(h.remote.containers(), 1);
    assert_eq!(h.remote.blocks(), 3);
}

#[tokio::test]
async fn test_no_run_leaves_pending_log() {
    let h = Harness::new().await;
    let good = h.integration("notion", IntegrationStatus::Active).await;
    let unsupported = h.integration("google_docs", IntegrationStatus::Active).await;
    h.book("X", 1).await;
    let orchestrator = h.orchestrator();

    orchestrator
        .sync_content(OWNER, &good.id, RunType::Manual)
        .await
        .unwrap();
    assert!(orchestrator
        .sync_content(OWNER, &unsupported.id, RunType::Manual)
        .await
        .is_err());

    for id in [good.id, unsupported.id] {
        for log in h.sync_logs.find_by_integration(&id, 10).await.unwrap() {
            assert!(log.status.is_terminal(), "log {} left pending", log.id);
        }
    }
}

#[tokio::test]
async fn test_history_lists_runs_newest_first() {
    let h = Harness::new().await;
    let integration = h.integration("notion", IntegrationStatus::Active).await;
    let orchestrator = h.orchestrator();

    let mut run_ids = Vec::new();
    for _ in 0..3 {
        let outcome = orchestrator
            .sync_content(OWNER, &integration.id, RunType::Manual)
            .await
            .unwrap();
        run_ids.push(outcome.sync_log_id);
        h.clock.advance(Duration::minutes(1));
    }

    let history = orchestrator
        .history(OWNER, &integration.id, 2)
        .await
        .unwrap();
    let ids: Vec<_> = history.iter().map(|log| log.id).collect();
    assert_eq!(ids, vec![run_ids[2], run_ids[1]]);

    assert!(matches!(
        orchestrator.history("intruder", &integration.id, 10).await,
        Err(SyncError::IntegrationNotFound { .. })
    ));
}

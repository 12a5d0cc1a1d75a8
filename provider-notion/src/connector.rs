//! Notion API connector
//!
//! Implements `ProviderSyncAdapter` on the Notion REST API: one page per
//! book under the configured books page, one quote block (plus an optional
//! page-number line) per quote appended to its book's page.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::Clock;
use core_library::{Book, Quote, SyncRecord};
use core_runtime::config::NotionApiConfig;
use core_sync::{
    Destination, DestinationKind, ParentLookup, ProviderKind, ProviderSyncAdapter, SyncResult,
    SyncedIndex,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{NotionError, Result};
use crate::types::{
    italic_text, rich_text, AppendChildrenRequest, AppendChildrenResponse, Block,
    CreatePageRequest, ErrorResponse, NotionTargetConfig, PageParent, PageProperties,
    PageResponse, SearchResponse, TitleProperty,
};

const PROVIDER: &str = "notion";

/// Fallback wait when a 429 carries no `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Notion sync adapter for one integration
pub struct NotionSyncAdapter {
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    api_key: String,
    api: NotionApiConfig,
    target: NotionTargetConfig,
}

impl NotionSyncAdapter {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        api_key: impl Into<String>,
        api: NotionApiConfig,
        target: NotionTargetConfig,
    ) -> Self {
        Self {
            http_client,
            clock,
            api_key: api_key.into(),
            api,
            target,
        }
    }

    pub fn target(&self) -> &NotionTargetConfig {
        &self.target
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api.base_url, path)
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request
            .bearer_token(&self.api_key)
            .header("Notion-Version", self.api.api_version.as_str())
    }

    /// Send a request and map non-2xx statuses to errors
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.http_client.execute(self.authorize(request)).await?;

        if response.is_success() {
            debug!(%method, %url, status = response.status, "Notion request succeeded");
            return Ok(response);
        }

        if response.status == 429 {
            let retry_after_seconds = response
                .header("Retry-After")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(%method, %url, retry_after_seconds, "Notion rate limit hit");
            return Err(NotionError::RateLimited {
                retry_after_seconds,
            });
        }

        let message = response
            .json::<ErrorResponse>()
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| response.text_lossy());
        warn!(%method, %url, status = response.status, "Notion request failed");

        Err(NotionError::ApiError {
            status_code: response.status,
            message,
        })
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        request: HttpRequest,
        body: &B,
    ) -> Result<HttpResponse> {
        self.send(request.json(body)?).await
    }

    async fn search_pages(&self) -> Result<SearchResponse> {
        let body = serde_json::json!({
            "filter": { "property": "object", "value": "page" }
        });
        let response = self
            .send_json(HttpRequest::post(self.url("/search")), &body)
            .await?;

        response
            .json::<SearchResponse>()
            .map_err(|e| NotionError::ParseError(e.to_string()))
    }

    /// Create the page for one book, or keep the one it already has
    async fn push_book(&self, book: &mut Book) -> Result<()> {
        if let Some(page_id) = book.sync_data.synced_external_id(PROVIDER) {
            debug!(book_id = %book.id, page_id, "Book already has a Notion page");
            return Ok(());
        }

        let parent_id = self
            .target
            .books_page_id
            .clone()
            .ok_or(NotionError::NotConfigured("Books page ID"))?;

        let mut children = vec![Block::paragraph(rich_text(&format!(
            "Author: {}",
            book.author.as_deref().unwrap_or("Unknown")
        )))];
        if let Some(description) = book.description.as_deref().filter(|d| !d.is_empty()) {
            children.push(Block::paragraph(rich_text(description)));
        }

        let request = CreatePageRequest {
            parent: PageParent { page_id: parent_id },
            properties: PageProperties {
                title: TitleProperty {
                    title: rich_text(&book.title),
                },
            },
            children,
        };

        let page = self
            .send_json(HttpRequest::post(self.url("/pages")), &request)
            .await?
            .json::<PageResponse>()
            .map_err(|e| NotionError::ParseError(e.to_string()))?;

        debug!(book_id = %book.id, page_id = %page.id, "Created Notion page for book");
        book.sync_data.record(
            PROVIDER,
            SyncRecord::synced(page.id, page.url, self.clock.now()),
        );
        Ok(())
    }

    /// Append one quote under its book page or the quotes page
    ///
    /// The parent check runs before any request is made.
    async fn push_quote(&self, quote: &mut Quote, synced_books: &SyncedIndex) -> Result<()> {
        // The parent must be synced even when the quote itself already is
        let parent_page = match synced_books.parent_of(quote) {
            ParentLookup::Synced(record) => Some(record.external_id.clone()),
            ParentLookup::NotSynced { book_id } => {
                return Err(NotionError::MissingParent {
                    book_id: book_id.to_string(),
                })
            }
            ParentLookup::NoParent => None,
        };

        if let Some(block_id) = quote.sync_data.synced_external_id(PROVIDER) {
            debug!(quote_id = %quote.id, block_id, "Quote already appended");
            return Ok(());
        }

        let container_id = match parent_page {
            Some(page_id) => page_id,
            None => self
                .target
                .quotes_page_id
                .clone()
                .ok_or(NotionError::NotConfigured("Quotes page ID"))?,
        };

        let mut children = vec![Block::quote(
            rich_text(quote.content.as_deref().unwrap_or_default()),
            self.target.quote_color(),
        )];
        if let Some(page) = quote.page {
            children.push(Block::paragraph(italic_text(&format!("Page: {}", page))));
        }

        let path = format!("/blocks/{}/children", container_id);
        let appended = self
            .send_json(
                HttpRequest::patch(self.url(&path)),
                &AppendChildrenRequest { children },
            )
            .await?
            .json::<AppendChildrenResponse>()
            .map_err(|e| NotionError::ParseError(e.to_string()))?;

        let block_id = appended
            .results
            .into_iter()
            .next()
            .map(|block| block.id)
            .ok_or_else(|| NotionError::ParseError("No block returned for quote".to_string()))?;

        debug!(quote_id = %quote.id, %block_id, "Appended quote block");
        quote.sync_data.record(
            PROVIDER,
            SyncRecord::synced(block_id, None, self.clock.now()),
        );
        Ok(())
    }
}

#[async_trait]
impl ProviderSyncAdapter for NotionSyncAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Notion
    }

    #[instrument(skip(self))]
    async fn validate_connection(&self) -> bool {
        match self.send(HttpRequest::get(self.url("/users/me"))).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Notion connection validation failed: {}", e);
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_destinations(&self) -> Vec<Destination> {
        match self.search_pages().await {
            Ok(search) => search
                .results
                .into_iter()
                .map(|page| Destination {
                    name: page.title(),
                    parent_type: Some(page.parent_type()),
                    id: page.id,
                    kind: DestinationKind::Page,
                    url: page.url,
                })
                .collect(),
            Err(e) => {
                warn!("Failed to list Notion destinations: {}", e);
                Vec::new()
            }
        }
    }

    #[instrument(skip(self, books), fields(count = books.len()))]
    async fn sync_books(&self, books: &mut [Book]) -> SyncResult {
        let mut result = SyncResult::default();
        for book in books.iter_mut() {
            let outcome = self.push_book(book).await;
            if let Err(e) = &outcome {
                warn!(book_id = %book.id, "Failed to sync book: {}", e);
            }
            result = result.with_outcome(&book.id, outcome);
        }

        info!(
            synced = result.success_count(),
            failed = result.failed_count(),
            "Synced books to Notion"
        );
        result
    }

    #[instrument(skip(self, quotes, synced_books), fields(count = quotes.len()))]
    async fn sync_quotes(&self, quotes: &mut [Quote], synced_books: &SyncedIndex) -> SyncResult {
        let mut result = SyncResult::default();
        for quote in quotes.iter_mut() {
            let outcome = self.push_quote(quote, synced_books).await;
            if let Err(e) = &outcome {
                warn!(quote_id = %quote.id, "Failed to sync quote: {}", e);
            }
            result = result.with_outcome(&quote.id, outcome);
        }

        info!(
            synced = result.success_count(),
            failed = result.failed_count(),
            "Synced quotes to Notion"
        );
        result
    }
}

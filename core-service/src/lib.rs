//! Core service façade and bootstrap helpers.
//!
//! Wires a [`CoreConfig`] into a ready-to-use sync engine: opens the content
//! database, registers the provider adapters enabled at compile time and
//! answers host requests through [`CoreService::handle`].
//!
//! Features:
//! - `desktop-shims`: reqwest-based `HttpClient` as the default transport
//! - `notion`: registers the Notion adapter

pub mod api;
pub mod error;

pub use api::{ApiResponse, IntegrationRequest, IntegrationSummary, DEFAULT_HISTORY_LIMIT};
pub use error::{CoreError, Result};

use bridge_traits::Clock;
use core_library::db::{create_pool, DatabaseConfig};
use core_library::{BookRepository, QuoteRepository, SqliteBookRepository, SqliteQuoteRepository};
use core_runtime::config::{CoreConfig, DatabaseLocation};
use core_sync::{
    DestinationDirectory, Integration, IntegrationId, IntegrationRepository, ProviderKind,
    ProviderRegistry, SqliteIntegrationRepository, SqliteSyncLogRepository, SyncLogRepository,
    SyncOrchestrator,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    orchestrator: Arc<SyncOrchestrator>,
    destinations: Arc<DestinationDirectory>,
    integrations: Arc<dyn IntegrationRepository>,
    books: Arc<dyn BookRepository>,
    quotes: Arc<dyn QuoteRepository>,
    clock: Arc<dyn Clock>,
}

/// Adapters compiled into this build
pub fn default_registry(config: &CoreConfig) -> ProviderRegistry {
    #[allow(unused_mut)]
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "notion")]
    registry.register(Arc::new(provider_notion::NotionAdapterFactory::new(
        config.http_client.clone(),
        config.clock.clone(),
        config.notion.clone(),
    )));

    #[cfg(not(feature = "notion"))]
    let _ = config;

    registry
}

/// Open the database and build the service with the default adapters.
///
/// ```ignore
/// use core_runtime::config::CoreConfig;
///
/// let config = CoreConfig::builder()
///     .database_path("/var/lib/readspace/sync.db")
///     .build()?;
/// let core = core_service::bootstrap(config).await?;
/// ```
pub async fn bootstrap(config: CoreConfig) -> Result<CoreService> {
    let registry = default_registry(&config);
    bootstrap_with_registry(config, registry).await
}

/// Same as [`bootstrap`] with a caller-supplied adapter registry
pub async fn bootstrap_with_registry(
    config: CoreConfig,
    registry: ProviderRegistry,
) -> Result<CoreService> {
    let database = match &config.database {
        DatabaseLocation::File(path) => DatabaseConfig::new(path.clone()),
        DatabaseLocation::InMemory => DatabaseConfig::in_memory(),
    };
    let pool = create_pool(database).await?;

    let integrations: Arc<dyn IntegrationRepository> =
        Arc::new(SqliteIntegrationRepository::new(pool.clone()));
    let sync_logs: Arc<dyn SyncLogRepository> = Arc::new(SqliteSyncLogRepository::new(pool.clone()));
    let books: Arc<dyn BookRepository> = Arc::new(SqliteBookRepository::new(pool.clone()));
    let quotes: Arc<dyn QuoteRepository> = Arc::new(SqliteQuoteRepository::new(pool));
    let registry = Arc::new(registry);

    info!(providers = ?registry.providers(), "Core service ready");

    Ok(CoreService {
        orchestrator: Arc::new(SyncOrchestrator::new(
            integrations.clone(),
            sync_logs,
            books.clone(),
            quotes.clone(),
            registry.clone(),
            config.clock.clone(),
        )),
        destinations: Arc::new(DestinationDirectory::new(
            integrations.clone(),
            registry,
            config.clock.clone(),
        )),
        integrations,
        books,
        quotes,
        clock: config.clock,
    })
}

impl CoreService {
    pub fn orchestrator(&self) -> Arc<SyncOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn integrations(&self) -> Arc<dyn IntegrationRepository> {
        Arc::clone(&self.integrations)
    }

    /// Content store access for hosts that own book and quote editing
    pub fn books(&self) -> Arc<dyn BookRepository> {
        Arc::clone(&self.books)
    }

    pub fn quotes(&self) -> Arc<dyn QuoteRepository> {
        Arc::clone(&self.quotes)
    }

    /// Answer one host request. Never fails; errors become `success: false`.
    #[instrument(skip(self, request), fields(action = request.action()))]
    pub async fn handle(&self, owner_id: &str, request: IntegrationRequest) -> ApiResponse {
        match self.dispatch(owner_id, request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Integration request failed: {}", e);
                ApiResponse::failure(e.to_string())
            }
        }
    }

    /// Parse a raw JSON request and answer it
    pub async fn handle_json(&self, owner_id: &str, request: serde_json::Value) -> ApiResponse {
        match serde_json::from_value::<IntegrationRequest>(request) {
            Ok(request) => self.handle(owner_id, request).await,
            Err(e) => ApiResponse::failure(format!("Invalid action: {}", e)),
        }
    }

    async fn dispatch(&self, owner_id: &str, request: IntegrationRequest) -> Result<ApiResponse> {
        match request {
            IntegrationRequest::CreateIntegration {
                provider_name,
                readspace_id,
                integration_name,
                credentials,
                sync_settings,
            } => {
                let provider: ProviderKind = provider_name.parse()?;
                let mut integration = Integration::new(
                    owner_id,
                    readspace_id,
                    provider,
                    credentials,
                    self.clock.now(),
                );
                if let Some(name) = integration_name {
                    integration.integration_name = name;
                }
                if let Some(settings) = sync_settings {
                    integration.sync_settings = settings;
                }
                // Reject settings the adapter would not accept later
                integration.settings()?;

                self.integrations.insert(&integration).await?;
                info!(integration_id = %integration.id, provider = %provider, "Integration created");
                Ok(ApiResponse::created(&integration))
            }
            IntegrationRequest::ValidateConnection { integration_id } => {
                let id = parse_id(&integration_id)?;
                let valid = self.destinations.validate_connection(owner_id, &id).await?;
                Ok(ApiResponse::validated(valid))
            }
            IntegrationRequest::GetDestinations { integration_id } => {
                let id = parse_id(&integration_id)?;
                let destinations = self.destinations.list_destinations(owner_id, &id).await?;
                Ok(ApiResponse::destinations(destinations))
            }
            IntegrationRequest::SyncContent {
                integration_id,
                sync_type,
            } => {
                let id = parse_id(&integration_id)?;
                let outcome = self
                    .orchestrator
                    .sync_content(owner_id, &id, sync_type)
                    .await?;
                Ok(ApiResponse::synced(outcome.results))
            }
            IntegrationRequest::SyncHistory {
                integration_id,
                limit,
            } => {
                let id = parse_id(&integration_id)?;
                let logs = self
                    .orchestrator
                    .history(owner_id, &id, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
                    .await?;
                Ok(ApiResponse::history(logs))
            }
        }
    }
}

fn parse_id(raw: &str) -> Result<IntegrationId> {
    IntegrationId::from_string(raw)
        .map_err(|_| CoreError::InvalidRequest(format!("Invalid integration id: {}", raw)))
}

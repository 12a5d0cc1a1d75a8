//! Builds Notion adapters from integration records

use bridge_traits::http::HttpClient;
use bridge_traits::Clock;
use core_runtime::config::NotionApiConfig;
use core_sync::{
    AdapterFactory, Integration, ProviderKind, ProviderSyncAdapter, SyncError, SyncSettings,
};
use std::sync::Arc;
use tracing::debug;

use crate::connector::NotionSyncAdapter;
use crate::types::{NotionCredentials, NotionTargetConfig};

/// Registered with the provider registry under `notion`
pub struct NotionAdapterFactory {
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    api: NotionApiConfig,
}

impl NotionAdapterFactory {
    pub fn new(http_client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>, api: NotionApiConfig) -> Self {
        Self {
            http_client,
            clock,
            api,
        }
    }

    fn invalid(integration: &Integration, message: String) -> SyncError {
        SyncError::InvalidSettings {
            provider: integration.provider.clone(),
            message,
        }
    }
}

impl AdapterFactory for NotionAdapterFactory {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Notion
    }

    fn create(
        &self,
        integration: &Integration,
        settings: &SyncSettings,
    ) -> core_sync::Result<Box<dyn ProviderSyncAdapter>> {
        let credentials: NotionCredentials =
            serde_json::from_value(integration.credentials.clone()).map_err(|e| {
                Self::invalid(integration, format!("Invalid Notion credentials: {}", e))
            })?;
        if credentials.api_key.trim().is_empty() {
            return Err(Self::invalid(
                integration,
                "Notion API key is empty".to_string(),
            ));
        }

        let target: NotionTargetConfig = if settings.target_config.is_null() {
            NotionTargetConfig::default()
        } else {
            serde_json::from_value(settings.target_config.clone()).map_err(|e| {
                Self::invalid(integration, format!("Invalid Notion target config: {}", e))
            })?
        };

        debug!(
            integration_id = %integration.id,
            books_page = target.books_page_id.is_some(),
            quotes_page = target.quotes_page_id.is_some(),
            "Built Notion adapter"
        );

        Ok(Box::new(NotionSyncAdapter::new(
            self.http_client.clone(),
            self.clock.clone(),
            credentials.api_key,
            self.api.clone(),
            target,
        )))
    }
}

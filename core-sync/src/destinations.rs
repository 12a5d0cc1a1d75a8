//! Destination directory: connection checks and container listing
//!
//! Both operations talk to the provider outside any sync run. Only
//! `validate_connection` writes, and only the integration's status and
//! error message.

use crate::integration::{IntegrationId, IntegrationStatus};
use crate::provider::{Destination, ProviderRegistry};
use crate::repository::IntegrationRepository;
use crate::{Result, SyncError};
use bridge_traits::Clock;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const CONNECTION_FAILED_MESSAGE: &str = "Connection validation failed";

pub struct DestinationDirectory {
    integrations: Arc<dyn IntegrationRepository>,
    registry: Arc<ProviderRegistry>,
    clock: Arc<dyn Clock>,
}

impl DestinationDirectory {
    pub fn new(
        integrations: Arc<dyn IntegrationRepository>,
        registry: Arc<ProviderRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            integrations,
            registry,
            clock,
        }
    }

    /// Check the integration's credentials and record the outcome
    ///
    /// Works on integrations in any status, which is how an inactive or
    /// failing integration becomes active again.
    ///
    /// # Errors
    ///
    /// - [`SyncError::IntegrationNotFound`] if the caller does not own it
    /// - adapter resolution errors, in which case nothing is written
    #[instrument(skip(self), fields(integration_id = %integration_id))]
    pub async fn validate_connection(
        &self,
        owner_id: &str,
        integration_id: &IntegrationId,
    ) -> Result<bool> {
        let integration = self
            .integrations
            .find_for_owner(integration_id, owner_id)
            .await?
            .ok_or_else(|| SyncError::IntegrationNotFound {
                integration_id: integration_id.to_string(),
            })?;

        let adapter = self.registry.resolve(&integration)?;
        let valid = adapter.validate_connection().await;

        let (status, message) = if valid {
            (IntegrationStatus::Active, None)
        } else {
            (IntegrationStatus::Error, Some(CONNECTION_FAILED_MESSAGE))
        };
        self.integrations
            .update_connection_status(&integration.id, status, message, self.clock.now())
            .await?;

        if valid {
            info!(provider = %integration.provider, "Connection validated");
        } else {
            warn!(provider = %integration.provider, "Connection validation failed");
        }

        Ok(valid)
    }

    /// Containers the integration could write into
    ///
    /// # Errors
    ///
    /// - [`SyncError::IntegrationNotFound`] if the caller does not own it
    /// - adapter resolution errors
    #[instrument(skip(self), fields(integration_id = %integration_id))]
    pub async fn list_destinations(
        &self,
        owner_id: &str,
        integration_id: &IntegrationId,
    ) -> Result<Vec<Destination>> {
        let integration = self
            .integrations
            .find_for_owner(integration_id, owner_id)
            .await?
            .ok_or_else(|| SyncError::IntegrationNotFound {
                integration_id: integration_id.to_string(),
            })?;

        let adapter = self.registry.resolve(&integration)?;
        Ok(adapter.list_destinations().await)
    }
}

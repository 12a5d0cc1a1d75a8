//! Request and response envelopes for hosts
//!
//! Requests are JSON objects tagged by `action`:
//!
//! ```json
//! { "action": "sync_content", "integration_id": "…", "sync_type": "manual" }
//! ```
//!
//! Every response carries `success`; failures carry a single `error` string
//! instead of any payload.

use chrono::{DateTime, Utc};
use core_sync::{
    ContentSyncResults, Destination, Integration, IntegrationStatus, RunType, SyncLog,
};
use serde::{Deserialize, Serialize};

/// Default number of runs returned by `sync_history`
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IntegrationRequest {
    /// Register a new, inactive integration
    CreateIntegration {
        provider_name: String,
        readspace_id: String,
        #[serde(default)]
        integration_name: Option<String>,
        /// Already decrypted
        credentials: serde_json::Value,
        #[serde(default)]
        sync_settings: Option<serde_json::Value>,
    },
    ValidateConnection {
        integration_id: String,
    },
    GetDestinations {
        integration_id: String,
    },
    SyncContent {
        integration_id: String,
        #[serde(default)]
        sync_type: RunType,
    },
    SyncHistory {
        integration_id: String,
        #[serde(default)]
        limit: Option<u32>,
    },
}

impl IntegrationRequest {
    pub fn action(&self) -> &'static str {
        match self {
            IntegrationRequest::CreateIntegration { .. } => "create_integration",
            IntegrationRequest::ValidateConnection { .. } => "validate_connection",
            IntegrationRequest::GetDestinations { .. } => "get_destinations",
            IntegrationRequest::SyncContent { .. } => "sync_content",
            IntegrationRequest::SyncHistory { .. } => "sync_history",
        }
    }
}

/// Integration as shown to callers. Credentials are never echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationSummary {
    pub id: String,
    pub provider: String,
    pub readspace_id: String,
    pub integration_name: String,
    pub status: IntegrationStatus,
    pub sync_settings: serde_json::Value,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl From<&Integration> for IntegrationSummary {
    fn from(integration: &Integration) -> Self {
        Self {
            id: integration.id.to_string(),
            provider: integration.provider.clone(),
            readspace_id: integration.readspace_id.clone(),
            integration_name: integration.integration_name.clone(),
            status: integration.status,
            sync_settings: integration.sync_settings.clone(),
            last_sync_at: integration.last_sync_at,
            error_message: integration.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_results: Option<ContentSyncResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Vec<Destination>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<IntegrationSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<SyncLog>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn synced(results: ContentSyncResults) -> Self {
        Self {
            sync_results: Some(results),
            ..Self::ok()
        }
    }

    pub fn validated(is_valid: bool) -> Self {
        Self {
            is_valid: Some(is_valid),
            ..Self::ok()
        }
    }

    pub fn destinations(destinations: Vec<Destination>) -> Self {
        Self {
            destinations: Some(destinations),
            ..Self::ok()
        }
    }

    pub fn created(integration: &Integration) -> Self {
        Self {
            integration: Some(integration.into()),
            ..Self::ok()
        }
    }

    pub fn history(logs: Vec<SyncLog>) -> Self {
        Self {
            history: Some(logs),
            ..Self::ok()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_sync::{FailedItem, SyncResult};
    use serde_json::json;

    #[test]
    fn test_parse_sync_request_defaults_to_manual() {
        let request: IntegrationRequest = serde_json::from_value(json!({
            "action": "sync_content",
            "integration_id": "abc"
        }))
        .unwrap();

        assert_eq!(
            request,
            IntegrationRequest::SyncContent {
                integration_id: "abc".to_string(),
                sync_type: RunType::Manual,
            }
        );
        assert_eq!(request.action(), "sync_content");
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = serde_json::from_value::<IntegrationRequest>(json!({
            "action": "delete_everything",
            "integration_id": "abc"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_sync_response_shape() {
        let results = ContentSyncResults {
            books: SyncResult {
                success: vec!["a".to_string()],
                failed: vec![FailedItem {
                    id: "b".to_string(),
                    error: "boom".to_string(),
                }],
            },
            quotes: SyncResult::default(),
        };

        assert_eq!(
            serde_json::to_value(ApiResponse::synced(results)).unwrap(),
            json!({
                "success": true,
                "sync_results": {
                    "books": { "success": ["a"], "failed": [{ "id": "b", "error": "boom" }] },
                    "quotes": { "success": [], "failed": [] }
                }
            })
        );
    }

    #[test]
    fn test_failure_shape() {
        assert_eq!(
            serde_json::to_value(ApiResponse::failure("Invalid action")).unwrap(),
            json!({ "success": false, "error": "Invalid action" })
        );
    }
}

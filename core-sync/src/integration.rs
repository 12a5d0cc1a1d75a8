//! # Integrations
//!
//! An integration links one readspace to one external provider. It carries
//! the (already decrypted) credentials, the sync settings and a health
//! status that only the sync engine writes.

use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegrationId(Uuid);

impl IntegrationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// # Errors
    ///
    /// Returns [`SyncError::InvalidId`] if the string is not a UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::InvalidId(format!("{}: {}", s, e)))
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for IntegrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IntegrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Provider
// ============================================================================

/// External services an integration can point at
///
/// Only some kinds have an adapter; see
/// [`ProviderRegistry`](crate::provider::ProviderRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Notion,
    GoogleDocs,
    #[serde(rename = "onedrive")]
    OneDrive,
}

impl ProviderKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Notion => "Notion",
            ProviderKind::GoogleDocs => "Google Docs",
            ProviderKind::OneDrive => "OneDrive",
        }
    }

    /// Identifier as stored in integrations and `sync_data` keys
    ///
    /// ```
    /// use core_sync::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::Notion.as_str(), "notion");
    /// assert_eq!(ProviderKind::GoogleDocs.as_str(), "google_docs");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Notion => "notion",
            ProviderKind::GoogleDocs => "google_docs",
            ProviderKind::OneDrive => "onedrive",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "notion" => Ok(ProviderKind::Notion),
            "google_docs" => Ok(ProviderKind::GoogleDocs),
            "onedrive" => Ok(ProviderKind::OneDrive),
            _ => Err(SyncError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Status
// ============================================================================

/// Health of an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    /// Created but never validated
    Inactive,
    Active,
    Error,
}

impl IntegrationStatus {
    /// Health after a run that recorded `items_failed` failures
    ///
    /// A single failed item marks the integration unhealthy no matter how
    /// many items succeeded.
    ///
    /// ```
    /// use core_sync::IntegrationStatus;
    ///
    /// assert_eq!(IntegrationStatus::from_failures(0), IntegrationStatus::Active);
    /// assert_eq!(IntegrationStatus::from_failures(1), IntegrationStatus::Error);
    /// ```
    pub fn from_failures(items_failed: u64) -> Self {
        if items_failed > 0 {
            IntegrationStatus::Error
        } else {
            IntegrationStatus::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationStatus::Inactive => "inactive",
            IntegrationStatus::Active => "active",
            IntegrationStatus::Error => "error",
        }
    }
}

impl FromStr for IntegrationStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inactive" => Ok(IntegrationStatus::Inactive),
            "active" => Ok(IntegrationStatus::Active),
            "error" => Ok(IntegrationStatus::Error),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFrequency {
    #[default]
    Manual,
    Hourly,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    #[default]
    ToProviderOnly,
    FromProviderOnly,
    Bidirectional,
}

/// Per-integration sync settings
///
/// `target_config` is provider specific (container ids, styling) and is
/// handed to the adapter factory untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub auto_sync: bool,
    pub sync_frequency: SyncFrequency,
    pub sync_direction: SyncDirection,
    pub target_config: serde_json::Value,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_sync: false,
            sync_frequency: SyncFrequency::Manual,
            sync_direction: SyncDirection::ToProviderOnly,
            target_config: serde_json::json!({
                "auto_create_structure": true,
                "color_scheme": "blue",
            }),
        }
    }
}

// ============================================================================
// Integration Entity
// ============================================================================

/// A configured link between a readspace and one provider
#[derive(Clone, PartialEq)]
pub struct Integration {
    pub id: IntegrationId,
    pub owner_id: String,
    /// Content workspace whose books and quotes are synced
    pub readspace_id: String,
    /// Provider identifier as stored; parsed when an adapter is resolved
    pub provider: String,
    pub integration_name: String,
    /// Decrypted provider credentials
    pub credentials: serde_json::Value,
    /// Raw settings document; see [`Integration::settings`]
    pub sync_settings: serde_json::Value,
    pub status: IntegrationStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    /// New inactive integration with default settings
    pub fn new(
        owner_id: impl Into<String>,
        readspace_id: impl Into<String>,
        provider: ProviderKind,
        credentials: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IntegrationId::new(),
            owner_id: owner_id.into(),
            readspace_id: readspace_id.into(),
            provider: provider.as_str().to_string(),
            integration_name: provider.display_name().to_string(),
            credentials,
            sync_settings: serde_json::to_value(SyncSettings::default())
                .unwrap_or(serde_json::Value::Null),
            status: IntegrationStatus::Inactive,
            last_sync_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_settings(mut self, settings: &SyncSettings) -> Self {
        if let Ok(value) = serde_json::to_value(settings) {
            self.sync_settings = value;
        }
        self
    }

    pub fn with_status(mut self, status: IntegrationStatus) -> Self {
        self.status = status;
        self
    }

    /// # Errors
    ///
    /// [`SyncError::UnsupportedProvider`] for unknown identifiers
    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.provider.parse()
    }

    /// Parse the stored settings document
    ///
    /// Missing keys take their defaults; a `null` document is the defaults.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidSettings`] if the document has the wrong shape
    pub fn settings(&self) -> Result<SyncSettings> {
        if self.sync_settings.is_null() {
            return Ok(SyncSettings::default());
        }

        serde_json::from_value(self.sync_settings.clone()).map_err(|e| {
            SyncError::InvalidSettings {
                provider: self.provider.clone(),
                message: e.to_string(),
            }
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == IntegrationStatus::Active
    }
}

// Credentials never reach logs.
impl fmt::Debug for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integration")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("readspace_id", &self.readspace_id)
            .field("provider", &self.provider)
            .field("integration_name", &self.integration_name)
            .field("credentials", &"[REDACTED]")
            .field("sync_settings", &self.sync_settings)
            .field("status", &self.status)
            .field("last_sync_at", &self.last_sync_at)
            .field("error_message", &self.error_message)
            .finish()
    }
}

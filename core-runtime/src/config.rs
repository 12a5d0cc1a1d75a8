//! # Core Configuration Module
//!
//! Builder-based configuration for the sync engine.
//!
//! ## Overview
//!
//! [`CoreConfig`] carries everything the service layer needs to assemble the
//! engine: where the content database lives, which host capabilities to use
//! and how to reach provider APIs. The builder validates eagerly so a host
//! learns about a missing capability at startup instead of during a sync run.
//!
//! ## Capabilities
//!
//! - `HttpClient`: required. With the `desktop-shims` feature a reqwest-based
//!   client is injected when none is provided.
//! - `Clock`: optional, defaults to [`SystemClock`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/readspace/sync.db")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Default base URL for the Notion REST API
pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1";

/// Notion API version sent with every request
pub const DEFAULT_NOTION_API_VERSION: &str = "2022-06-28";

/// Where the content database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite file on disk, created if missing
    File(PathBuf),
    /// Private in-memory database, discarded when the pool closes
    InMemory,
}

/// Endpoint settings for the Notion adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionApiConfig {
    pub base_url: String,
    /// Value of the `Notion-Version` header
    pub api_version: String,
}

impl Default for NotionApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOTION_BASE_URL.to_string(),
            api_version: DEFAULT_NOTION_API_VERSION.to_string(),
        }
    }
}

impl NotionApiConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "Notion base URL must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.base_url.ends_with('/') {
            return Err(Error::Config(
                "Notion base URL must not end with '/'".to_string(),
            ));
        }

        if self.api_version.trim().is_empty() {
            return Err(Error::Config(
                "Notion API version cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the sync engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub database: DatabaseLocation,

    /// HTTP client used by provider adapters
    pub http_client: Arc<dyn HttpClient>,

    /// Time source for run timestamps
    pub clock: Arc<dyn Clock>,

    pub notion: NotionApiConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database", &self.database)
            .field("http_client", &"HttpClient { ... }")
            .field("clock", &"Clock { ... }")
            .field("notion", &self.notion)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        self.notion.validate()
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to create default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach provider APIs. \
                 Desktop/server: enable the 'desktop-shims' feature to use the default \
                 reqwest client. Other hosts: inject one with .http_client()."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database: Option<DatabaseLocation>,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    notion: Option<NotionApiConfig>,
}

impl CoreConfigBuilder {
    /// Sets the SQLite database file.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/tmp/sync.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(DatabaseLocation::File(path.into()));
        self
    }

    /// Use a private in-memory database (tests, ephemeral hosts).
    pub fn in_memory_database(mut self) -> Self {
        self.database = Some(DatabaseLocation::InMemory);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the clock. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn notion_api(mut self, notion: NotionApiConfig) -> Self {
        self.notion = Some(notion);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no database location was set or a value is invalid
    /// - [`Error::CapabilityMissing`] if no `HttpClient` is available
    pub fn build(self) -> Result<CoreConfig> {
        let database = self.database.ok_or_else(|| {
            Error::Config(
                "Database location is required. Use .database_path() or .in_memory_database()."
                    .to_string(),
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            database,
            http_client,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            notion: self.notion.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, FixedClock, HttpRequest, HttpResponse};
    use chrono::{TimeZone, Utc};

    struct StubHttpClient;

    #[async_trait]
    impl HttpClient for StubHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Err(BridgeError::NotAvailable("stub".to_string()))
        }
    }

    #[test]
    fn test_builder_with_injected_capabilities() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = CoreConfig::builder()
            .database_path("/tmp/sync.db")
            .http_client(Arc::new(StubHttpClient))
            .clock(Arc::new(FixedClock::new(now)))
            .build()
            .unwrap();

        assert_eq!(
            config.database,
            DatabaseLocation::File(PathBuf::from("/tmp/sync.db"))
        );
        assert_eq!(config.clock.now(), now);
        assert_eq!(config.notion, NotionApiConfig::default());
    }

    #[test]
    fn test_missing_database_is_config_error() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(StubHttpClient))
            .build();

        match result {
            Err(Error::Config(message)) => assert!(message.contains("database_path")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_database_path_rejected() {
        let result = CoreConfig::builder()
            .database_path("")
            .http_client(Arc::new(StubHttpClient))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_notion_config_validation() {
        assert!(NotionApiConfig::default().validate().is_ok());
        assert!(NotionApiConfig::default()
            .with_base_url("api.notion.com/v1")
            .validate()
            .is_err());
        assert!(NotionApiConfig::default()
            .with_base_url("https://api.notion.com/v1/")
            .validate()
            .is_err());
        assert!(NotionApiConfig::default()
            .with_api_version(" ")
            .validate()
            .is_err());
    }

    #[test]
    fn test_invalid_notion_config_fails_build() {
        let result = CoreConfig::builder()
            .in_memory_database()
            .http_client(Arc::new(StubHttpClient))
            .notion_api(NotionApiConfig::default().with_base_url("ftp://example.com"))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_is_capability_error() {
        let result = CoreConfig::builder().in_memory_database().build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient")
            }
            other => panic!("expected capability error, got {:?}", other),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_default_http_client() {
        let config = CoreConfig::builder().in_memory_database().build();
        assert!(config.is_ok());
    }
}

use thiserror::Error;

/// Errors raised while constructing desktop bridges
#[derive(Error, Debug)]
pub enum DesktopBridgeError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClientBuild(String),
}

//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and server hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls
//!
//! The system clock comes from `bridge_traits::SystemClock`; nothing
//! platform-specific is needed for it.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = Arc::new(ReqwestHttpClient::new()?);
//!     // Hand to CoreConfig::builder().http_client(http_client)
//! }
//! ```

mod error;
mod http;

pub use error::DesktopBridgeError;
pub use http::ReqwestHttpClient;

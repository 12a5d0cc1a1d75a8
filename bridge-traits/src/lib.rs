//! # Host Bridge Traits
//!
//! Capability contracts the sync core needs from its host.
//!
//! ## Overview
//!
//! The core never talks to the network or the wall clock directly. Each
//! capability is a trait that the host (desktop app, server, test harness)
//! implements and injects:
//!
//! - [`HttpClient`](http::HttpClient) - plain request/response HTTP used by
//!   provider adapters to reach remote APIs
//! - [`Clock`](time::Clock) - time source for `last_synced_at`, run
//!   timestamps and deterministic tests
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to the host
//!
//! ## Error Handling
//!
//! All bridge traits report failures through [`BridgeError`](error::BridgeError).
//! Implementations should convert their native errors (reqwest, platform
//! APIs) into a `BridgeError` with an actionable message.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so implementations can be shared behind
//! `Arc` across async tasks.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};

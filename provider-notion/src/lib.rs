//! # Notion Provider
//!
//! Implements `ProviderSyncAdapter` for the Notion REST API.
//!
//! ## Overview
//!
//! - Connection check via `GET /users/me`
//! - Destination listing via `POST /search` (pages only)
//! - One page per book under the configured books page
//! - Quote blocks appended to the book's page, or to the quotes page for
//!   quotes without a book
//!
//! Every request is a single attempt. A 429 becomes a failed item carrying
//! the server's `Retry-After`; retrying is up to the next run.

pub mod connector;
pub mod error;
pub mod factory;
pub mod types;

pub use connector::NotionSyncAdapter;
pub use error::{NotionError, Result};
pub use factory::NotionAdapterFactory;
pub use types::{NotionCredentials, NotionTargetConfig};

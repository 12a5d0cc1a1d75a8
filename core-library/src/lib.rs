//! # Content Store
//!
//! Owns the reading content that integrations push to external providers.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite schema and migrations (content plus sync bookkeeping tables)
//! - `Book` and `Quote` models with their per-provider `sync_data`
//! - Repositories for workspace-scoped reads and `sync_data` writes

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{Book, ContentItem, ItemSyncData, ItemSyncStatus, Quote, SyncRecord};
pub use repositories::{BookRepository, QuoteRepository, SqliteBookRepository, SqliteQuoteRepository};

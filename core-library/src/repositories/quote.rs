//! Quote repository trait and implementation
//!
//! Quotes are always read together with their parent book so the sync engine
//! can check whether the parent already exists at the provider.

use crate::error::{LibraryError, Result};
use crate::models::{Book, ItemSyncData, Quote};
use crate::repositories::{decode_sync_data, encode_sync_data};
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqlitePool};

/// Quote repository interface
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Find a quote by its ID, with its parent book joined
    async fn find_by_id(&self, id: &str) -> Result<Option<Quote>>;

    /// Insert a new quote. The joined `book` field is ignored.
    async fn insert(&self, quote: &Quote) -> Result<()>;

    /// All quotes of a readspace with their parent book joined, oldest first
    async fn find_by_readspace_with_book(&self, readspace_id: &str) -> Result<Vec<Quote>>;

    /// Replace the stored `sync_data` of a quote
    ///
    /// # Errors
    /// Returns [`LibraryError::NotFound`] if the quote does not exist
    async fn update_sync_data(&self, id: &str, sync_data: &ItemSyncData) -> Result<()>;
}

/// SQLite implementation of QuoteRepository
pub struct SqliteQuoteRepository {
    pool: SqlitePool,
}

impl SqliteQuoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Quote row with the parent book's columns from a LEFT JOIN
#[derive(Debug, FromRow)]
struct QuoteWithBookRow {
    id: String,
    readspace_id: String,
    book_id: Option<String>,
    content: Option<String>,
    page: Option<i32>,
    sync_data: String,
    created_at: i64,
    updated_at: Option<i64>,

    b_id: Option<String>,
    b_readspace_id: Option<String>,
    b_title: Option<String>,
    b_author: Option<String>,
    b_description: Option<String>,
    b_publisher: Option<String>,
    b_publish_year: Option<i32>,
    b_page_count: Option<i32>,
    b_is_deleted: Option<bool>,
    b_sync_data: Option<String>,
    b_created_at: Option<i64>,
    b_updated_at: Option<i64>,
}

impl TryFrom<QuoteWithBookRow> for Quote {
    type Error = LibraryError;

    fn try_from(row: QuoteWithBookRow) -> Result<Self> {
        let sync_data = decode_sync_data(&row.id, &row.sync_data)?;

        let book = match (row.b_id, row.b_readspace_id, row.b_title) {
            (Some(id), Some(readspace_id), Some(title)) => {
                let book_sync_data =
                    decode_sync_data(&id, row.b_sync_data.as_deref().unwrap_or_default())?;
                Some(Book {
                    id,
                    readspace_id,
                    title,
                    author: row.b_author,
                    description: row.b_description,
                    publisher: row.b_publisher,
                    publish_year: row.b_publish_year,
                    page_count: row.b_page_count,
                    is_deleted: row.b_is_deleted.unwrap_or(false),
                    created_at: row.b_created_at.unwrap_or_default(),
                    updated_at: row.b_updated_at.unwrap_or_default(),
                    sync_data: book_sync_data,
                })
            }
            _ => None,
        };

        Ok(Quote {
            id: row.id,
            readspace_id: row.readspace_id,
            book_id: row.book_id,
            content: row.content,
            page: row.page,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sync_data,
            book,
        })
    }
}

const QUOTE_WITH_BOOK_SELECT: &str = r#"
    SELECT q.id, q.readspace_id, q.book_id, q.content, q.page, q.sync_data,
           q.created_at, q.updated_at,
           b.id AS b_id, b.readspace_id AS b_readspace_id, b.title AS b_title,
           b.author AS b_author, b.description AS b_description,
           b.publisher AS b_publisher, b.publish_year AS b_publish_year,
           b.page_count AS b_page_count, b.is_deleted AS b_is_deleted,
           b.sync_data AS b_sync_data, b.created_at AS b_created_at,
           b.updated_at AS b_updated_at
    FROM quotes q
    LEFT JOIN books b ON b.id = q.book_id
"#;

#[async_trait]
impl QuoteRepository for SqliteQuoteRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Quote>> {
        let row = query_as::<_, QuoteWithBookRow>(&format!(
            "{} WHERE q.id = ?",
            QUOTE_WITH_BOOK_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Quote::try_from).transpose()
    }

    async fn insert(&self, quote: &Quote) -> Result<()> {
        quote.validate().map_err(|message| LibraryError::InvalidInput {
            field: "Quote".to_string(),
            message,
        })?;

        let sync_data = encode_sync_data(&quote.id, &quote.sync_data)?;

        query(
            r#"
            INSERT INTO quotes (
                id, readspace_id, book_id, content, page, sync_data, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&quote.id)
        .bind(&quote.readspace_id)
        .bind(&quote.book_id)
        .bind(&quote.content)
        .bind(quote.page)
        .bind(sync_data)
        .bind(quote.created_at)
        .bind(quote.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_readspace_with_book(&self, readspace_id: &str) -> Result<Vec<Quote>> {
        let rows = query_as::<_, QuoteWithBookRow>(&format!(
            "{} WHERE q.readspace_id = ? ORDER BY q.created_at ASC, q.id ASC",
            QUOTE_WITH_BOOK_SELECT
        ))
        .bind(readspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Quote::try_from).collect()
    }

    async fn update_sync_data(&self, id: &str, sync_data: &ItemSyncData) -> Result<()> {
        let encoded = encode_sync_data(id, sync_data)?;

        let result = query("UPDATE quotes SET sync_data = ? WHERE id = ?")
            .bind(encoded)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Quote".to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }
}

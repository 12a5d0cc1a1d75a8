//! Book repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Book, ItemSyncData};
use crate::repositories::{decode_sync_data, encode_sync_data};
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqlitePool};

/// Book repository interface
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Find a book by its ID, including soft-deleted ones
    async fn find_by_id(&self, id: &str) -> Result<Option<Book>>;

    /// Insert a new book
    ///
    /// # Errors
    /// Returns error if validation fails or the ID already exists
    async fn insert(&self, book: &Book) -> Result<()>;

    /// Non-deleted books of a readspace, oldest first
    async fn find_active_by_readspace(&self, readspace_id: &str) -> Result<Vec<Book>>;

    /// Replace the stored `sync_data` of a book
    ///
    /// # Errors
    /// Returns [`LibraryError::NotFound`] if the book does not exist
    async fn update_sync_data(&self, id: &str, sync_data: &ItemSyncData) -> Result<()>;
}

/// SQLite implementation of BookRepository
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BookRow {
    id: String,
    readspace_id: String,
    title: String,
    author: Option<String>,
    description: Option<String>,
    publisher: Option<String>,
    publish_year: Option<i32>,
    page_count: Option<i32>,
    is_deleted: bool,
    sync_data: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<BookRow> for Book {
    type Error = LibraryError;

    fn try_from(row: BookRow) -> Result<Self> {
        let sync_data = decode_sync_data(&row.id, &row.sync_data)?;

        Ok(Book {
            id: row.id,
            readspace_id: row.readspace_id,
            title: row.title,
            author: row.author,
            description: row.description,
            publisher: row.publisher,
            publish_year: row.publish_year,
            page_count: row.page_count,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sync_data,
        })
    }
}

const BOOK_COLUMNS: &str = "id, readspace_id, title, author, description, publisher, \
     publish_year, page_count, is_deleted, sync_data, created_at, updated_at";

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Book>> {
        let row = query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE id = ?",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Book::try_from).transpose()
    }

    async fn insert(&self, book: &Book) -> Result<()> {
        book.validate().map_err(|message| LibraryError::InvalidInput {
            field: "Book".to_string(),
            message,
        })?;

        let sync_data = encode_sync_data(&book.id, &book.sync_data)?;

        query(
            r#"
            INSERT INTO books (
                id, readspace_id, title, author, description, publisher,
                publish_year, page_count, is_deleted, sync_data, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&book.id)
        .bind(&book.readspace_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.publisher)
        .bind(book.publish_year)
        .bind(book.page_count)
        .bind(book.is_deleted)
        .bind(sync_data)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_active_by_readspace(&self, readspace_id: &str) -> Result<Vec<Book>> {
        let rows = query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE readspace_id = ? AND is_deleted = 0 \
             ORDER BY created_at ASC, id ASC",
            BOOK_COLUMNS
        ))
        .bind(readspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn update_sync_data(&self, id: &str, sync_data: &ItemSyncData) -> Result<()> {
        let encoded = encode_sync_data(id, sync_data)?;

        let result = query("UPDATE books SET sync_data = ? WHERE id = ?")
            .bind(encoded)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Book".to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::SyncRecord;
    use chrono::{TimeZone, Utc};

    async fn setup() -> SqliteBookRepository {
        SqliteBookRepository::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let repo = setup().await;
        let book = Book::new("rs-1", "Dune")
            .with_author("Frank Herbert")
            .with_description("Desert planet");

        repo.insert(&book).await.unwrap();

        let found = repo.find_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(found, book);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_book() {
        let repo = setup().await;
        let book = Book::new("rs-1", "");

        let result = repo.insert(&book).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_find_active_excludes_deleted_and_other_readspaces() {
        let repo = setup().await;

        let mut first = Book::new("rs-1", "First");
        first.created_at = 1;
        let mut second = Book::new("rs-1", "Second");
        second.created_at = 2;
        let mut deleted = Book::new("rs-1", "Deleted");
        deleted.is_deleted = true;
        let foreign = Book::new("rs-2", "Foreign");

        for book in [&second, &first, &deleted, &foreign] {
            repo.insert(book).await.unwrap();
        }

        let books = repo.find_active_by_readspace("rs-1").await.unwrap();
        let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_update_sync_data() {
        let repo = setup().await;
        let book = Book::new("rs-1", "Dune");
        repo.insert(&book).await.unwrap();

        let mut data = ItemSyncData::new();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        data.record("notion", SyncRecord::synced("page-1", None, at));

        repo.update_sync_data(&book.id, &data).await.unwrap();

        let found = repo.find_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(found.sync_data.synced_external_id("notion"), Some("page-1"));
        assert_eq!(found.sync_data.get("notion").unwrap().last_synced_at, at);
    }

    #[tokio::test]
    async fn test_update_sync_data_missing_book() {
        let repo = setup().await;

        let result = repo.update_sync_data("missing", &ItemSyncData::new()).await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_corrupt_sync_data_is_reported() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteBookRepository::new(pool.clone());
        let book = Book::new("rs-1", "Dune");
        repo.insert(&book).await.unwrap();

        sqlx::query("UPDATE books SET sync_data = 'not json' WHERE id = ?")
            .bind(&book.id)
            .execute(&pool)
            .await
            .unwrap();

        let result = repo.find_by_id(&book.id).await;
        assert!(matches!(result, Err(LibraryError::InvalidSyncData { .. })));
    }
}

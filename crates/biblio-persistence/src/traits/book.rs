//! Book persistence trait

use async_trait::async_trait;

use crate::model::{BookInfo, NewBook};

#[async_trait]
pub trait BookPersistence: Send + Sync {
    async fn book_find_by_id(&self, id: i64) -> anyhow::Result<Option<BookInfo>>;

    /// All books, newest first
    async fn book_find_all(&self) -> anyhow::Result<Vec<BookInfo>>;

    /// Insert an available, unrated book
    async fn book_create(&self, book: NewBook) -> anyhow::Result<BookInfo>;
}

//! Read cache and the invalidation sink used by the lending protocol
//!
//! Reads are cache-aside: a miss loads from persistence and stores the result.
//! Committed transitions evict the affected entries through
//! [`CacheInvalidator`]; entries otherwise age out by time-to-live.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use biblio_persistence::{BookInfo, UserInfo};
use metrics::counter;
use moka::sync::Cache;
use tracing::{debug, info};

use crate::model::UserDetail;

const ALL: &str = "all";

/// Receives eviction notices after a committed transition.
///
/// Notices are best effort: implementations log their own failures and never
/// report them to the caller.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate_book(&self, book_id: i64);

    async fn invalidate_user(&self, user_id: i64);

    /// Evict the full book listing
    async fn invalidate_listing(&self);
}

/// Sink for deployments without a read cache
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate_book(&self, _book_id: i64) {}

    async fn invalidate_user(&self, _user_id: i64) {}

    async fn invalidate_listing(&self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheOptions {
    pub max_capacity: u64,
    pub book_ttl: Duration,
    pub user_ttl: Duration,
    pub listing_ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            book_ttl: Duration::from_secs(3600),
            user_ttl: Duration::from_secs(1800),
            listing_ttl: Duration::from_secs(600),
        }
    }
}

/// In-process read cache for book and user reads
pub struct ReadCache {
    books: Cache<i64, BookInfo>,
    book_list: Cache<&'static str, Arc<Vec<BookInfo>>>,
    users: Cache<i64, UserDetail>,
    user_list: Cache<&'static str, Arc<Vec<UserInfo>>>,
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

fn record_lookup<T>(cache: &'static str, found: Option<T>) -> Option<T> {
    let result = if found.is_some() { "hit" } else { "miss" };
    counter!("cache_lookups_total", "cache" => cache, "result" => result).increment(1);
    found
}

impl ReadCache {
    pub fn new(options: CacheOptions) -> Self {
        info!(
            max_capacity = options.max_capacity,
            book_ttl_secs = options.book_ttl.as_secs(),
            user_ttl_secs = options.user_ttl.as_secs(),
            listing_ttl_secs = options.listing_ttl.as_secs(),
            "Read cache initialized"
        );

        Self {
            books: Cache::builder()
                .max_capacity(options.max_capacity)
                .time_to_live(options.book_ttl)
                .build(),
            book_list: Cache::builder()
                .time_to_live(options.listing_ttl)
                .build(),
            users: Cache::builder()
                .max_capacity(options.max_capacity)
                .time_to_live(options.user_ttl)
                .build(),
            user_list: Cache::builder()
                .time_to_live(options.listing_ttl)
                .build(),
        }
    }

    pub fn book(&self, id: i64) -> Option<BookInfo> {
        record_lookup("book", self.books.get(&id))
    }

    pub fn put_book(&self, book: BookInfo) {
        self.books.insert(book.id, book);
    }

    pub fn book_list(&self) -> Option<Arc<Vec<BookInfo>>> {
        record_lookup("book_list", self.book_list.get(ALL))
    }

    pub fn put_book_list(&self, books: Arc<Vec<BookInfo>>) {
        self.book_list.insert(ALL, books);
    }

    pub fn user(&self, id: i64) -> Option<UserDetail> {
        record_lookup("user", self.users.get(&id))
    }

    pub fn put_user(&self, detail: UserDetail) {
        self.users.insert(detail.user.id, detail);
    }

    pub fn user_list(&self) -> Option<Arc<Vec<UserInfo>>> {
        record_lookup("user_list", self.user_list.get(ALL))
    }

    pub fn put_user_list(&self, users: Arc<Vec<UserInfo>>) {
        self.user_list.insert(ALL, users);
    }

    pub fn invalidate_user_list(&self) {
        self.user_list.invalidate(ALL);
    }

    /// Drop cached books and the book listing
    pub fn clear_books(&self) {
        self.books.invalidate_all();
        self.book_list.invalidate_all();
        info!("Book caches cleared");
    }

    /// Drop cached users and the user listing
    pub fn clear_users(&self) {
        self.users.invalidate_all();
        self.user_list.invalidate_all();
        info!("User caches cleared");
    }

    pub fn clear_all(&self) {
        self.clear_books();
        self.clear_users();
        info!("All caches cleared");
    }
}

#[async_trait]
impl CacheInvalidator for ReadCache {
    async fn invalidate_book(&self, book_id: i64) {
        self.books.invalidate(&book_id);
        debug!(book_id, "Book cache invalidated");
    }

    async fn invalidate_user(&self, user_id: i64) {
        self.users.invalidate(&user_id);
        debug!(user_id, "User cache invalidated");
    }

    async fn invalidate_listing(&self) {
        self.book_list.invalidate(ALL);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn book(id: i64) -> BookInfo {
        BookInfo {
            id,
            title: format!("Book {}", id),
            author: "Anon".to_string(),
            description: None,
            available: true,
            total_ratings: 0.0,
            rating_count: 0,
            average_rating: 0.0,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn detail(id: i64) -> UserDetail {
        UserDetail {
            user: UserInfo {
                id,
                name: "Ada".to_string(),
                email: format!("ada{}@example.com", id),
                created_at: Utc::now().naive_utc(),
            },
            current_borrowings: Vec::new(),
            past_borrowings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_invalidate_book_evicts_only_that_book() {
        let cache = ReadCache::default();
        cache.put_book(book(1));
        cache.put_book(book(2));
        cache.put_book_list(Arc::new(vec![book(1), book(2)]));

        cache.invalidate_book(1).await;

        assert!(cache.book(1).is_none());
        assert!(cache.book(2).is_some());
        assert!(cache.book_list().is_some());

        cache.invalidate_listing().await;
        assert!(cache.book_list().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_user() {
        let cache = ReadCache::default();
        cache.put_user(detail(5));
        assert!(cache.user(5).is_some());

        cache.invalidate_user(5).await;
        assert!(cache.user(5).is_none());
    }

    #[test]
    fn test_clear_books_keeps_users() {
        let cache = ReadCache::default();
        cache.put_book(book(1));
        cache.put_user(detail(1));

        cache.clear_books();

        assert!(cache.book(1).is_none());
        assert!(cache.user(1).is_some());
    }

    #[test]
    fn test_clear_all() {
        let cache = ReadCache::default();
        cache.put_book(book(1));
        cache.put_user(detail(1));
        cache.put_user_list(Arc::new(Vec::new()));

        cache.clear_all();

        assert!(cache.book(1).is_none());
        assert!(cache.user(1).is_none());
        assert!(cache.user_list().is_none());
    }
}

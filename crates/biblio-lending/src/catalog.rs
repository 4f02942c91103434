//! Cached reads and creation of books and users

use std::sync::Arc;

use biblio_common::{BiblioError, Result};
use biblio_persistence::{
    BookInfo, LendingPersistence, NewBook, NewUser, UniqueViolation, UserInfo,
};
use tracing::{debug, info};

use crate::cache::{CacheInvalidator, ReadCache};
use crate::model::{
    BOOK_NOT_FOUND_MESSAGE, Cached, DUPLICATE_EMAIL_MESSAGE, USER_NOT_FOUND_MESSAGE, UserDetail,
};
use crate::protocol::storage_failure;
use crate::validation::{CreateBookRequest, CreateUserRequest, check};

#[derive(Clone)]
pub struct CatalogService {
    persistence: Arc<dyn LendingPersistence>,
    cache: Arc<ReadCache>,
}

impl CatalogService {
    pub fn new(persistence: Arc<dyn LendingPersistence>, cache: Arc<ReadCache>) -> Self {
        Self { persistence, cache }
    }

    pub fn cache(&self) -> &Arc<ReadCache> {
        &self.cache
    }

    pub async fn list_books(&self) -> Result<Cached<Arc<Vec<BookInfo>>>> {
        if let Some(books) = self.cache.book_list() {
            debug!("Cache hit: all books");
            return Ok(Cached::from_cache(books));
        }

        let books = Arc::new(
            self.persistence
                .book_find_all()
                .await
                .map_err(storage_failure)?,
        );
        self.cache.put_book_list(books.clone());
        Ok(Cached::from_database(books))
    }

    pub async fn get_book(&self, id: i64) -> Result<Cached<BookInfo>> {
        if let Some(book) = self.cache.book(id) {
            debug!(book_id = id, "Cache hit: book");
            return Ok(Cached::from_cache(book));
        }

        let book = self
            .persistence
            .book_find_by_id(id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| BiblioError::not_found(BOOK_NOT_FOUND_MESSAGE))?;
        self.cache.put_book(book.clone());
        Ok(Cached::from_database(book))
    }

    pub async fn create_book(&self, request: CreateBookRequest) -> Result<BookInfo> {
        check(&request)?;

        let book = self
            .persistence
            .book_create(NewBook::from(request))
            .await
            .map_err(storage_failure)?;
        self.cache.invalidate_listing().await;

        info!(book_id = book.id, title = %book.title, "Book created");
        Ok(book)
    }

    pub async fn list_users(&self) -> Result<Cached<Arc<Vec<UserInfo>>>> {
        if let Some(users) = self.cache.user_list() {
            debug!("Cache hit: all users");
            return Ok(Cached::from_cache(users));
        }

        let users = Arc::new(
            self.persistence
                .user_find_all()
                .await
                .map_err(storage_failure)?,
        );
        self.cache.put_user_list(users.clone());
        Ok(Cached::from_database(users))
    }

    /// A user with their current and past borrowings
    pub async fn get_user(&self, id: i64) -> Result<Cached<UserDetail>> {
        if let Some(detail) = self.cache.user(id) {
            debug!(user_id = id, "Cache hit: user");
            return Ok(Cached::from_cache(detail));
        }

        let user = self
            .persistence
            .user_find_by_id(id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| BiblioError::not_found(USER_NOT_FOUND_MESSAGE))?;
        let history = self
            .persistence
            .borrowing_history_by_user(id)
            .await
            .map_err(storage_failure)?;

        let detail = UserDetail::from_history(user, history);
        self.cache.put_user(detail.clone());
        Ok(Cached::from_database(detail))
    }

    /// Fails with `InvalidState` when the email is taken, including when a
    /// concurrent create wins the race past the lookup.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserInfo> {
        check(&request)?;

        let existing = self
            .persistence
            .user_find_by_email(&request.email)
            .await
            .map_err(storage_failure)?;
        if existing.is_some() {
            return Err(BiblioError::invalid_state(DUPLICATE_EMAIL_MESSAGE));
        }

        let user = self
            .persistence
            .user_create(NewUser::from(request))
            .await
            .map_err(|e| {
                if e.is::<UniqueViolation>() {
                    BiblioError::invalid_state(DUPLICATE_EMAIL_MESSAGE)
                } else {
                    storage_failure(e)
                }
            })?;
        self.cache.invalidate_user_list();

        info!(user_id = user.id, "User created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use biblio_persistence::MemoryPersistService;

    use super::*;
    use crate::model::ReadSource;

    fn catalog() -> CatalogService {
        CatalogService::new(
            Arc::new(MemoryPersistService::new()),
            Arc::new(ReadCache::default()),
        )
    }

    fn book_request(title: &str) -> CreateBookRequest {
        CreateBookRequest {
            title: title.to_string(),
            author: "Toni Morrison".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_get_book_is_cached_after_first_read() {
        let catalog = catalog();
        let book = catalog.create_book(book_request("Beloved")).await.unwrap();

        let first = catalog.get_book(book.id).await.unwrap();
        assert_eq!(first.source, ReadSource::Database);
        let second = catalog.get_book(book.id).await.unwrap();
        assert_eq!(second.source, ReadSource::Cache);
        assert_eq!(second.value, book);
    }

    #[tokio::test]
    async fn test_create_book_invalidates_listing() {
        let catalog = catalog();
        catalog.create_book(book_request("Sula")).await.unwrap();
        assert_eq!(catalog.list_books().await.unwrap().value.len(), 1);

        catalog.create_book(book_request("Jazz")).await.unwrap();
        let listing = catalog.list_books().await.unwrap();
        assert_eq!(listing.source, ReadSource::Database);
        assert_eq!(listing.value.len(), 2);
    }

    #[tokio::test]
    async fn test_create_book_validates() {
        let catalog = catalog();
        let err = catalog.create_book(book_request("")).await.unwrap_err();
        assert_eq!(err, BiblioError::validation("Title is required"));
    }

    #[tokio::test]
    async fn test_missing_book_and_user() {
        let catalog = catalog();
        assert_eq!(
            catalog.get_book(9).await.unwrap_err(),
            BiblioError::not_found(BOOK_NOT_FOUND_MESSAGE)
        );
        assert_eq!(
            catalog.get_user(9).await.unwrap_err(),
            BiblioError::not_found(USER_NOT_FOUND_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let catalog = catalog();
        let request = CreateUserRequest {
            name: "Pecola".to_string(),
            email: "pecola@example.com".to_string(),
        };
        catalog.create_user(request.clone()).await.unwrap();

        let err = catalog.create_user(request).await.unwrap_err();
        assert_eq!(err, BiblioError::invalid_state(DUPLICATE_EMAIL_MESSAGE));
        assert_eq!(catalog.list_users().await.unwrap().value.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_email_is_never_internal() {
        let catalog = catalog();
        let request = CreateUserRequest {
            name: "Nel".to_string(),
            email: "nel@example.com".to_string(),
        };

        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let catalog = catalog.clone();
                let request = request.clone();
                tokio::spawn(async move { catalog.create_user(request).await })
            })
            .collect();

        let mut created = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => {
                    assert_eq!(err, BiblioError::invalid_state(DUPLICATE_EMAIL_MESSAGE))
                }
            }
        }
        assert_eq!(created, 1);
    }
}

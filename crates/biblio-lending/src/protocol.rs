//! Borrow/return transitions serialized per book
//!
//! Every write to a book's availability or rating statistics happens while the
//! book's lock is held, inside one persistence commit. The lock is released on
//! every exit path by [`LockCoordinator::with_lock`], and a caller that stops
//! waiting does not interrupt a commit already under way.

use std::sync::Arc;

use biblio_common::{BiblioError, Result};
use biblio_lock::{LockCoordinator, LockOptions, LockOutcome, lock_name};
use biblio_persistence::{BorrowingInfo, LendingPersistence, ReturnCommit, ReturnRecord};
use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::cache::CacheInvalidator;
use crate::model::{
    ALREADY_RETURNED_MESSAGE, BOOK_BUSY_MESSAGE, BOOK_NOT_FOUND_MESSAGE, BOOK_UNAVAILABLE_MESSAGE,
    BORROWING_NOT_FOUND_MESSAGE, USER_NOT_FOUND_MESSAGE,
};
use crate::validation::validate_rating;

/// Lock namespace for book transitions
pub const BOOK_LOCK_KIND: &str = "book";

/// Log the storage failure and hide its detail from the caller
pub(crate) fn storage_failure(error: anyhow::Error) -> BiblioError {
    error!(error = %format!("{:#}", error), "Storage operation failed");
    BiblioError::from(error)
}

fn outcome_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(BiblioError::Conflict(_)) => "conflict",
        Err(BiblioError::NotFound(_)) => "not_found",
        Err(BiblioError::InvalidState(_)) => "invalid_state",
        Err(BiblioError::ValidationFailed(_)) => "validation_failed",
        Err(BiblioError::InternalFailure(_)) => "internal_failure",
    }
}

fn record_transition<T>(operation: &'static str, started: Instant, result: &Result<T>) {
    let outcome = outcome_label(result);
    counter!("lending_transitions_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    histogram!("lending_transition_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

fn unwrap_outcome<T>(outcome: LockOutcome<Result<T>>, lock: &str) -> Result<T> {
    match outcome {
        LockOutcome::Completed(result) => result,
        LockOutcome::TimedOut { waited } => {
            warn!(
                lock = %lock,
                waited_ms = waited.as_millis() as u64,
                "Book is busy, giving up"
            );
            Err(BiblioError::conflict(BOOK_BUSY_MESSAGE))
        }
    }
}

/// The borrow/return state machine
#[derive(Clone)]
pub struct LendingService {
    persistence: Arc<dyn LendingPersistence>,
    locks: LockCoordinator,
    lock_options: LockOptions,
    invalidator: Arc<dyn CacheInvalidator>,
}

impl LendingService {
    pub fn new(
        persistence: Arc<dyn LendingPersistence>,
        locks: LockCoordinator,
        invalidator: Arc<dyn CacheInvalidator>,
    ) -> Self {
        let lock_options = locks.default_options();
        Self {
            persistence,
            locks,
            lock_options,
            invalidator,
        }
    }

    /// Override the lock parameters used for every transition
    pub fn with_lock_options(mut self, options: LockOptions) -> Self {
        self.lock_options = options;
        self
    }

    pub fn lock_options(&self) -> LockOptions {
        self.lock_options
    }

    /// Lend `book_id` to `user_id`.
    ///
    /// Fails with `Conflict` if the book stays locked past the acquisition bound,
    /// `NotFound` for an unknown user or book, and `InvalidState` when the book
    /// is already lent out.
    pub async fn borrow(&self, user_id: i64, book_id: i64) -> Result<BorrowingInfo> {
        let started = Instant::now();
        let result = self.borrow_serialized(user_id, book_id).await;
        record_transition("borrow", started, &result);

        let borrowing = result?;
        self.invalidator.invalidate_book(book_id).await;
        self.invalidator.invalidate_listing().await;
        self.invalidator.invalidate_user(user_id).await;

        info!(
            borrowing_id = borrowing.id,
            book_id, user_id, "Book borrowed"
        );
        Ok(borrowing)
    }

    async fn borrow_serialized(&self, user_id: i64, book_id: i64) -> Result<BorrowingInfo> {
        let lock = lock_name(BOOK_LOCK_KIND, book_id);
        let service = self.clone();
        let outcome = self
            .locks
            .with_lock(&lock, &self.lock_options, move || async move {
                service.borrow_locked(user_id, book_id).await
            })
            .await?;
        unwrap_outcome(outcome, &lock)
    }

    async fn borrow_locked(&self, user_id: i64, book_id: i64) -> Result<BorrowingInfo> {
        self.persistence
            .user_find_by_id(user_id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| BiblioError::not_found(USER_NOT_FOUND_MESSAGE))?;

        let book = self
            .persistence
            .book_find_by_id(book_id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| BiblioError::not_found(BOOK_NOT_FOUND_MESSAGE))?;

        if !book.available {
            return Err(BiblioError::invalid_state(BOOK_UNAVAILABLE_MESSAGE));
        }

        self.persistence
            .borrowing_commit_borrow(book_id, user_id, chrono::Utc::now().naive_utc())
            .await
            .map_err(storage_failure)
    }

    /// Close `borrowing_id`, optionally recording a 1-5 rating for the book.
    ///
    /// The borrowing is looked up before locking since only it names the book;
    /// it is checked again once the lock is held.
    pub async fn return_book(
        &self,
        borrowing_id: i64,
        rating: Option<f64>,
    ) -> Result<ReturnRecord> {
        let started = Instant::now();
        let result = self.return_serialized(borrowing_id, rating).await;
        record_transition("return", started, &result);

        let record = result?;
        self.invalidator.invalidate_book(record.book.id).await;
        self.invalidator.invalidate_listing().await;
        self.invalidator
            .invalidate_user(record.borrowing.user_id)
            .await;

        info!(
            borrowing_id,
            book_id = record.book.id,
            rating = ?rating,
            "Book returned"
        );
        Ok(record)
    }

    async fn return_serialized(
        &self,
        borrowing_id: i64,
        rating: Option<f64>,
    ) -> Result<ReturnRecord> {
        validate_rating(rating)?;

        let borrowing = self.open_borrowing(borrowing_id).await?;

        let lock = lock_name(BOOK_LOCK_KIND, borrowing.book_id);
        let service = self.clone();
        let outcome = self
            .locks
            .with_lock(&lock, &self.lock_options, move || async move {
                service.return_locked(borrowing_id, rating).await
            })
            .await?;
        unwrap_outcome(outcome, &lock)
    }

    async fn return_locked(&self, borrowing_id: i64, rating: Option<f64>) -> Result<ReturnRecord> {
        // Another instance may have closed it while we waited for the lock
        let borrowing = self.open_borrowing(borrowing_id).await?;

        let book = self
            .persistence
            .book_find_by_id(borrowing.book_id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| BiblioError::not_found(BOOK_NOT_FOUND_MESSAGE))?;

        let commit = ReturnCommit {
            borrowing_id,
            book_id: book.id,
            returned_at: chrono::Utc::now().naive_utc(),
            rating,
            stats: book.rating_stats().record(rating),
        };

        self.persistence
            .borrowing_commit_return(commit)
            .await
            .map_err(storage_failure)
    }

    async fn open_borrowing(&self, borrowing_id: i64) -> Result<BorrowingInfo> {
        let borrowing = self
            .persistence
            .borrowing_find_by_id(borrowing_id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| BiblioError::not_found(BORROWING_NOT_FOUND_MESSAGE))?;

        if borrowing.returned {
            return Err(BiblioError::invalid_state(ALREADY_RETURNED_MESSAGE));
        }
        Ok(borrowing)
    }
}

//! Borrowing persistence trait
//!
//! The two commit operations are the only writes that touch a book after it is
//! created. Callers hold the book's lock around them.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::model::{BorrowingHistoryEntry, BorrowingInfo, ReturnCommit, ReturnRecord};

#[async_trait]
pub trait BorrowingPersistence: Send + Sync {
    async fn borrowing_find_by_id(&self, id: i64) -> anyhow::Result<Option<BorrowingInfo>>;

    /// Every borrowing of one user joined with the book title, newest first
    async fn borrowing_history_by_user(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<BorrowingHistoryEntry>>;

    /// Number of borrowings of `book_id` that are not yet returned
    async fn borrowing_count_open(&self, book_id: i64) -> anyhow::Result<u64>;

    /// Atomically insert an open borrowing and mark the book unavailable.
    ///
    /// Fails without writing anything if the book is missing or already
    /// unavailable.
    async fn borrowing_commit_borrow(
        &self,
        book_id: i64,
        user_id: i64,
        borrowed_at: NaiveDateTime,
    ) -> anyhow::Result<BorrowingInfo>;

    /// Atomically close a borrowing, mark its book available and store the new
    /// rating statistics.
    ///
    /// Fails without writing anything if the borrowing is missing or already
    /// returned.
    async fn borrowing_commit_return(&self, commit: ReturnCommit) -> anyhow::Result<ReturnRecord>;
}

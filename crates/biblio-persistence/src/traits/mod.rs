//! Persistence traits for the lending storage layer
//!
//! The traits abstract over the external database (MySQL/PostgreSQL) and the
//! in-process memory backend.

pub mod book;
pub mod borrowing;
pub mod user;

pub use book::BookPersistence;
pub use borrowing::BorrowingPersistence;
pub use user::UserPersistence;

use async_trait::async_trait;

use crate::model::StorageMode;

/// Unified lending persistence trait
///
/// Implementations must make each `borrowing_commit_*` call all-or-nothing
/// across the borrowing row and the book row it touches.
#[async_trait]
pub trait LendingPersistence:
    BookPersistence + UserPersistence + BorrowingPersistence + Send + Sync
{
    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}

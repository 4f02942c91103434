//! Biblio Persistence - Database entities and persistence layer
//!
//! This crate provides:
//! - SeaORM entity definitions for books, users and borrowings
//! - Persistence trait abstractions shared by every backend
//! - Domain model types for persistence operations

pub mod entity;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export entity prelude
pub use entity::prelude::*;

// Re-export persistence traits
pub use traits::{BookPersistence, BorrowingPersistence, LendingPersistence, UserPersistence};

// Re-export SQL backend
pub use sql::ExternalDbPersistService;

// Re-export in-process backend
pub use memory::MemoryPersistService;

// Re-export model types
pub use model::{
    BookInfo, BorrowingHistoryEntry, BorrowingInfo, NewBook, NewUser, RatingStats, ReturnCommit,
    ReturnRecord, StorageMode, UniqueViolation, UserInfo,
};

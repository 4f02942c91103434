//! Biblio Lending - Lock-serialized lending transitions
//!
//! This crate provides:
//! - `LendingService`: borrow and return, one book lock per transition
//! - `CatalogService`: cached reads and creation of books and users
//! - `ReadCache` / `CacheInvalidator`: read cache and its eviction sink
//! - Request validation

pub mod cache;
pub mod catalog;
pub mod model;
pub mod protocol;
pub mod validation;

pub use cache::{CacheInvalidator, CacheOptions, NoopInvalidator, ReadCache};
pub use catalog::CatalogService;
pub use model::{Cached, ReadSource, UserDetail};
pub use protocol::{BOOK_LOCK_KIND, LendingService};
pub use validation::{BorrowRequest, CreateBookRequest, CreateUserRequest, ReturnRequest};

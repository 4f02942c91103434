//! Read models returned by the lending services

use biblio_persistence::{BorrowingHistoryEntry, UserInfo};
use serde::{Deserialize, Serialize};

/// Messages shown to callers for the protocol's failure cases
pub const BOOK_BUSY_MESSAGE: &str =
    "Book is currently being processed by another request. Please try again.";
pub const BOOK_UNAVAILABLE_MESSAGE: &str = "Book is not available for borrowing";
pub const ALREADY_RETURNED_MESSAGE: &str = "Book has already been returned";
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";
pub const BOOK_NOT_FOUND_MESSAGE: &str = "Book not found";
pub const BORROWING_NOT_FOUND_MESSAGE: &str = "Borrowing record not found";
pub const DUPLICATE_EMAIL_MESSAGE: &str = "User with this email already exists";

/// A user with their open and closed borrowings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub user: UserInfo,
    /// Open borrowings, most recently borrowed first
    pub current_borrowings: Vec<BorrowingHistoryEntry>,
    /// Closed borrowings, most recently returned first
    pub past_borrowings: Vec<BorrowingHistoryEntry>,
}

impl UserDetail {
    pub fn from_history(user: UserInfo, history: Vec<BorrowingHistoryEntry>) -> Self {
        let (mut past_borrowings, current_borrowings): (Vec<_>, Vec<_>) =
            history.into_iter().partition(|entry| entry.returned);
        past_borrowings.sort_by(|a, b| b.return_date.cmp(&a.return_date));

        Self {
            user,
            current_borrowings,
            past_borrowings,
        }
    }
}

/// Where a read was served from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadSource {
    Cache,
    Database,
}

/// A read result tagged with its source
#[derive(Clone, Debug, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub source: ReadSource,
}

impl<T> Cached<T> {
    pub fn from_cache(value: T) -> Self {
        Self {
            value,
            source: ReadSource::Cache,
        }
    }

    pub fn from_database(value: T) -> Self {
        Self {
            value,
            source: ReadSource::Database,
        }
    }
}

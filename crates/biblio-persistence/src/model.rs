//! Domain model types exchanged with the persistence backends

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::entity::{book, borrowing, user};

/// Storage backend selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// External database (MySQL/PostgreSQL via SeaORM)
    #[default]
    ExternalDb,
    /// In-process tables, lost on restart
    Memory,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::ExternalDb => write!(f, "external_db"),
            StorageMode::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_db" => Ok(StorageMode::ExternalDb),
            "memory" => Ok(StorageMode::Memory),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}

/// Running rating aggregate kept on each book
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    pub total_ratings: f64,
    pub rating_count: i32,
    pub average_rating: f64,
}

impl RatingStats {
    /// Fold one return into the aggregate. An unrated return changes nothing.
    pub fn record(self, rating: Option<f64>) -> Self {
        let total_ratings = self.total_ratings + rating.unwrap_or(0.0);
        let rating_count = self.rating_count + i32::from(rating.is_some());
        let average_rating = if rating_count > 0 {
            total_ratings / f64::from(rating_count)
        } else {
            0.0
        };

        Self {
            total_ratings,
            rating_count,
            average_rating,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInfo {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub available: bool,
    pub total_ratings: f64,
    pub rating_count: i32,
    pub average_rating: f64,
    pub created_at: NaiveDateTime,
}

impl BookInfo {
    pub fn rating_stats(&self) -> RatingStats {
        RatingStats {
            total_ratings: self.total_ratings,
            rating_count: self.rating_count,
            average_rating: self.average_rating,
        }
    }
}

impl From<book::Model> for BookInfo {
    fn from(m: book::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            author: m.author,
            description: m.description,
            available: m.available,
            total_ratings: m.total_ratings,
            rating_count: m.rating_count,
            average_rating: m.average_rating,
            created_at: m.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

impl From<user::Model> for UserInfo {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            created_at: m.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingInfo {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: NaiveDateTime,
    pub return_date: Option<NaiveDateTime>,
    pub rating: Option<f64>,
    pub returned: bool,
}

impl From<borrowing::Model> for BorrowingInfo {
    fn from(m: borrowing::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            book_id: m.book_id,
            borrow_date: m.borrow_date,
            return_date: m.return_date,
            rating: m.rating,
            returned: m.returned,
        }
    }
}

/// One line of a user's borrowing history, joined with the book title
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingHistoryEntry {
    pub borrowing_id: i64,
    pub book_id: i64,
    pub title: String,
    pub borrow_date: NaiveDateTime,
    pub return_date: Option<NaiveDateTime>,
    pub rating: Option<f64>,
    pub returned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Everything written when a borrowing is closed
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnCommit {
    pub borrowing_id: i64,
    pub book_id: i64,
    pub returned_at: NaiveDateTime,
    pub rating: Option<f64>,
    pub stats: RatingStats,
}

/// A write rejected by a unique index.
///
/// Backends return it inside `anyhow::Error` so callers can tell it apart with
/// `downcast_ref`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unique constraint violated: {0}")]
pub struct UniqueViolation(pub String);

/// Rows written by a committed return
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnRecord {
    pub borrowing: BorrowingInfo,
    pub book: BookInfo,
}

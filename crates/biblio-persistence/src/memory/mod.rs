// In-process persistence backend
// Standalone storage without an external database; contents are lost on restart

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use tracing::debug;

use crate::model::{
    BookInfo, BorrowingHistoryEntry, BorrowingInfo, NewBook, NewUser, RatingStats, ReturnCommit,
    ReturnRecord, StorageMode, UniqueViolation, UserInfo,
};
use crate::traits::{BookPersistence, BorrowingPersistence, LendingPersistence, UserPersistence};

#[derive(Default)]
struct Tables {
    books: BTreeMap<i64, BookInfo>,
    users: BTreeMap<i64, UserInfo>,
    borrowings: BTreeMap<i64, BorrowingInfo>,
    next_book_id: i64,
    next_user_id: i64,
    next_borrowing_id: i64,
}

impl Tables {
    fn allocate(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// In-memory persistence using one table set behind a `RwLock`
///
/// Every commit takes the write lock once, so it is observed either completely
/// or not at all.
#[derive(Default)]
pub struct MemoryPersistService {
    tables: RwLock<Tables>,
    fail_commits: AtomicBool,
}

impl MemoryPersistService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail before writing, as an unreachable
    /// database would. Used to exercise failure paths.
    pub fn set_commit_failure(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            anyhow::bail!("memory backend rejected the commit");
        }
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

fn newest_first<T>(mut rows: Vec<T>, key: impl Fn(&T) -> (NaiveDateTime, i64)) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
    rows
}

#[async_trait]
impl LendingPersistence for MemoryPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Memory
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl BookPersistence for MemoryPersistService {
    async fn book_find_by_id(&self, id: i64) -> anyhow::Result<Option<BookInfo>> {
        Ok(self.tables.read().books.get(&id).cloned())
    }

    async fn book_find_all(&self) -> anyhow::Result<Vec<BookInfo>> {
        let books = self.tables.read().books.values().cloned().collect();
        Ok(newest_first(books, |b| (b.created_at, b.id)))
    }

    async fn book_create(&self, new_book: NewBook) -> anyhow::Result<BookInfo> {
        let mut tables = self.tables.write();
        let id = Tables::allocate(&mut tables.next_book_id);
        let stats = RatingStats::default();

        let book = BookInfo {
            id,
            title: new_book.title,
            author: new_book.author,
            description: new_book.description,
            available: true,
            total_ratings: stats.total_ratings,
            rating_count: stats.rating_count,
            average_rating: stats.average_rating,
            created_at: now(),
        };
        tables.books.insert(id, book.clone());

        Ok(book)
    }
}

#[async_trait]
impl UserPersistence for MemoryPersistService {
    async fn user_find_by_id(&self, id: i64) -> anyhow::Result<Option<UserInfo>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn user_find_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn user_find_all(&self) -> anyhow::Result<Vec<UserInfo>> {
        let mut users: Vec<UserInfo> = self.tables.read().users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn user_create(&self, new_user: NewUser) -> anyhow::Result<UserInfo> {
        let mut tables = self.tables.write();
        // Mirrors the unique index on users.email
        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(UniqueViolation(format!("users.email = {}", new_user.email)).into());
        }

        let id = Tables::allocate(&mut tables.next_user_id);
        let user = UserInfo {
            id,
            name: new_user.name,
            email: new_user.email,
            created_at: now(),
        };
        tables.users.insert(id, user.clone());

        Ok(user)
    }
}

#[async_trait]
impl BorrowingPersistence for MemoryPersistService {
    async fn borrowing_find_by_id(&self, id: i64) -> anyhow::Result<Option<BorrowingInfo>> {
        Ok(self.tables.read().borrowings.get(&id).cloned())
    }

    async fn borrowing_history_by_user(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<BorrowingHistoryEntry>> {
        let tables = self.tables.read();
        let entries = tables
            .borrowings
            .values()
            .filter(|b| b.user_id == user_id)
            .map(|b| BorrowingHistoryEntry {
                borrowing_id: b.id,
                book_id: b.book_id,
                title: tables
                    .books
                    .get(&b.book_id)
                    .map(|book| book.title.clone())
                    .unwrap_or_default(),
                borrow_date: b.borrow_date,
                return_date: b.return_date,
                rating: b.rating,
                returned: b.returned,
            })
            .collect();

        Ok(newest_first(entries, |e| (e.borrow_date, e.borrowing_id)))
    }

    async fn borrowing_count_open(&self, book_id: i64) -> anyhow::Result<u64> {
        let count = self
            .tables
            .read()
            .borrowings
            .values()
            .filter(|b| b.book_id == book_id && !b.returned)
            .count();
        Ok(count as u64)
    }

    async fn borrowing_commit_borrow(
        &self,
        book_id: i64,
        user_id: i64,
        borrowed_at: NaiveDateTime,
    ) -> anyhow::Result<BorrowingInfo> {
        self.check_writable()?;
        let mut tables = self.tables.write();

        match tables.books.get(&book_id) {
            Some(book) if book.available => {}
            _ => anyhow::bail!("book {} is missing or already borrowed", book_id),
        }

        let id = Tables::allocate(&mut tables.next_borrowing_id);
        let record = BorrowingInfo {
            id,
            user_id,
            book_id,
            borrow_date: borrowed_at,
            return_date: None,
            rating: None,
            returned: false,
        };
        tables.borrowings.insert(id, record.clone());
        if let Some(book) = tables.books.get_mut(&book_id) {
            book.available = false;
        }

        debug!(book_id, user_id, borrowing_id = id, "Borrow committed");
        Ok(record)
    }

    async fn borrowing_commit_return(&self, commit: ReturnCommit) -> anyhow::Result<ReturnRecord> {
        self.check_writable()?;
        let mut tables = self.tables.write();

        match tables.borrowings.get(&commit.borrowing_id) {
            Some(b) if !b.returned && b.book_id == commit.book_id => {}
            _ => anyhow::bail!(
                "borrowing {} is missing or already returned",
                commit.borrowing_id
            ),
        }
        let Some(book) = tables.books.get_mut(&commit.book_id) else {
            anyhow::bail!("book {} is missing", commit.book_id);
        };

        book.available = true;
        book.total_ratings = commit.stats.total_ratings;
        book.rating_count = commit.stats.rating_count;
        book.average_rating = commit.stats.average_rating;
        let book = book.clone();

        let Some(borrowing) = tables.borrowings.get_mut(&commit.borrowing_id) else {
            anyhow::bail!("borrowing {} is missing", commit.borrowing_id);
        };
        borrowing.return_date = Some(commit.returned_at);
        borrowing.rating = commit.rating;
        borrowing.returned = true;
        let borrowing = borrowing.clone();

        debug!(
            book_id = commit.book_id,
            borrowing_id = commit.borrowing_id,
            rating = ?commit.rating,
            "Return committed"
        );

        Ok(ReturnRecord { borrowing, book })
    }
}

//! SQL-based persistence backend (MySQL/PostgreSQL via SeaORM)
//!
//! Each commit runs in one database transaction, so a failed statement leaves
//! neither the borrowing nor the book changed.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{prelude::Expr, *};
use tracing::{debug, info};

use crate::entity::{book, borrowing, user};
use crate::model::*;
use crate::traits::*;

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection` and implements all persistence traits
/// with direct queries.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the lending tables from the entity definitions if they do not exist
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let statements = [
            schema
                .create_table_from_entity(book::Entity)
                .if_not_exists()
                .to_owned(),
            schema
                .create_table_from_entity(user::Entity)
                .if_not_exists()
                .to_owned(),
            schema
                .create_table_from_entity(borrowing::Entity)
                .if_not_exists()
                .to_owned(),
        ];

        for statement in statements {
            self.db.execute(backend.build(&statement)).await?;
        }

        info!("Lending schema is ready");
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

// ============================================================================
// LendingPersistence implementation
// ============================================================================

#[async_trait]
impl LendingPersistence for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}

// ============================================================================
// BookPersistence implementation
// ============================================================================

#[async_trait]
impl BookPersistence for ExternalDbPersistService {
    async fn book_find_by_id(&self, id: i64) -> anyhow::Result<Option<BookInfo>> {
        let found = book::Entity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(BookInfo::from))
    }

    async fn book_find_all(&self) -> anyhow::Result<Vec<BookInfo>> {
        let books = book::Entity::find()
            .order_by_desc(book::Column::CreatedAt)
            .order_by_desc(book::Column::Id)
            .all(&self.db)
            .await?;
        Ok(books.into_iter().map(BookInfo::from).collect())
    }

    async fn book_create(&self, new_book: NewBook) -> anyhow::Result<BookInfo> {
        let model = book::ActiveModel {
            title: Set(new_book.title),
            author: Set(new_book.author),
            description: Set(new_book.description),
            available: Set(true),
            total_ratings: Set(0.0),
            rating_count: Set(0),
            average_rating: Set(0.0),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }
}

// ============================================================================
// UserPersistence implementation
// ============================================================================

#[async_trait]
impl UserPersistence for ExternalDbPersistService {
    async fn user_find_by_id(&self, id: i64) -> anyhow::Result<Option<UserInfo>> {
        let found = user::Entity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(UserInfo::from))
    }

    async fn user_find_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(found.map(UserInfo::from))
    }

    async fn user_find_all(&self) -> anyhow::Result<Vec<UserInfo>> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::Name)
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;
        Ok(users.into_iter().map(UserInfo::from).collect())
    }

    async fn user_create(&self, new_user: NewUser) -> anyhow::Result<UserInfo> {
        let model = user::ActiveModel {
            name: Set(new_user.name),
            email: Set(new_user.email),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                anyhow::Error::new(UniqueViolation(detail))
            }
            _ => e.into(),
        })?;

        Ok(model.into())
    }
}

// ============================================================================
// BorrowingPersistence implementation
// ============================================================================

#[async_trait]
impl BorrowingPersistence for ExternalDbPersistService {
    async fn borrowing_find_by_id(&self, id: i64) -> anyhow::Result<Option<BorrowingInfo>> {
        let found = borrowing::Entity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(BorrowingInfo::from))
    }

    async fn borrowing_history_by_user(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<BorrowingHistoryEntry>> {
        let rows = borrowing::Entity::find()
            .filter(borrowing::Column::UserId.eq(user_id))
            .order_by_desc(borrowing::Column::BorrowDate)
            .order_by_desc(borrowing::Column::Id)
            .find_also_related(book::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(b, book)| BorrowingHistoryEntry {
                borrowing_id: b.id,
                book_id: b.book_id,
                title: book.map(|book| book.title).unwrap_or_default(),
                borrow_date: b.borrow_date,
                return_date: b.return_date,
                rating: b.rating,
                returned: b.returned,
            })
            .collect())
    }

    async fn borrowing_count_open(&self, book_id: i64) -> anyhow::Result<u64> {
        let count = borrowing::Entity::find()
            .filter(borrowing::Column::BookId.eq(book_id))
            .filter(borrowing::Column::Returned.eq(false))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn borrowing_commit_borrow(
        &self,
        book_id: i64,
        user_id: i64,
        borrowed_at: NaiveDateTime,
    ) -> anyhow::Result<BorrowingInfo> {
        let tx = self.db.begin().await?;

        let flipped = book::Entity::update_many()
            .col_expr(book::Column::Available, Expr::value(false))
            .filter(book::Column::Id.eq(book_id))
            .filter(book::Column::Available.eq(true))
            .exec(&tx)
            .await?;

        if flipped.rows_affected != 1 {
            tx.rollback().await?;
            anyhow::bail!("book {} is missing or already borrowed", book_id);
        }

        let record = borrowing::ActiveModel {
            user_id: Set(user_id),
            book_id: Set(book_id),
            borrow_date: Set(borrowed_at),
            return_date: Set(None),
            rating: Set(None),
            returned: Set(false),
            ..Default::default()
        }
        .insert(&tx)
        .await?;

        tx.commit().await?;

        debug!(book_id, user_id, borrowing_id = record.id, "Borrow committed");
        Ok(record.into())
    }

    async fn borrowing_commit_return(&self, commit: ReturnCommit) -> anyhow::Result<ReturnRecord> {
        let tx = self.db.begin().await?;

        let closed = borrowing::Entity::update_many()
            .col_expr(
                borrowing::Column::ReturnDate,
                Expr::value(Some(commit.returned_at)),
            )
            .col_expr(borrowing::Column::Rating, Expr::value(commit.rating))
            .col_expr(borrowing::Column::Returned, Expr::value(true))
            .filter(borrowing::Column::Id.eq(commit.borrowing_id))
            .filter(borrowing::Column::BookId.eq(commit.book_id))
            .filter(borrowing::Column::Returned.eq(false))
            .exec(&tx)
            .await?;

        if closed.rows_affected != 1 {
            tx.rollback().await?;
            anyhow::bail!(
                "borrowing {} is missing or already returned",
                commit.borrowing_id
            );
        }

        let stats = commit.stats;
        let reopened = book::Entity::update_many()
            .col_expr(book::Column::Available, Expr::value(true))
            .col_expr(book::Column::TotalRatings, Expr::value(stats.total_ratings))
            .col_expr(book::Column::RatingCount, Expr::value(stats.rating_count))
            .col_expr(
                book::Column::AverageRating,
                Expr::value(stats.average_rating),
            )
            .filter(book::Column::Id.eq(commit.book_id))
            .exec(&tx)
            .await?;

        if reopened.rows_affected != 1 {
            tx.rollback().await?;
            anyhow::bail!("book {} is missing", commit.book_id);
        }

        let borrowing = borrowing::Entity::find_by_id(commit.borrowing_id)
            .one(&tx)
            .await?
            .ok_or_else(|| anyhow::anyhow!("borrowing {} vanished", commit.borrowing_id))?;
        let book = book::Entity::find_by_id(commit.book_id)
            .one(&tx)
            .await?
            .ok_or_else(|| anyhow::anyhow!("book {} vanished", commit.book_id))?;

        tx.commit().await?;

        debug!(
            book_id = commit.book_id,
            borrowing_id = commit.borrowing_id,
            rating = ?commit.rating,
            "Return committed"
        );

        Ok(ReturnRecord {
            borrowing: borrowing.into(),
            book: book.into(),
        })
    }
}

//! User persistence trait

use async_trait::async_trait;

use crate::model::{NewUser, UserInfo};

#[async_trait]
pub trait UserPersistence: Send + Sync {
    async fn user_find_by_id(&self, id: i64) -> anyhow::Result<Option<UserInfo>>;

    async fn user_find_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>>;

    /// All users ordered by name
    async fn user_find_all(&self) -> anyhow::Result<Vec<UserInfo>>;

    async fn user_create(&self, user: NewUser) -> anyhow::Result<UserInfo>;
}

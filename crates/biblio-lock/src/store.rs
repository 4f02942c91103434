//! Shared key-value store abstraction
//!
//! The coordinator only needs two atomic primitives from the store. Both must be
//! executed by the store as a single operation so that concurrent instances can
//! never interleave between the check and the write.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Set `key` to `value` with expiry `ttl` only if `key` is absent.
    ///
    /// Returns `true` if the value was written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// Delete `key` only if its current value equals `expected`.
    ///
    /// Returns `true` if a deletion happened.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> anyhow::Result<bool>;

    /// Current live value of `key`
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Connectivity check
    async fn ping(&self) -> anyhow::Result<()>;
}

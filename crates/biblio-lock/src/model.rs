//! Lock data model

use std::fmt::{Display, Formatter};
use std::time::Duration;

use biblio_common::{
    DEFAULT_LOCK_ACQUIRE_TIMEOUT_MS, DEFAULT_LOCK_RETRY_INTERVAL_MS, DEFAULT_LOCK_TTL_MS,
};
use serde::{Deserialize, Serialize};

/// Timing parameters for one acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// How long the shared store keeps the lock before expiring it on its own
    pub ttl: Duration,
    /// Wall-clock bound on the whole acquisition loop
    pub acquire_timeout: Duration,
    /// Pause between attempts while the lock is held elsewhere
    pub retry_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self::from_millis(
            DEFAULT_LOCK_TTL_MS,
            DEFAULT_LOCK_ACQUIRE_TIMEOUT_MS,
            DEFAULT_LOCK_RETRY_INTERVAL_MS,
        )
    }
}

impl LockOptions {
    pub fn from_millis(ttl_ms: u64, acquire_timeout_ms: u64, retry_interval_ms: u64) -> Self {
        Self {
            ttl: Duration::from_millis(ttl_ms),
            acquire_timeout: Duration::from_millis(acquire_timeout_ms),
            retry_interval: Duration::from_millis(retry_interval_ms),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }
}

/// Random value identifying the acquisition attempt that owns a lock
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockToken(String);

impl LockToken {
    /// Fresh token for a new acquisition attempt
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LockToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LockToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Result of `LockCoordinator::acquire`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Acquired(LockToken),
    /// Another holder kept the lock for the whole acquisition bound
    TimedOut { waited: Duration, attempts: u32 },
}

impl Acquisition {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired(_))
    }

    pub fn token(&self) -> Option<&LockToken> {
        match self {
            Self::Acquired(token) => Some(token),
            Self::TimedOut { .. } => None,
        }
    }
}

/// Result of `LockCoordinator::release`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    Released,
    /// The stored value did not match the token; nothing was deleted
    NotOwner,
}

/// Result of running a critical section under `LockCoordinator::with_lock`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome<T> {
    Completed(T),
    TimedOut { waited: Duration },
}

/// Lock statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStats {
    pub total_acquisitions: u64,
    pub contended_attempts: u64,
    pub timed_out_acquisitions: u64,
    pub total_releases: u64,
    pub not_owner_releases: u64,
}

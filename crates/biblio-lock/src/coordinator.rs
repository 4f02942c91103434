//! Lock coordinator
//!
//! Named, time-bounded mutual exclusion on top of a [`SharedStore`]. Each
//! acquisition writes a fresh random token under the lock name with
//! set-if-absent; release deletes the name only while it still holds that token.
//! A holder whose lock expired during a long critical section can therefore never
//! delete the lock of whoever acquired it next.

use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use biblio_common::{BiblioError, LOCK_KEY_PREFIX};
use futures::FutureExt;
use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::model::{Acquisition, LockOptions, LockOutcome, LockStats, LockToken, ReleaseOutcome};
use crate::store::SharedStore;

/// Infrastructure failure of the shared store.
///
/// Contention is never reported through this type.
#[derive(thiserror::Error, Debug)]
pub enum LockError {
    #[error("shared store error: {0:#}")]
    Store(anyhow::Error),

    /// The runtime shut down while a critical section was running
    #[error("critical section task was aborted")]
    Aborted,
}

impl From<LockError> for BiblioError {
    fn from(value: LockError) -> Self {
        BiblioError::internal(value.to_string())
    }
}

/// Lock name for one entity, namespaced away from unrelated keys
pub fn lock_name(kind: &str, id: impl Display) -> String {
    format!("{}:{}:{}", LOCK_KEY_PREFIX, kind, id)
}

#[derive(Default)]
struct LockStatsCollector {
    total_acquisitions: AtomicU64,
    contended_attempts: AtomicU64,
    timed_out_acquisitions: AtomicU64,
    total_releases: AtomicU64,
    not_owner_releases: AtomicU64,
}

#[derive(Clone)]
pub struct LockCoordinator {
    store: Arc<dyn SharedStore>,
    defaults: LockOptions,
    stats: Arc<LockStatsCollector>,
}

impl LockCoordinator {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self::with_options(store, LockOptions::default())
    }

    pub fn with_options(store: Arc<dyn SharedStore>, defaults: LockOptions) -> Self {
        Self {
            store,
            defaults,
            stats: Arc::new(LockStatsCollector::default()),
        }
    }

    /// Options used when the caller does not override them
    pub fn default_options(&self) -> LockOptions {
        self.defaults
    }

    /// Try to take `name`, polling until `options.acquire_timeout` has elapsed.
    ///
    /// At least one attempt is always made. Sleeps are clipped to the remaining
    /// bound, so the call returns no later than one store round-trip after the
    /// bound.
    pub async fn acquire(
        &self,
        name: &str,
        options: &LockOptions,
    ) -> Result<Acquisition, LockError> {
        let token = LockToken::generate();
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let written = self
                .store
                .set_if_absent(name, token.as_str(), options.ttl)
                .await
                .map_err(LockError::Store)?;

            if written {
                self.stats.total_acquisitions.fetch_add(1, Ordering::Relaxed);
                counter!("lock_acquisitions_total").increment(1);
                debug!(lock = %name, attempts, "Lock acquired");
                return Ok(Acquisition::Acquired(token));
            }

            self.stats.contended_attempts.fetch_add(1, Ordering::Relaxed);
            counter!("lock_contended_attempts_total").increment(1);

            let elapsed = started.elapsed();
            if elapsed >= options.acquire_timeout {
                self.stats
                    .timed_out_acquisitions
                    .fetch_add(1, Ordering::Relaxed);
                counter!("lock_acquire_timeouts_total").increment(1);
                debug!(
                    lock = %name,
                    attempts,
                    waited_ms = elapsed.as_millis() as u64,
                    "Lock acquisition timed out"
                );
                return Ok(Acquisition::TimedOut {
                    waited: elapsed,
                    attempts,
                });
            }

            let remaining = options.acquire_timeout - elapsed;
            tokio::time::sleep(options.retry_interval.min(remaining)).await;
        }
    }

    /// Delete `name` only if it still holds `token`.
    ///
    /// Calling this for a lock that was never acquired, already expired, or was
    /// taken over by another attempt reports `NotOwner` and changes nothing.
    pub async fn release(
        &self,
        name: &str,
        token: &LockToken,
    ) -> Result<ReleaseOutcome, LockError> {
        let deleted = self
            .store
            .compare_and_delete(name, token.as_str())
            .await
            .map_err(LockError::Store)?;

        if deleted {
            self.stats.total_releases.fetch_add(1, Ordering::Relaxed);
            counter!("lock_releases_total").increment(1);
            debug!(lock = %name, "Lock released");
            Ok(ReleaseOutcome::Released)
        } else {
            self.stats.not_owner_releases.fetch_add(1, Ordering::Relaxed);
            counter!("lock_not_owner_releases_total").increment(1);
            Ok(ReleaseOutcome::NotOwner)
        }
    }

    /// Run `critical_section` while holding `name`.
    ///
    /// The section and the release run on their own task, so dropping the
    /// returned future after the lock is taken cancels neither. The lock is
    /// released whether the section returned a value, an `Err`, or panicked;
    /// a panic is resumed in the caller once the lock is gone. Release problems
    /// are logged and never replace the section's result.
    pub async fn with_lock<F, Fut, T>(
        &self,
        name: &str,
        options: &LockOptions,
        critical_section: F,
    ) -> Result<LockOutcome<T>, LockError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let token = match self.acquire(name, options).await? {
            Acquisition::Acquired(token) => token,
            Acquisition::TimedOut { waited, .. } => return Ok(LockOutcome::TimedOut { waited }),
        };

        let coordinator = self.clone();
        let name = name.to_string();
        let section = tokio::spawn(async move {
            let result = AssertUnwindSafe(critical_section()).catch_unwind().await;
            coordinator.release_quietly(&name, &token).await;
            result
        });

        match section.await {
            Ok(Ok(value)) => Ok(LockOutcome::Completed(value)),
            Ok(Err(panic)) => std::panic::resume_unwind(panic),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(LockError::Aborted),
        }
    }

    async fn release_quietly(&self, name: &str, token: &LockToken) {
        match self.release(name, token).await {
            Ok(ReleaseOutcome::Released) => {}
            Ok(ReleaseOutcome::NotOwner) => {
                warn!(
                    lock = %name,
                    "Lock was no longer owned at release; it expired before the critical section finished"
                );
            }
            Err(e) => {
                error!(lock = %name, error = %e, "Failed to release lock, it will expire on its own");
            }
        }
    }

    pub async fn ping(&self) -> Result<(), LockError> {
        self.store.ping().await.map_err(LockError::Store)
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            total_acquisitions: self.stats.total_acquisitions.load(Ordering::Relaxed),
            contended_attempts: self.stats.contended_attempts.load(Ordering::Relaxed),
            timed_out_acquisitions: self.stats.timed_out_acquisitions.load(Ordering::Relaxed),
            total_releases: self.stats.total_releases.load(Ordering::Relaxed),
            not_owner_releases: self.stats.not_owner_releases.load(Ordering::Relaxed),
        }
    }
}

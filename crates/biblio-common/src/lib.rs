//! Biblio Common - Shared types and constants
//!
//! This crate provides the foundational types used across all Biblio components:
//! - Error taxonomy and error codes
//! - Lock defaults and rating bounds

pub mod error;

pub use error::{BiblioError, ErrorCode};

/// Result alias used by the lending core
pub type Result<T> = std::result::Result<T, BiblioError>;

/// Default lock time-to-live in milliseconds
pub const DEFAULT_LOCK_TTL_MS: u64 = 30_000;

/// Default upper bound for lock acquisition in milliseconds
pub const DEFAULT_LOCK_ACQUIRE_TIMEOUT_MS: u64 = 10_000;

/// Default pause between lock acquisition attempts in milliseconds
pub const DEFAULT_LOCK_RETRY_INTERVAL_MS: u64 = 100;

/// Namespace for lock keys in the shared store
pub const LOCK_KEY_PREFIX: &str = "lock";

/// Lowest accepted rating on return
pub const MIN_RATING: f64 = 1.0;

/// Highest accepted rating on return
pub const MAX_RATING: f64 = 5.0;

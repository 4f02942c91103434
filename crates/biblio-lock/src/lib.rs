//! Biblio Lock - Token-fenced locks over a shared key-value store
//!
//! This crate provides:
//! - `LockCoordinator`: bounded, polling acquisition and owner-checked release
//! - `SharedStore`: the two atomic primitives the coordinator needs from a store
//! - `MemorySharedStore`: in-process backend (tests, single-node mode)
//! - `RedisSharedStore`: Redis backend (feature: `redis-backend`)

pub mod coordinator;
pub mod memory;
pub mod model;
pub mod store;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use coordinator::{LockCoordinator, LockError, lock_name};
pub use memory::MemorySharedStore;
pub use model::{Acquisition, LockOptions, LockOutcome, LockStats, LockToken, ReleaseOutcome};
pub use store::SharedStore;

#[cfg(feature = "redis-backend")]
pub use crate::redis::RedisSharedStore;

//! Freshness tracking and snapshot persistence for cached catalog data.
//!
//! This module is storefront-agnostic:
//! - `Freshness` decides whether a fetch stamp is still within its stale time
//! - `CacheStorage` persists whole entity lists so a new process starts warm
//! - `SqliteStorage` is the on-disk backend, `NoopStorage` disables persistence

mod freshness;
mod storage;
mod traits;

pub use freshness::Freshness;
pub use storage::{CacheStorage, CachedList, NoopStorage, SnapshotStorage, SqliteStorage};
pub use traits::{CacheSource, Cacheable};

//! Flavor persistence backends

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flavor_common::Result;

use crate::models::{Flavor, FlavorPatch};

/// Storage backend for flavor records.
///
/// Implementations must make `insert` an atomic insert-if-absent and `update`
/// an atomic read-modify-write of a single record.
#[async_trait]
pub trait FlavorStore: Send + Sync {
    /// Store a new flavor; fails with `Conflict` if the id is live
    async fn insert(&self, flavor: Flavor) -> Result<Flavor>;

    async fn get(&self, id: &str) -> Result<Option<Flavor>>;

    /// Apply `patch` to the stored flavor, returning the result.
    /// Returns `Ok(None)` if no flavor has this id.
    async fn update(&self, id: &str, patch: FlavorPatch, now: DateTime<Utc>)
        -> Result<Option<Flavor>>;

    /// Remove a flavor. Returns `Ok(false)` if no flavor has this id.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Live flavors in insertion order, optionally only those of one provider
    async fn list(&self, provider: Option<&str>) -> Result<Vec<Flavor>>;
}

//! In-process flavor storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use flavor_common::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::FlavorStore;
use crate::models::{Flavor, FlavorPatch};

struct Record {
    seq: u64,
    flavor: Flavor,
}

/// Sharded concurrent map of flavors.
///
/// The entry API locks only the shard holding the id, so creates and updates
/// of one id are serialized while other ids proceed in parallel.
#[derive(Default)]
pub struct MemoryStore {
    flavors: DashMap<String, Record>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlavorStore for MemoryStore {
    async fn insert(&self, flavor: Flavor) -> Result<Flavor> {
        match self.flavors.entry(flavor.id.clone()) {
            Entry::Occupied(_) => {
                debug!("Flavor already exists: {}", flavor.id);
                Err(Error::flavor_conflict(flavor.id))
            }
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Record {
                    seq,
                    flavor: flavor.clone(),
                });
                Ok(flavor)
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Flavor>> {
        Ok(self.flavors.get(id).map(|record| record.flavor.clone()))
    }

    async fn update(
        &self,
        id: &str,
        patch: FlavorPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Flavor>> {
        let Some(mut record) = self.flavors.get_mut(id) else {
            return Ok(None);
        };
        record.flavor.apply(patch, now);
        Ok(Some(record.flavor.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.flavors.remove(id).is_some())
    }

    async fn list(&self, provider: Option<&str>) -> Result<Vec<Flavor>> {
        let mut records: Vec<(u64, Flavor)> = self
            .flavors
            .iter()
            .filter(|record| provider.map_or(true, |p| record.flavor.provider == p))
            .map(|record| (record.seq, record.flavor.clone()))
            .collect();
        records.sort_by_key(|(seq, _)| *seq);
        Ok(records.into_iter().map(|(_, flavor)| flavor).collect())
    }
}

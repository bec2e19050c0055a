//! In-process provider storage

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use flavor_common::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use super::ProviderStore;
use crate::models::Provider;

/// In-process provider store
#[derive(Default)]
pub struct MemoryProviderStore {
    providers: DashMap<String, (u64, Provider)>,
    next_seq: AtomicU64,
}

impl MemoryProviderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderStore for MemoryProviderStore {
    async fn register(&self, provider: Provider) -> Result<Provider> {
        match self.providers.entry(provider.id.clone()) {
            Entry::Occupied(_) => Err(Error::Conflict {
                kind: "Provider",
                id: provider.id,
            }),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, provider.clone()));
                info!(
                    "Registered provider: {} ({})",
                    provider.id, provider.provider_type
                );
                Ok(provider)
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Provider>> {
        Ok(self.providers.get(id).map(|entry| entry.1.clone()))
    }

    async fn list(&self) -> Result<Vec<Provider>> {
        let mut providers: Vec<(u64, Provider)> = self
            .providers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        providers.sort_by_key(|(seq, _)| *seq);
        Ok(providers.into_iter().map(|(_, p)| p).collect())
    }
}

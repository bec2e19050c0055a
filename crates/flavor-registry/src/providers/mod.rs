//! Provider lookup used to pick default params

mod memory;
mod redis_store;

pub use self::memory::MemoryProviderStore;
pub use self::redis_store::RedisProviderStore;

use async_trait::async_trait;
use flavor_common::{Error, ProviderType, Result};
use tracing::info;

use crate::models::Provider;

/// Source of provider identity and type
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Register a provider; fails with `Conflict` if the id is taken
    async fn register(&self, provider: Provider) -> Result<Provider>;

    async fn get(&self, id: &str) -> Result<Option<Provider>>;

    /// All providers in registration order
    async fn list(&self) -> Result<Vec<Provider>>;
}

/// Register startup providers.
///
/// A provider that already exists with the same type is left alone, so a
/// persistent store can be seeded on every start. An existing provider with
/// a different type is an error.
pub async fn seed_providers(
    store: &dyn ProviderStore,
    seeds: &[(String, ProviderType)],
) -> Result<()> {
    for (id, provider_type) in seeds {
        match store
            .register(Provider::new(id.clone(), provider_type.clone()))
            .await
        {
            Ok(_) => {}
            Err(Error::Conflict { .. }) => {
                let existing = store.get(id).await?.ok_or_else(|| Error::NotFound {
                    kind: "Provider",
                    id: id.clone(),
                })?;
                if existing.provider_type != *provider_type {
                    return Err(Error::Validation(format!(
                        "provider {} is already registered as {}, not {}",
                        id, existing.provider_type, provider_type
                    )));
                }
                info!("Provider already registered: {}", id);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

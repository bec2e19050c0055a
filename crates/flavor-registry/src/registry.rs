//! Flavor lifecycle: create with provider defaults, merge updates, delete

use chrono::Utc;
use flavor_common::{Error, Params, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    defaults::ProviderDefaults,
    models::{validate_id, Flavor, FlavorPatch},
    providers::ProviderStore,
    storage::FlavorStore,
};

/// Owns flavor records and enforces the identity and merge rules
#[derive(Clone)]
pub struct FlavorRegistry {
    store: Arc<dyn FlavorStore>,
    providers: Arc<dyn ProviderStore>,
    defaults: Arc<ProviderDefaults>,
}

impl FlavorRegistry {
    pub fn new(
        store: Arc<dyn FlavorStore>,
        providers: Arc<dyn ProviderStore>,
        defaults: ProviderDefaults,
    ) -> Self {
        Self {
            store,
            providers,
            defaults: Arc::new(defaults),
        }
    }

    pub fn providers(&self) -> &Arc<dyn ProviderStore> {
        &self.providers
    }

    /// Create a flavor, filling params the caller left out from the
    /// provider type's defaults
    pub async fn create(
        &self,
        id: &str,
        provider_id: &str,
        params: Option<Params>,
        init: Option<Value>,
    ) -> Result<Flavor> {
        validate_id("flavor", id)?;

        let provider = self.providers.get(provider_id).await?.ok_or_else(|| {
            Error::InvalidReference(format!("provider does not exist: {}", provider_id))
        })?;

        let resolved = self
            .defaults
            .resolve(&provider.provider_type, params.unwrap_or_default())?;

        let flavor = Flavor::new(id.to_string(), provider.id, resolved, init);
        let created = self.store.insert(flavor).await?;

        info!(
            "Created flavor: {} (provider: {})",
            created.id, created.provider
        );
        Ok(created)
    }

    pub async fn get(&self, id: &str) -> Result<Flavor> {
        debug!("Looking up flavor: {}", id);
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::flavor_not_found(id))
    }

    /// Snapshot of live flavors in insertion order
    pub async fn list(&self, provider_id: Option<&str>) -> Result<Vec<Flavor>> {
        self.store.list(provider_id).await
    }

    /// Merge `params` into the flavor and replace `init` if given.
    ///
    /// A patch with neither still refreshes `updated_at`.
    pub async fn update(&self, id: &str, patch: FlavorPatch) -> Result<Flavor> {
        if patch.is_empty() {
            debug!("Empty update for flavor: {}", id);
        }

        let updated = self
            .store
            .update(id, patch, Utc::now())
            .await?
            .ok_or_else(|| Error::flavor_not_found(id))?;

        info!("Updated flavor: {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::flavor_not_found(id));
        }

        info!("Deleted flavor: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use crate::providers::MemoryProviderStore;
    use crate::storage::MemoryStore;
    use flavor_common::ProviderType;
    use serde_json::json;

    async fn test_registry() -> FlavorRegistry {
        let providers = MemoryProviderStore::new();
        providers
            .register(Provider::new("autotest".to_string(), ProviderType::Mock))
            .await
            .unwrap();
        providers
            .register(Provider::new(
                "custom".to_string(),
                ProviderType::Other("openstack".to_string()),
            ))
            .await
            .unwrap();

        FlavorRegistry::new(
            Arc::new(MemoryStore::new()),
            Arc::new(providers),
            ProviderDefaults::builtin(),
        )
    }

    fn params(value: Value) -> Option<Params> {
        Some(flavor_common::params_from_json(value).unwrap())
    }

    #[tokio::test]
    async fn test_create_fills_defaults() {
        let registry = test_registry().await;
        let flavor = registry
            .create("autotest", "autotest", params(json!({})), None)
            .await
            .unwrap();

        assert_eq!(flavor.params["region"].as_str(), Some("us-east-1"));
        assert_eq!(flavor.params["zone"].as_str(), Some("any"));
        assert_eq!(flavor.params["size"].as_str(), Some("m1.medium"));
        assert!(!flavor.params["image"].to_string().is_empty());
        assert_eq!(flavor.init, json!({}));
    }

    #[tokio::test]
    async fn test_create_roundtrip() {
        let registry = test_registry().await;
        let created = registry
            .create(
                "autotest",
                "autotest",
                params(json!({"region": "us-west-2", "size": "t1.micro"})),
                Some(json!({"ssh_authorized_keys": ["ssh-rsa aaaaaaaaa"]})),
            )
            .await
            .unwrap();

        let fetched = registry.get("autotest").await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.params["region"].as_str(), Some("us-west-2"));
        assert_eq!(fetched.params["zone"].as_str(), Some("any"));
        assert_eq!(fetched.params["size"].as_str(), Some("t1.micro"));
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let registry = test_registry().await;
        registry.create("f", "autotest", None, None).await.unwrap();

        let err = registry.create("f", "autotest", None, None).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_unknown_provider() {
        let registry = test_registry().await;
        let err = registry.create("f", "nobody", None, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidReference(_)));
        assert!(registry.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_provider_type_without_defaults() {
        let registry = test_registry().await;
        let err = registry.create("f", "custom", None, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_invalid_id() {
        let registry = test_registry().await;
        let err = registry.create("", "autotest", None, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_merges_params() {
        let registry = test_registry().await;
        registry
            .create(
                "autotest",
                "autotest",
                params(json!({"region": "us-west-2", "size": "t1.micro"})),
                None,
            )
            .await
            .unwrap();

        let updated = registry
            .update(
                "autotest",
                FlavorPatch {
                    params: params(json!({"size": "c1.xlarge", "image": "ami-c98d1bf9"})),
                    init: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.params["region"].as_str(), Some("us-west-2"));
        assert_eq!(updated.params["zone"].as_str(), Some("any"));
        assert_eq!(updated.params["size"].as_str(), Some("c1.xlarge"));
        assert_eq!(updated.params["image"].as_str(), Some("ami-c98d1bf9"));
        assert_eq!(registry.get("autotest").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_replaces_init() {
        let registry = test_registry().await;
        registry
            .create("f", "autotest", None, Some(json!({"a": 1, "b": 2})))
            .await
            .unwrap();

        registry
            .update(
                "f",
                FlavorPatch {
                    params: None,
                    init: Some(json!({"c": 3})),
                },
            )
            .await
            .unwrap();

        assert_eq!(registry.get("f").await.unwrap().init, json!({"c": 3}));
    }

    #[tokio::test]
    async fn test_empty_update_refreshes_timestamp() {
        let registry = test_registry().await;
        let created = registry.create("f", "autotest", None, None).await.unwrap();

        let updated = registry.update("f", FlavorPatch::default()).await.unwrap();
        assert_eq!(updated.params, created.params);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_deleted_flavor_is_gone() {
        let registry = test_registry().await;
        registry.create("f", "autotest", None, None).await.unwrap();
        registry.delete("f").await.unwrap();

        assert!(matches!(
            registry.get("f").await.unwrap_err(),
            Error::NotFound { .. }
        ));
        assert!(matches!(
            registry.update("f", FlavorPatch::default()).await.unwrap_err(),
            Error::NotFound { .. }
        ));
        assert!(matches!(
            registry.delete("f").await.unwrap_err(),
            Error::NotFound { .. }
        ));

        // The id is free again
        registry.create("f", "autotest", None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_after_delete() {
        let registry = test_registry().await;
        for id in ["a", "b", "c", "d"] {
            registry.create(id, "autotest", None, None).await.unwrap();
        }
        registry.delete("b").await.unwrap();

        let ids: Vec<String> = registry
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec!["a", "c", "d"]);

        assert_eq!(registry.list(Some("autotest")).await.unwrap().len(), 3);
        assert!(registry.list(Some("custom")).await.unwrap().is_empty());
    }
}

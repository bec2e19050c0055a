//! Flavor Registry Service
//!
//! REST API for managing providers and their deployment flavors

use anyhow::{Context, Result};
use flavor_registry::{
    create_router, seed_providers, AppState, Config, FlavorRegistry, FlavorStore,
    MemoryProviderStore, MemoryStore, ProviderDefaults, ProviderStore, RedisProviderStore,
    RedisStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flavor_registry=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Flavor Registry Service");

    let config = Config::from_env().context("Failed to load configuration")?;

    // Provider defaults
    let mut defaults = ProviderDefaults::builtin();
    if let Some(path) = &config.defaults_file {
        let overrides = ProviderDefaults::from_json_file(path)?;
        defaults = defaults.merged_with(overrides);
        info!("Loaded provider defaults from {}", path.display());
    }

    // Flavor and provider storage
    let (store, providers): (Arc<dyn FlavorStore>, Arc<dyn ProviderStore>) =
        match &config.redis_url {
            Some(redis_url) => {
                info!("Redis URL: {}", redis_url);
                let store: Arc<dyn FlavorStore> = Arc::new(
                    RedisStore::new(redis_url)
                        .await
                        .context("Failed to initialize storage")?,
                );
                let providers: Arc<dyn ProviderStore> = Arc::new(
                    RedisProviderStore::new(redis_url)
                        .await
                        .context("Failed to initialize provider storage")?,
                );
                (store, providers)
            }
            None => {
                info!("REDIS_URL not set, keeping flavors and providers in memory");
                let store: Arc<dyn FlavorStore> = Arc::new(MemoryStore::new());
                let providers: Arc<dyn ProviderStore> = Arc::new(MemoryProviderStore::new());
                (store, providers)
            }
        };

    // Seed providers
    seed_providers(providers.as_ref(), &config.providers)
        .await
        .context("Failed to register providers")?;

    let state = AppState {
        registry: FlavorRegistry::new(store, providers, defaults),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Flavor Registry Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

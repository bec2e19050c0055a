//! Flavor Registry Service
//!
//! Stores named, provider-scoped bundles of deployment parameters ("flavors").
//! Params omitted at creation are filled from per-provider-type defaults;
//! updates merge params shallowly and replace the init document.
//!
//! ## Endpoints
//!
//! - `POST /api/providers` - Register a provider
//! - `GET /api/providers` - List providers
//! - `GET /api/providers/{id}` - Get a provider
//! - `POST /api/flavors` - Create a flavor
//! - `GET /api/flavors?provider=ID` - List flavors
//! - `GET /api/flavors/{id}` - Get a flavor
//! - `PATCH /api/flavors/{id}` - Update a flavor
//! - `DELETE /api/flavors/{id}` - Delete a flavor
//! - `GET /health` - Health check

pub mod config;
pub mod defaults;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod registry;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use defaults::ProviderDefaults;
pub use handlers::AppState;
pub use models::{Flavor, FlavorPatch, Provider};
pub use providers::{seed_providers, MemoryProviderStore, ProviderStore, RedisProviderStore};
pub use registry::FlavorRegistry;
pub use storage::{FlavorStore, MemoryStore, RedisStore};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/api/providers",
            post(handlers::register_provider_handler).get(handlers::list_providers_handler),
        )
        .route("/api/providers/{id}", get(handlers::get_provider_handler))
        .route(
            "/api/flavors",
            post(handlers::create_flavor_handler).get(handlers::list_flavors_handler),
        )
        .route(
            "/api/flavors/{id}",
            get(handlers::get_flavor_handler)
                .patch(handlers::update_flavor_handler)
                .delete(handlers::delete_flavor_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

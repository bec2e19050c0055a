//! API request handlers for the Flavor Registry

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flavor_common::{params_from_json, Error, ProviderType};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    models::{
        init_from_json, validate_id, CreateFlavorRequest, Flavor, FlavorListResponse,
        FlavorPatch, ListFlavorsQuery, Provider, ProviderListResponse, RegisterProviderRequest,
        UpdateFlavorRequest,
    },
    registry::FlavorRegistry,
};

/// Shared application state
pub struct AppState {
    pub registry: FlavorRegistry,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::InvalidReference(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::JsonSerialization(_) | Error::Redis(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", err);
        } else {
            warn!("Request rejected: {}", err);
        }

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "flavor-registry"
    }))
}

/// Register a provider
pub async fn register_provider_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterProviderRequest>,
) -> Result<(StatusCode, Json<Provider>), ApiError> {
    info!("Registering provider: {}", payload.id);

    validate_id("provider", &payload.id)?;
    let provider_type: ProviderType = payload
        .provider_type
        .parse()
        .map_err(ApiError::bad_request)?;

    let provider = state
        .registry
        .providers()
        .register(Provider::new(payload.id, provider_type))
        .await?;

    Ok((StatusCode::CREATED, Json(provider)))
}

/// List all providers
pub async fn list_providers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProviderListResponse>, ApiError> {
    let results = state.registry.providers().list().await?;

    Ok(Json(ProviderListResponse {
        count: results.len(),
        results,
    }))
}

/// Get provider by ID
pub async fn get_provider_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Provider>, ApiError> {
    let provider = state.registry.providers().get(&id).await?;

    provider.map(Json).ok_or_else(|| {
        Error::NotFound {
            kind: "Provider",
            id,
        }
        .into()
    })
}

/// Create a new flavor
pub async fn create_flavor_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateFlavorRequest>,
) -> Result<(StatusCode, Json<Flavor>), ApiError> {
    info!("Creating flavor: {}", payload.id);

    let params = payload.params.map(params_from_json).transpose()?;
    let init = payload.init.map(init_from_json);

    let flavor = state
        .registry
        .create(&payload.id, &payload.provider, params, init)
        .await?;

    Ok((StatusCode::CREATED, Json(flavor)))
}

/// List flavors, optionally for one provider
pub async fn list_flavors_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListFlavorsQuery>,
) -> Result<Json<FlavorListResponse>, ApiError> {
    let results = state.registry.list(query.provider.as_deref()).await?;

    Ok(Json(FlavorListResponse {
        count: results.len(),
        results,
    }))
}

/// Get flavor by ID
pub async fn get_flavor_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Flavor>, ApiError> {
    Ok(Json(state.registry.get(&id).await?))
}

/// Partially update a flavor
pub async fn update_flavor_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFlavorRequest>,
) -> Result<Json<Flavor>, ApiError> {
    info!("Updating flavor: {}", id);

    if let Some(body_id) = &payload.id {
        if *body_id != id {
            return Err(ApiError::bad_request(format!(
                "flavor id cannot be changed: {} != {}",
                body_id, id
            )));
        }
    }

    if let Some(provider) = &payload.provider {
        let current = state.registry.get(&id).await?;
        if *provider != current.provider {
            return Err(ApiError::bad_request(format!(
                "flavor provider cannot be changed: {} != {}",
                provider, current.provider
            )));
        }
    }

    let patch = FlavorPatch {
        params: payload.params.map(params_from_json).transpose()?,
        init: payload.init.map(init_from_json),
    };

    Ok(Json(state.registry.update(&id, patch).await?))
}

/// Delete a flavor
pub async fn delete_flavor_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!("Deleting flavor: {}", id);

    state.registry.delete(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

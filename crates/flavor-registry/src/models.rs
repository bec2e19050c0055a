//! Data models for the Flavor Registry

use chrono::{DateTime, Utc};
use flavor_common::{Error, Params, ProviderType, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest accepted flavor or provider id
pub const MAX_ID_LEN: usize = 128;

/// A provider-scoped bundle of deployment parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    /// Caller-assigned identifier
    pub id: String,

    /// Provider this flavor deploys to
    pub provider: String,

    /// Resolved deployment parameters
    pub params: Params,

    /// Initialization directives (cloud-init style document)
    pub init: Value,

    /// When this flavor was created
    pub created_at: DateTime<Utc>,

    /// When this flavor was last modified
    pub updated_at: DateTime<Utc>,
}

impl Flavor {
    /// Create a new flavor record stamped with the current time
    pub fn new(id: String, provider: String, params: Params, init: Option<Value>) -> Self {
        let now = Utc::now();
        Self {
            id,
            provider,
            params,
            init: init.unwrap_or_else(empty_init),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, patch: FlavorPatch, now: DateTime<Utc>) {
        if let Some(params) = patch.params {
            flavor_common::merge_params(&mut self.params, params);
        }
        if let Some(init) = patch.init {
            self.init = init;
        }
        self.updated_at = now;
    }
}

/// Partial update to a flavor: `params` merges, `init` replaces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlavorPatch {
    pub params: Option<Params>,
    pub init: Option<Value>,
}

impl FlavorPatch {
    pub fn is_empty(&self) -> bool {
        self.params.is_none() && self.init.is_none()
    }
}

/// Infrastructure account that flavors deploy to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,

    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    pub created_at: DateTime<Utc>,
}

impl Provider {
    pub fn new(id: String, provider_type: ProviderType) -> Self {
        Self {
            id,
            provider_type,
            created_at: Utc::now(),
        }
    }
}

/// The document stored when a flavor is created without `init`
pub fn empty_init() -> Value {
    Value::Object(Default::default())
}

/// Decode an init document.
///
/// Native JSON is taken as-is. A string holding a JSON object or array is
/// decoded; any other string (a YAML block, say) is kept verbatim.
pub fn init_from_json(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(doc @ (Value::Object(_) | Value::Array(_))) => doc,
            _ => Value::String(text),
        },
        other => other,
    }
}

/// Check that an identifier is usable as a path segment and storage key
pub fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::Validation(format!("{} id must not be empty", kind)));
    }
    if id.chars().count() > MAX_ID_LEN {
        return Err(Error::Validation(format!(
            "{} id must be at most {} characters",
            kind, MAX_ID_LEN
        )));
    }
    if id.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(Error::Validation(format!(
            "{} id must not contain whitespace or '/': {}",
            kind, id
        )));
    }
    Ok(())
}

/// Request to create a new flavor
#[derive(Debug, Deserialize)]
pub struct CreateFlavorRequest {
    pub id: String,
    pub provider: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub init: Option<Value>,
}

/// Request to partially update a flavor
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFlavorRequest {
    /// Optional echo of the path id; must match when present
    #[serde(default)]
    pub id: Option<String>,
    /// Optional echo of the provider; must match when present
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub init: Option<Value>,
}

/// Query parameters for listing flavors
#[derive(Debug, Default, Deserialize)]
pub struct ListFlavorsQuery {
    pub provider: Option<String>,
}

/// Paged list of flavors
#[derive(Debug, Serialize)]
pub struct FlavorListResponse {
    pub count: usize,
    pub results: Vec<Flavor>,
}

/// Request to register a provider.
///
/// Unknown fields such as `creds` are ignored; credentials are not kept.
#[derive(Debug, Deserialize)]
pub struct RegisterProviderRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub provider_type: String,
}

/// List of providers
#[derive(Debug, Serialize)]
pub struct ProviderListResponse {
    pub count: usize,
    pub results: Vec<Provider>,
}

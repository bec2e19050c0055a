//! Redis storage for providers
//!
//! Layout under a namespace `ns`:
//! - `ns:provider:<id>` hash with `type` and `created_at`
//! - `ns:providers:order` list of ids in registration order

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flavor_common::{Error, ProviderType, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use tracing::{debug, info};

use super::ProviderStore;
use crate::models::Provider;

const REGISTER_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1], 'type', ARGV[2], 'created_at', ARGV[3])
redis.call('RPUSH', KEYS[2], ARGV[1])
return 1
";

/// Storage backend for providers in Redis
pub struct RedisProviderStore {
    conn: ConnectionManager,
    namespace: String,
    register_script: Script,
}

impl RedisProviderStore {
    /// Connect with the default `registry` namespace
    pub async fn new(redis_url: &str) -> anyhow::Result<Self> {
        Self::with_namespace(redis_url, "registry").await
    }

    /// Connect, keeping all keys under `namespace`
    pub async fn with_namespace(redis_url: &str, namespace: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Provider store connected to Redis at {}", redis_url);

        Ok(Self {
            conn,
            namespace: namespace.to_string(),
            register_script: Script::new(REGISTER_SCRIPT),
        })
    }

    fn provider_key(&self, id: &str) -> String {
        format!("{}:provider:{}", self.namespace, id)
    }

    fn order_key(&self) -> String {
        format!("{}:providers:order", self.namespace)
    }
}

fn redis_err(err: redis::RedisError) -> Error {
    Error::Redis(err.to_string())
}

/// Rebuild a provider from its hash; `None` when the record is gone
fn decode_provider(id: &str, fields: HashMap<String, String>) -> Result<Option<Provider>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let provider_type: ProviderType = fields
        .get("type")
        .ok_or_else(|| Error::Redis(format!("provider {} missing type", id)))?
        .parse()
        .map_err(Error::Redis)?;

    let raw = fields
        .get("created_at")
        .ok_or_else(|| Error::Redis(format!("provider {} missing created_at", id)))?;
    let created_at = DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Redis(format!("bad 'created_at' timestamp {}: {}", raw, e)))?;

    Ok(Some(Provider {
        id: id.to_string(),
        provider_type,
        created_at,
    }))
}

#[async_trait]
impl ProviderStore for RedisProviderStore {
    async fn register(&self, provider: Provider) -> Result<Provider> {
        let mut conn = self.conn.clone();

        let created: bool = self
            .register_script
            .key(self.provider_key(&provider.id))
            .key(self.order_key())
            .arg(&provider.id)
            .arg(provider.provider_type.as_str())
            .arg(provider.created_at.to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;

        if !created {
            debug!("Provider already exists: {}", provider.id);
            return Err(Error::Conflict {
                kind: "Provider",
                id: provider.id,
            });
        }

        info!(
            "Registered provider: {} ({})",
            provider.id, provider.provider_type
        );
        Ok(provider)
    }

    async fn get(&self, id: &str) -> Result<Option<Provider>> {
        let mut conn = self.conn.clone();

        let fields: HashMap<String, String> = conn
            .hgetall(self.provider_key(id))
            .await
            .map_err(redis_err)?;

        decode_provider(id, fields)
    }

    async fn list(&self) -> Result<Vec<Provider>> {
        let mut conn = self.conn.clone();

        let ids: Vec<String> = conn
            .lrange(self.order_key(), 0, -1)
            .await
            .map_err(redis_err)?;

        let mut providers = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(provider) = self.get(&id).await? {
                providers.push(provider);
            }
        }

        Ok(providers)
    }
}

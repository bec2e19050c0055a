//! Redis storage for flavors
//!
//! Layout under a namespace `ns`:
//! - `ns:flavor:meta:<id>` hash with `provider`, `init`, `created_at`, `updated_at`
//! - `ns:flavor:params:<id>` hash of param name to JSON-encoded value
//! - `ns:flavors:order` list of ids in insertion order
//!
//! Writes run as Lua scripts so each one is atomic on the server.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flavor_common::{Error, ParamValue, Params, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use tracing::{debug, info};

use super::FlavorStore;
use crate::models::{Flavor, FlavorPatch};

const INSERT_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1], 'provider', ARGV[2], 'init', ARGV[3], 'created_at', ARGV[4], 'updated_at', ARGV[5])
redis.call('DEL', KEYS[2])
for i = 6, #ARGV, 2 do
  redis.call('HSET', KEYS[2], ARGV[i], ARGV[i + 1])
end
redis.call('RPUSH', KEYS[3], ARGV[1])
return 1
";

const UPDATE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return false
end
redis.call('HSET', KEYS[1], 'updated_at', ARGV[1])
if ARGV[2] == '1' then
  redis.call('HSET', KEYS[1], 'init', ARGV[3])
end
for i = 4, #ARGV, 2 do
  redis.call('HSET', KEYS[2], ARGV[i], ARGV[i + 1])
end
return {redis.call('HGETALL', KEYS[1]), redis.call('HGETALL', KEYS[2])}
";

const DELETE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
redis.call('DEL', KEYS[1], KEYS[2])
redis.call('LREM', KEYS[3], 0, ARGV[1])
return 1
";

type RawRecord = (HashMap<String, String>, HashMap<String, String>);

/// Storage backend for flavors in Redis
pub struct RedisStore {
    conn: ConnectionManager,
    namespace: String,
    insert_script: Script,
    update_script: Script,
    delete_script: Script,
}

impl RedisStore {
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

        info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            conn,
            namespace: namespace.to_string(),
            insert_script: Script::new(INSERT_SCRIPT),
            update_script: Script::new(UPDATE_SCRIPT),
            delete_script: Script::new(DELETE_SCRIPT),
        })
    }

    fn meta_key(&self, id: &str) -> String {
        format!("{}:flavor:meta:{}", self.namespace, id)
    }

    fn params_key(&self, id: &str) -> String {
        format!("{}:flavor:params:{}", self.namespace, id)
    }

    fn order_key(&self) -> String {
        format!("{}:flavors:order", self.namespace)
    }
}

fn redis_err(err: redis::RedisError) -> Error {
    Error::Redis(err.to_string())
}

fn encode_params(params: &Params) -> Result<Vec<(String, String)>> {
    params
        .iter()
        .map(|(key, value)| Ok((key.clone(), serde_json::to_string(value)?)))
        .collect()
}

fn parse_timestamp(meta: &HashMap<String, String>, field: &str) -> Result<DateTime<Utc>> {
    let raw = meta
        .get(field)
        .ok_or_else(|| Error::Redis(format!("flavor record missing '{}'", field)))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Redis(format!("bad '{}' timestamp {}: {}", field, raw, e)))
}

/// Rebuild a flavor from its two hashes; `None` when the record is gone
fn decode_record(id: &str, (meta, params): RawRecord) -> Result<Option<Flavor>> {
    if meta.is_empty() {
        return Ok(None);
    }

    let provider = meta
        .get("provider")
        .cloned()
        .ok_or_else(|| Error::Redis(format!("flavor {} missing provider", id)))?;
    let init = match meta.get("init") {
        Some(raw) => serde_json::from_str(raw)?,
        None => crate::models::empty_init(),
    };

    let mut decoded = Params::new();
    for (key, raw) in params {
        let value: ParamValue = serde_json::from_str(&raw)?;
        decoded.insert(key, value);
    }

    Ok(Some(Flavor {
        id: id.to_string(),
        provider,
        params: decoded,
        init,
        created_at: parse_timestamp(&meta, "created_at")?,
        updated_at: parse_timestamp(&meta, "updated_at")?,
    }))
}

#[async_trait]
impl FlavorStore for RedisStore {
    async fn insert(&self, flavor: Flavor) -> Result<Flavor> {
        let mut conn = self.conn.clone();

        let mut invocation = self.insert_script.prepare_invoke();
        invocation
            .key(self.meta_key(&flavor.id))
            .key(self.params_key(&flavor.id))
            .key(self.order_key())
            .arg(&flavor.id)
            .arg(&flavor.provider)
            .arg(serde_json::to_string(&flavor.init)?)
            .arg(flavor.created_at.to_rfc3339())
            .arg(flavor.updated_at.to_rfc3339());
        for (key, value) in encode_params(&flavor.params)? {
            invocation.arg(key).arg(value);
        }

        let created: bool = invocation.invoke_async(&mut conn).await.map_err(redis_err)?;
        if !created {
            debug!("Flavor already exists: {}", flavor.id);
            return Err(Error::flavor_conflict(flavor.id));
        }

        Ok(flavor)
    }

    async fn get(&self, id: &str) -> Result<Option<Flavor>> {
        let mut conn = self.conn.clone();

        let raw: RawRecord = redis::pipe()
            .atomic()
            .hgetall(self.meta_key(id))
            .hgetall(self.params_key(id))
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;

        decode_record(id, raw)
    }

    async fn update(
        &self,
        id: &str,
        patch: FlavorPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Flavor>> {
        let mut conn = self.conn.clone();

        let mut invocation = self.update_script.prepare_invoke();
        invocation
            .key(self.meta_key(id))
            .key(self.params_key(id))
            .arg(now.to_rfc3339());
        match &patch.init {
            Some(init) => invocation.arg("1").arg(serde_json::to_string(init)?),
            None => invocation.arg("0").arg(""),
        };
        if let Some(params) = &patch.params {
            for (key, value) in encode_params(params)? {
                invocation.arg(key).arg(value);
            }
        }

        let raw: Option<RawRecord> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;
        match raw {
            Some(raw) => decode_record(id, raw),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();

        let deleted: bool = self
            .delete_script
            .key(self.meta_key(id))
            .key(self.params_key(id))
            .key(self.order_key())
            .arg(id)
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;

        Ok(deleted)
    }

    async fn list(&self, provider: Option<&str>) -> Result<Vec<Flavor>> {
        let mut conn = self.conn.clone();

        let ids: Vec<String> = conn
            .lrange(self.order_key(), 0, -1)
            .await
            .map_err(redis_err)?;

        let mut flavors = Vec::with_capacity(ids.len());
        for id in ids {
            // Deleted between LRANGE and the read
            let Some(flavor) = self.get(&id).await? else {
                continue;
            };
            if provider.map_or(true, |p| flavor.provider == p) {
                flavors.push(flavor);
            }
        }

        Ok(flavors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn get_test_store(namespace: &str) -> RedisStore {
        RedisStore::with_namespace("redis://127.0.0.1:6379/15", namespace)
            .await
            .expect("Failed to connect to test Redis")
    }

    fn flavor(id: &str, provider: &str) -> Flavor {
        let params = flavor_common::params_from_json(json!({
            "region": "us-west-2",
            "size": "t1.micro",
            "count": 2
        }))
        .unwrap();
        Flavor::new(
            id.to_string(),
            provider.to_string(),
            params,
            Some(json!({"ssh_authorized_keys": []})),
        )
    }

    #[test]
    fn test_decode_empty_record() {
        let decoded = decode_record("x", (HashMap::new(), HashMap::new())).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_decode_record() {
        let now = Utc::now().to_rfc3339();
        let meta = HashMap::from([
            ("provider".to_string(), "autotest".to_string()),
            ("init".to_string(), "{\"a\":[]}".to_string()),
            ("created_at".to_string(), now.clone()),
            ("updated_at".to_string(), now),
        ]);
        let params = HashMap::from([
            ("region".to_string(), "\"us-east-1\"".to_string()),
            ("count".to_string(), "3".to_string()),
        ]);

        let flavor = decode_record("f1", (meta, params)).unwrap().unwrap();
        assert_eq!(flavor.provider, "autotest");
        assert_eq!(flavor.init, json!({"a": []}));
        assert_eq!(flavor.params["region"].as_str(), Some("us-east-1"));
        assert_eq!(flavor.params["count"], ParamValue::Integer(3));
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_insert_get_and_delete() {
        let store = get_test_store("test-crud").await;
        let _ = store.delete("redis-f1").await;

        let original = flavor("redis-f1", "autotest");
        store.insert(original.clone()).await.unwrap();

        let retrieved = store.get("redis-f1").await.unwrap().expect("Flavor not found");
        assert_eq!(retrieved.params, original.params);
        assert_eq!(retrieved.init, original.init);

        let err = store.insert(flavor("redis-f1", "other")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        assert!(store.delete("redis-f1").await.unwrap());
        assert!(store.get("redis-f1").await.unwrap().is_none());
        assert!(!store.delete("redis-f1").await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_update_merges_params() {
        let store = get_test_store("test-update").await;
        let _ = store.delete("redis-f2").await;
        store.insert(flavor("redis-f2", "autotest")).await.unwrap();

        let patch = FlavorPatch {
            params: Some(flavor_common::params_from_json(json!({"size": "c1.xlarge"})).unwrap()),
            init: Some(json!({"hostname": "node"})),
        };
        let updated = store
            .update("redis-f2", patch, Utc::now())
            .await
            .unwrap()
            .expect("Flavor not found");

        assert_eq!(updated.params["region"].as_str(), Some("us-west-2"));
        assert_eq!(updated.params["size"].as_str(), Some("c1.xlarge"));
        assert_eq!(updated.init, json!({"hostname": "node"}));

        assert!(store
            .update("missing", FlavorPatch::default(), Utc::now())
            .await
            .unwrap()
            .is_none());

        store.delete("redis-f2").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_list_order() {
        let store = get_test_store("test-list").await;
        for id in ["l1", "l2", "l3"] {
            let _ = store.delete(id).await;
        }

        store.insert(flavor("l1", "a")).await.unwrap();
        store.insert(flavor("l2", "b")).await.unwrap();
        store.insert(flavor("l3", "a")).await.unwrap();

        let ids: Vec<String> = store
            .list(Some("a"))
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec!["l1", "l3"]);

        for id in ["l1", "l2", "l3"] {
            store.delete(id).await.unwrap();
        }
    }
}

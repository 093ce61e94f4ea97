//! Key-value counter store on top of Redis.
//!
//! Every identifier lives under its own key, `<name>::<identifier>`, so
//! several logical stores can share one Redis database. Counting is a single
//! `INCR`; listing is `KEYS <name>::*` followed by one `MGET`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::ConnectionInfo;
use std::sync::Arc;
use tracing::info;

use crate::error::{Result, StoreError};
use crate::store::{CounterStore, RobotInfo, Stores};

/// Separator between the store name and the identifier in a key.
pub const KEY_SEPARATOR: &str = "::";

/// A value as returned by the key-value service.
///
/// Counts may come back either as native integers or as their decimal
/// string form, depending on the command and the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvValue {
    Int(i64),
    Text(String),
    Nil,
    /// Any other reply shape, kept only for error messages.
    Other(String),
}

impl From<redis::Value> for KvValue {
    fn from(value: redis::Value) -> Self {
        match value {
            redis::Value::Int(n) => KvValue::Int(n),
            redis::Value::BulkString(bytes) => match String::from_utf8(bytes) {
                Ok(text) => KvValue::Text(text),
                Err(err) => KvValue::Other(format!("{:?}", err.into_bytes())),
            },
            redis::Value::SimpleString(text) => KvValue::Text(text),
            redis::Value::Nil => KvValue::Nil,
            other => KvValue::Other(format!("{other:?}")),
        }
    }
}

/// The handful of commands the store needs from a key-value service.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Atomically add one to `key`, creating it at 1. Returns the new value.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// All keys matching a glob `pattern`.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Values for `keys`, in the same order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<KvValue>>;
}

#[async_trait]
impl KvClient for ConnectionManager {
    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.clone();
        let value: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.clone();
        let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
        Ok(keys)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<KvValue>> {
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        let mut conn = self.clone();
        let values: Vec<redis::Value> = cmd.query_async(&mut conn).await?;
        Ok(values.into_iter().map(KvValue::from).collect())
    }
}

/// Connect to the Redis server at `url`.
///
/// Password and database index are taken from the URL.
pub async fn open_redis(url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(url)?;
    let address = describe(client.get_connection_info());
    let manager = ConnectionManager::new(client).await?;
    info!("Connected to Redis at {}", address);
    Ok(manager)
}

/// Address and database of a connection, without credentials.
fn describe(info: &ConnectionInfo) -> String {
    format!("{}/{}", info.addr, info.redis.db)
}

/// Read a stored count back as a non-negative integer.
pub fn parse_count(value: &KvValue) -> Result<u64> {
    let parsed = match value {
        KvValue::Int(n) => u64::try_from(*n).ok(),
        KvValue::Text(text) => text.parse::<u64>().ok(),
        KvValue::Nil | KvValue::Other(_) => None,
    };
    parsed.ok_or_else(|| StoreError::Decode("non-integer 'seen' count".to_string()))
}

/// Key-value implementation of CounterStore.
pub struct RedisStore<C = ConnectionManager> {
    client: Arc<C>,
    prefix: String,
}

impl<C: KvClient> RedisStore<C> {
    /// Create a store named `name` on a (possibly shared) client.
    ///
    /// The name becomes the key prefix, so it must not contain glob
    /// metacharacters.
    pub fn new(client: Arc<C>, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['*', '?', '[', ']', '\\']) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(Self {
            client,
            prefix: format!("{name}{KEY_SEPARATOR}"),
        })
    }

    fn key(&self, identifier: &str) -> String {
        format!("{}{}", self.prefix, identifier)
    }
}

#[async_trait]
impl<C: KvClient> CounterStore for RedisStore<C> {
    async fn count(&self, identifier: &str) -> Result<()> {
        self.client.incr(&self.key(identifier)).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RobotInfo>> {
        let keys = self.client.keys(&self.key("*")).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values = self.client.mget(&keys).await?;
        if values.len() != keys.len() {
            return Err(StoreError::Decode(format!(
                "expected {} counts, got {}",
                keys.len(),
                values.len()
            )));
        }

        keys.iter()
            .zip(&values)
            .map(|(key, value)| {
                let user_agent = key.strip_prefix(&self.prefix).unwrap_or(key);
                Ok(RobotInfo::new(user_agent, parse_count(value)?))
            })
            .collect()
    }
}

impl Stores {
    /// "robots" and "cheaters" sharing one key-value client.
    pub fn redis<C: KvClient + 'static>(client: C) -> Result<Self> {
        let client = Arc::new(client);
        Ok(Self::new(
            Arc::new(RedisStore::new(Arc::clone(&client), "robots")?),
            Arc::new(RedisStore::new(client, "cheaters")?),
        ))
    }
}

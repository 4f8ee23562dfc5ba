use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use tokio::sync::RwLock;

use crate::error::Result;

/// A value read from the substrate together with its version.
///
/// Versions start at 1 on the first write and increase by one on every
/// successful swap.
#[derive(Debug, Clone)]
pub struct Versioned {
    /// The stored bytes.
    pub bytes: Vec<u8>,
    /// The version the bytes were read at.
    pub version: u64,
}

/// The key-value substrate user aggregates are persisted in.
///
/// The substrate only promises per-key read-after-write consistency, so
/// callers that need read-modify-write atomicity must drive it through
/// `put_if_version` in a retry loop.
#[async_trait]
pub trait KeyValue: Send + Sync {
    /// Reads the value stored at `key`, with its current version.
    async fn get(&self, key: &str) -> Result<Option<Versioned>>;

    /// Writes `bytes` at `key` only if the key's version still equals
    /// `expected`. An `expected` of 0 means the key must be absent.
    ///
    /// Returns `false` without writing when the version has moved.
    async fn put_if_version(&self, key: &str, bytes: Vec<u8>, expected: u64) -> Result<bool>;
}

/// Compare-and-swap over a value key (KEYS[1]) and its companion version
/// key (KEYS[2]). ARGV[1] is the expected version, 0 when the key must be
/// absent; ARGV[2] is the new value. Returns 1 when the swap landed.
const CAS_SCRIPT: &str = r#"
local ver = tonumber(redis.call('GET', KEYS[2]) or '0')
if ver == tonumber(ARGV[1]) then
    redis.call('SET', KEYS[1], ARGV[2])
    redis.call('SET', KEYS[2], tostring(ver + 1))
    return 1
end
return 0
"#;

/// The substrate key tracking a value key's version.
fn version_key(key: &str) -> String {
    format!("{}:ver", key)
}

/// The Redis-backed substrate used in production.
pub struct RedisKv {
    conn: ConnectionManager,
    cas: Script,
}

impl RedisKv {
    /// Connects to the Redis server at `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL of the Redis server.
    ///
    /// # Returns
    ///
    /// A `Result` containing the connected `RedisKv`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            cas: Script::new(CAS_SCRIPT),
        })
    }
}

#[async_trait]
impl KeyValue for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        let mut conn = self.conn.clone();
        // MGET reads value and version in one atomic command
        let (bytes, version): (Option<Vec<u8>>, Option<u64>) = redis::cmd("MGET")
            .arg(key)
            .arg(version_key(key))
            .query_async(&mut conn)
            .await?;

        Ok(bytes.map(|bytes| Versioned {
            bytes,
            version: version.unwrap_or(1),
        }))
    }

    async fn put_if_version(&self, key: &str, bytes: Vec<u8>, expected: u64) -> Result<bool> {
        let mut conn = self.conn.clone();
        let swapped: i64 = self
            .cas
            .key(key)
            .key(version_key(key))
            .arg(expected)
            .arg(bytes)
            .invoke_async(&mut conn)
            .await?;

        Ok(swapped == 1)
    }
}

/// An in-memory substrate with the same versioning semantics as `RedisKv`.
///
/// Used when no `REDIS_URL` is configured and by the test suite. State is
/// lost when the process exits.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, (u64, Vec<u8>)>>,
}

impl MemoryKv {
    /// Creates a new empty `MemoryKv`.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValue for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|(version, bytes)| Versioned {
            bytes: bytes.clone(),
            version: *version,
        }))
    }

    async fn put_if_version(&self, key: &str, bytes: Vec<u8>, expected: u64) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(|(version, _)| *version).unwrap_or(0);
        if current != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), (current + 1, bytes));
        Ok(true)
    }
}

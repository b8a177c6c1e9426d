//! Redis-backed connection store

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, RedisError};

use crate::redis::{PoolError, RedisPool};

use super::{ConnectionRecord, ConnectionStore, StoreError};

/// One string key per connection: `{prefix}:conn:{connection_id}` -> JSON record.
pub struct RedisConnectionStore {
    pool: Arc<RedisPool>,
    prefix: String,
    scan_count: usize,
}

impl RedisConnectionStore {
    pub fn new(pool: Arc<RedisPool>, prefix: String, scan_count: usize) -> Self {
        Self {
            pool,
            prefix,
            scan_count: scan_count.max(1),
        }
    }

    fn connection_key(&self, connection_id: &str) -> String {
        format!("{}:conn:{}", self.prefix, connection_id)
    }

    /// `SCAN MATCH` pattern; the prefix is matched literally
    fn key_pattern(&self) -> String {
        format!("{}:conn:*", escape_glob(&self.prefix))
    }

    fn id_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix(":conn:"))
    }
}

fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl From<PoolError> for StoreError {
    fn from(e: PoolError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[async_trait]
impl ConnectionStore for RedisConnectionStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError> {
        let key = self.connection_key(&record.connection_id);
        let json = serde_json::to_string(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.pool
            .execute(|mut conn| async move { conn.set::<_, _, ()>(key, json).await })
            .await?;

        tracing::debug!(connection_id = %record.connection_id, "Connection record stored");
        Ok(())
    }

    async fn get(&self, connection_id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
        let key = self.connection_key(connection_id);
        let json: Option<String> = self
            .pool
            .execute(|mut conn| async move { conn.get(key).await })
            .await?;

        json.map(|data| {
            serde_json::from_str(&data).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn delete(&self, connection_id: &str) -> Result<(), StoreError> {
        let key = self.connection_key(connection_id);
        // DEL on a missing key returns 0, not an error
        self.pool
            .execute(|mut conn| async move { conn.del::<_, ()>(key).await })
            .await?;
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<String>, StoreError> {
        let pattern = self.key_pattern();
        let count = self.scan_count;
        let mut cursor: u64 = 0;
        // SCAN may return the same key twice across iterations
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        loop {
            let pattern = pattern.clone();
            let (next, keys): (u64, Vec<String>) = self
                .pool
                .execute(|mut conn| async move {
                    let page: (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(count)
                        .query_async(&mut conn)
                        .await?;
                    Ok::<_, RedisError>(page)
                })
                .await?;

            for key in keys {
                if let Some(id) = self.id_from_key(&key) {
                    if seen.insert(id.to_string()) {
                        ids.push(id.to_string());
                    }
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(ids)
    }
}

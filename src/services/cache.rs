use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

/// Every analytics key lives under this prefix so one pattern drops them all.
pub const ANALYTICS_PREFIX: &str = "analytics:";

/// Best-effort Redis cache: failures degrade to a miss, never to an error.
#[derive(Clone)]
pub struct CacheService {
    redis: ConnectionManager,
}

impl CacheService {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.clone();
        let result: Option<String> = conn.get(key).await.ok()?;
        result.and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let mut conn = self.redis.clone();
        if let Ok(json) = serde_json::to_string(value) {
            if let Err(e) = conn.set_ex::<_, _, ()>(key, json, ttl_secs).await {
                tracing::warn!("Cache write for '{}' failed: {}", key, e);
            }
        }
    }

    /// Deletes every key matching `pattern`, walking the keyspace with `SCAN`.
    pub async fn invalidate_pattern(&self, pattern: &str) {
        let mut conn = self.redis.clone();
        let mut cursor: u64 = 0;
        let mut keys: Vec<String> = Vec::new();

        loop {
            let page: Result<(u64, Vec<String>), _> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await;
            match page {
                Ok((next, batch)) => {
                    keys.extend(batch);
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Err(e) => {
                    tracing::warn!("Cache scan for '{}' failed: {}", pattern, e);
                    return;
                }
            }
        }

        if !keys.is_empty() {
            let _: Result<(), _> = conn.del(keys).await;
        }
    }

    pub async fn invalidate_analytics(&self) {
        self.invalidate_pattern(&format!("{}*", ANALYTICS_PREFIX))
            .await;
    }
}

//! modkit_cache
//!
//! Classification cache. Key `"classify:" + content_hash`,
//! value a serialized `CategoryScores`, TTL 15 minutes. Cache miss and
//! cache unavailable are both non-fatal: every public function degrades to
//! `Ok(None)` / a logged no-op rather than propagating an error, so the
//! pipeline never blocks on the cache.

use modkit_domain::CategoryScores;
use redis::AsyncCommands;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

pub struct ClassificationCache {
    client: redis::Client,
    ttl: Duration,
}

impl ClassificationCache {
    pub fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            ttl: DEFAULT_TTL,
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn key(content_hash: &str) -> String {
        format!("classify:{content_hash}")
    }

    /// Returns `None` on a genuine miss OR on any connection/deserialize
    /// failure.
    pub async fn get(&self, content_hash: &str) -> Option<CategoryScores> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "classification cache unavailable on get");
                return None;
            }
        };

        let raw: Option<String> = match conn.get(Self::key(content_hash)).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "classification cache get failed");
                return None;
            }
        };

        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    /// Writing is best-effort: failures are logged, never surfaced.
    pub async fn put(&self, content_hash: &str, scores: &CategoryScores) {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "classification cache unavailable on put");
                return;
            }
        };

        let encoded = match serde_json::to_string(scores) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize category scores for cache");
                return;
            }
        };

        let ttl_secs = self.ttl.as_secs();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(Self::key(content_hash), encoded, ttl_secs)
            .await
        {
            tracing::warn!(error = %e, "classification cache put failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_format() {
        assert_eq!(ClassificationCache::key("abc123"), "classify:abc123");
    }

    #[test]
    fn default_ttl_is_fifteen_minutes() {
        assert_eq!(DEFAULT_TTL, Duration::from_secs(900));
    }
}

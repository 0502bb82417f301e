//! Outbound interface to the read cache.

use casepulse_shared::CacheKey;
use serde_json::Value;

/// The query cache as seen from the real-time client.
///
/// Implementations belong to the host application. Both calls are made from
/// the connection manager's task and should return quickly; refetching is
/// the cache's own business.
pub trait QueryCache: Send + Sync {
    /// Mark everything stored under `key` as stale.
    fn invalidate(&self, key: &CacheKey);

    /// Store `value` under `key` directly.
    ///
    /// Caches that cannot hold pushed values fall back to invalidation.
    fn set_cached_value(&self, key: &CacheKey, value: Value) {
        let _ = value;
        self.invalidate(key);
    }
}

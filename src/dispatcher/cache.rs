//! Cache seam of the dispatcher.

use crate::store::cache::RedisCache;
use crate::store::error::StoreError;

use async_trait::async_trait;
use std::time::Duration;

/// Stores serialized find aggregates under their normalized request key.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: &str, expiry: Duration) -> Result<(), StoreError>;
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        RedisCache::get(self, key).await
    }

    async fn put(&self, key: &str, value: &str, expiry: Duration) -> Result<(), StoreError> {
        self.set_ex(key, value, expiry).await
    }
}

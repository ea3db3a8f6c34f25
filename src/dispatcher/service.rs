use super::cache::ResponseCache;
use super::fanout::{self, FanoutConfig};
use super::types::{FindError, FindRequest};
use crate::auth::Session;
use crate::content::store::ContentStore;
use crate::content::types::{ContentResponse, now_ms};
use crate::discovery::registry::Registry;
use crate::store::cache::CACHE_EXPIRY;

use std::sync::Arc;

/// Answers find requests from the cache or from the live workers.
pub struct Dispatcher {
    registry: Registry,
    store: Arc<dyn ContentStore>,
    cache: Option<Arc<dyn ResponseCache>>,
    http_client: reqwest::Client,
    fanout: FanoutConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Registry,
        store: Arc<dyn ContentStore>,
        cache: Option<Arc<dyn ResponseCache>>,
    ) -> Self {
        Self {
            registry,
            store,
            cache,
            http_client: reqwest::Client::new(),
            fanout: FanoutConfig::default(),
        }
    }

    pub fn with_fanout_config(mut self, fanout: FanoutConfig) -> Self {
        self.fanout = fanout;
        self
    }

    /// Finds content for `session`, one response per answering worker.
    ///
    /// A cache hit never reaches the workers. Either way every returned item
    /// has been persisted as an answer owned by `session`.
    pub async fn find_content(
        &self,
        request: &FindRequest,
        session: &Session,
    ) -> Result<Vec<ContentResponse>, FindError> {
        let key = request.cache_key();

        if let Some(cached) = self.cached(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return self.bookkeep(cached, session).await;
        }

        let content_type = request.content_type();
        let candidates = self.registry.query(content_type.as_str()).await;
        if candidates.is_empty() {
            tracing::debug!("No live {} parsers", content_type);
            return Err(FindError::NotFound);
        }

        let responses = fanout::fan_out(
            &self.http_client,
            &candidates,
            &request.encoded_params(),
            &self.fanout,
        )
        .await;
        tracing::debug!(
            "{} of {} {} parsers answered",
            responses.len(),
            candidates.len(),
            content_type
        );
        if responses.is_empty() {
            return Err(FindError::NotFound);
        }

        let aggregate = self.bookkeep(responses, session).await?;
        self.populate_cache(key, &aggregate);
        Ok(aggregate)
    }

    async fn cached(&self, key: &str) -> Option<Vec<ContentResponse>> {
        let cache = self.cache.as_ref()?;

        let raw = match cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache lookup failed, treating as miss: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(aggregate) => Some(aggregate),
            Err(e) => {
                tracing::warn!("Undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Stamps and persists every item, dropping the ones that fail to persist.
    ///
    /// A response left without items is dropped as well. Losing every item
    /// leaves nothing to return, which is reported as not found.
    async fn bookkeep(
        &self,
        aggregate: Vec<ContentResponse>,
        session: &Session,
    ) -> Result<Vec<ContentResponse>, FindError> {
        let mut kept = Vec::with_capacity(aggregate.len());

        for response in aggregate {
            let mut persisted = Vec::with_capacity(response.len());

            for mut unit in response {
                let now = now_ms();
                unit.id = uuid::Uuid::new_v4().to_string();
                unit.created = now;
                unit.edited = now;

                match self.store.insert_answer(&unit, session).await {
                    Ok(()) => persisted.push(unit),
                    Err(e) => {
                        tracing::warn!("Dropping answer {:?}: {}", unit.title, e);
                    }
                }
            }

            if !persisted.is_empty() {
                kept.push(persisted);
            }
        }

        if kept.is_empty() {
            tracing::warn!("No answer left after persisting to the document store");
            return Err(FindError::NotFound);
        }
        Ok(kept)
    }

    fn populate_cache(&self, key: String, aggregate: &[ContentResponse]) {
        let Some(cache) = self.cache.clone() else {
            return;
        };

        let value = match serde_json::to_string(aggregate) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to encode aggregate for cache: {}", e);
                return;
            }
        };

        tokio::spawn(async move {
            if let Err(e) = cache.put(&key, &value, CACHE_EXPIRY).await {
                tracing::warn!("Failed to cache {}: {}", key, e);
            }
        });
    }
}

//! Key/value cache backed by Redis behind a set of Sentinels.
//!
//! Connecting walks the ordered sentinel list, asks each one for the current
//! master of the configured group, and keeps the first master that answers a
//! `PING`. A refresh repeats the whole walk, so a master failover is picked up
//! on the next reconnect.

use super::error::StoreError;
use super::watchdog::{Connector, Watchdog};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::sync::Arc;
use std::time::Duration;

/// Name of the master group holding the find-response cache.
pub const CACHE_EVICT: &str = "redis-cache-evict";
/// Expiry of a cached find response, enforced by Redis.
pub const CACHE_EXPIRY: Duration = Duration::from_secs(86_400);

const DIAL_TIMEOUT: Duration = Duration::from_millis(1000);
/// Pause before asking the next sentinel.
const NEXT_SENTINEL_PAUSE: Duration = Duration::from_millis(100);

pub struct SentinelConnector {
    sentinels: Vec<String>,
    master: String,
}

impl SentinelConnector {
    pub fn new(sentinels: Vec<String>, master: impl Into<String>) -> Self {
        Self {
            sentinels,
            master: master.into(),
        }
    }

    async fn dial_via(&self, sentinel: &str) -> Result<CacheClient, StoreError> {
        let mut control = dial(&format!("redis://{}/", sentinel)).await?;

        let master: Option<(String, String)> = redis::cmd("SENTINEL")
            .arg("get-master-addr-by-name")
            .arg(&self.master)
            .query_async(&mut control)
            .await?;
        let (host, port) = master.ok_or_else(|| {
            StoreError::NoReachableEndpoint(format!("unknown master group {}", self.master))
        })?;

        let master_addr = format!("{}:{}", host, port);
        let mut connection = dial(&format!("redis://{}/", master_addr)).await?;
        let _: () = redis::cmd("PING").query_async(&mut connection).await?;

        Ok(CacheClient {
            master_addr,
            connection,
        })
    }
}

async fn dial(url: &str) -> Result<MultiplexedConnection, StoreError> {
    let client = redis::Client::open(url)?;
    match tokio::time::timeout(DIAL_TIMEOUT, client.get_multiplexed_async_connection()).await {
        Ok(connection) => Ok(connection?),
        Err(_) => Err(StoreError::NoReachableEndpoint(format!(
            "dialing {} timed out",
            url
        ))),
    }
}

/// A connection to the master elected at dial time.
pub struct CacheClient {
    pub master_addr: String,
    connection: MultiplexedConnection,
}

#[async_trait]
impl Connector for SentinelConnector {
    type Handle = CacheClient;

    fn name(&self) -> &str {
        "redis"
    }

    async fn connect(&self) -> Result<CacheClient, StoreError> {
        if self.sentinels.is_empty() {
            return Err(StoreError::NoReachableEndpoint(
                "there is no sentinel in the list".to_string(),
            ));
        }

        let mut failures = Vec::with_capacity(self.sentinels.len());
        for (i, sentinel) in self.sentinels.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(NEXT_SENTINEL_PAUSE).await;
            }
            match self.dial_via(sentinel).await {
                Ok(client) => {
                    tracing::info!(
                        "Redis master {} elected via sentinel {}",
                        client.master_addr,
                        sentinel
                    );
                    return Ok(client);
                }
                Err(e) => {
                    tracing::debug!("Sentinel {} failed: {}", sentinel, e);
                    failures.push(format!("{} {}", sentinel, e));
                }
            }
        }

        Err(StoreError::NoReachableEndpoint(format!(
            "no redis master or all sentinels are down: {}",
            failures.join("; ")
        )))
    }

    async fn refresh(&self, _current: Arc<CacheClient>) -> Result<Option<CacheClient>, StoreError> {
        self.connect().await.map(Some)
    }
}

/// Cache operations guarded by a [`Watchdog`].
pub struct RedisCache {
    watchdog: Watchdog<SentinelConnector>,
}

impl RedisCache {
    pub async fn start(sentinels: Vec<String>, master: &str) -> Result<Self, StoreError> {
        let watchdog = Watchdog::start(SentinelConnector::new(sentinels, master)).await?;
        Ok(Self { watchdog })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.watchdog
            .execute(|client| async move {
                let mut connection = client.connection.clone();
                let value: Option<String> = redis::cmd("GET")
                    .arg(key)
                    .query_async(&mut connection)
                    .await?;
                Ok(value)
            })
            .await
    }

    pub async fn set_ex(&self, key: &str, data: &str, expiry: Duration) -> Result<(), StoreError> {
        if data.is_empty() {
            return Err(StoreError::EmptyPayload);
        }

        let seconds = expiry.as_secs();
        self.watchdog
            .execute(|client| async move {
                let mut connection = client.connection.clone();
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(data)
                    .arg("EX")
                    .arg(seconds)
                    .query_async(&mut connection)
                    .await?;
                Ok(())
            })
            .await
    }

    pub async fn is_active(&self) -> bool {
        self.watchdog.is_active().await
    }

    pub async fn close(&self) {
        self.watchdog.close().await;
    }
}

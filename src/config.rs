//! Startup configuration read from the environment.
//!
//! Both binaries resolve their whole configuration before serving anything;
//! a missing required variable aborts startup.

use crate::content::types::ContentType;
use crate::store::cache::CACHE_EVICT;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MULTICAST_ADDR: &str = "224.0.0.1:9999";
pub const DEFAULT_PARSER_NAME: &str = "catalog-service";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {0} is invalid: {1}")]
    Invalid(&'static str, String),
}

/// Configuration of the aggregator (`rating-service`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub mongo_url: String,
    pub mongo_db: String,
    /// Interface name or IPv4 address the multicast group is joined on.
    pub interface: String,
    pub redis_sentinels: Vec<String>,
    pub redis_master: String,
    pub http_addr: SocketAddr,
    pub multicast_addr: SocketAddr,
}

impl AggregatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let redis_sentinels: Vec<String> = required(&lookup, "REDIS_SENTINELS")?
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect();
        if redis_sentinels.is_empty() {
            return Err(ConfigError::Invalid(
                "REDIS_SENTINELS",
                "no sentinel address".to_string(),
            ));
        }

        Ok(Self {
            mongo_url: required(&lookup, "MONGO_URL")?,
            mongo_db: required(&lookup, "MONGO_DB")?,
            interface: required(&lookup, "INTERFACE")?,
            redis_sentinels,
            redis_master: optional(&lookup, "REDIS_MASTER", CACHE_EVICT),
            http_addr: parsed(&lookup, "HTTP_ADDR", DEFAULT_HTTP_ADDR)?,
            multicast_addr: parsed(&lookup, "MULTICAST_ADDR", DEFAULT_MULTICAST_ADDR)?,
        })
    }
}

/// Configuration of a parser worker (`parser-service`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Host announced to the aggregator.
    pub http_host: String,
    pub http_port: u16,
    pub parser_name: String,
    pub parser_type: ContentType,
    pub catalog_path: Option<PathBuf>,
    pub multicast_addr: SocketAddr,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let http_port = required(&lookup, "HTTP_PORT")?;
        let http_port = http_port
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid("HTTP_PORT", format!("{}", e)))?;

        Ok(Self {
            http_host: required(&lookup, "HTTP_HOST")?,
            http_port,
            parser_name: optional(&lookup, "PARSER_NAME", DEFAULT_PARSER_NAME),
            parser_type: parsed(&lookup, "PARSER_TYPE", ContentType::Movie.as_str())?,
            catalog_path: lookup("CATALOG_PATH")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            multicast_addr: parsed(&lookup, "MULTICAST_ADDR", DEFAULT_MULTICAST_ADDR)?,
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional(lookup, key, default)
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid(key, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const AGGREGATOR: &[(&str, &str)] = &[
        ("MONGO_URL", "mongodb://mongo:27017"),
        ("MONGO_DB", "rating"),
        ("INTERFACE", "eth0"),
        ("REDIS_SENTINELS", "sentinel-1:26379, sentinel-2:26379,"),
    ];

    #[test]
    fn test_aggregator_defaults() {
        let config = AggregatorConfig::from_lookup(env(AGGREGATOR)).unwrap();

        assert_eq!(
            config.redis_sentinels,
            vec!["sentinel-1:26379", "sentinel-2:26379"]
        );
        assert_eq!(config.redis_master, "redis-cache-evict");
        assert_eq!(config.http_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.multicast_addr, "224.0.0.1:9999".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_aggregator_missing_required() {
        for skipped in ["MONGO_URL", "MONGO_DB", "INTERFACE", "REDIS_SENTINELS"] {
            let pairs: Vec<_> = AGGREGATOR
                .iter()
                .copied()
                .filter(|(k, _)| *k != skipped)
                .collect();

            let result = AggregatorConfig::from_lookup(env(&pairs));

            assert_eq!(result, Err(ConfigError::Missing(skipped)));
        }
    }

    #[test]
    fn test_aggregator_rejects_blank_sentinel_list() {
        let mut pairs = AGGREGATOR.to_vec();
        pairs[3] = ("REDIS_SENTINELS", " , ");

        let result = AggregatorConfig::from_lookup(env(&pairs));

        assert!(matches!(result, Err(ConfigError::Invalid("REDIS_SENTINELS", _))));
    }

    #[test]
    fn test_aggregator_invalid_address() {
        let mut pairs = AGGREGATOR.to_vec();
        pairs.push(("HTTP_ADDR", "not-an-address"));

        let result = AggregatorConfig::from_lookup(env(&pairs));

        assert!(matches!(result, Err(ConfigError::Invalid("HTTP_ADDR", _))));
    }

    #[test]
    fn test_worker_config() {
        let config = WorkerConfig::from_lookup(env(&[
            ("HTTP_HOST", "parser-1"),
            ("HTTP_PORT", "8081"),
            ("PARSER_TYPE", "book"),
            ("CATALOG_PATH", "/data/books.json"),
        ]))
        .unwrap();

        assert_eq!(config.http_port, 8081);
        assert_eq!(config.parser_type, ContentType::Book);
        assert_eq!(config.parser_name, "catalog-service");
        assert_eq!(config.catalog_path, Some(PathBuf::from("/data/books.json")));
    }

    #[test]
    fn test_worker_rejects_unknown_type_and_bad_port() {
        let bad_type = WorkerConfig::from_lookup(env(&[
            ("HTTP_HOST", "parser-1"),
            ("HTTP_PORT", "8081"),
            ("PARSER_TYPE", "podcast"),
        ]));
        assert!(matches!(bad_type, Err(ConfigError::Invalid("PARSER_TYPE", _))));

        let bad_port = WorkerConfig::from_lookup(env(&[
            ("HTTP_HOST", "parser-1"),
            ("HTTP_PORT", "eighty"),
        ]));
        assert!(matches!(bad_port, Err(ConfigError::Invalid("HTTP_PORT", _))));
    }
}

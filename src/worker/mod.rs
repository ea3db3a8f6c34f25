//! Parser Worker Module
//!
//! What a worker process serves: the find endpoint the aggregator fans out
//! to, answered from a pluggable [`ContentSource`], plus the identity it
//! announces on the discovery group.

pub mod catalog;
pub mod handlers;
pub mod identity;


use crate::content::types::ContentResponse;

use async_trait::async_trait;

/// Where a worker looks content up.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn find_by_name(&self, name: &str) -> anyhow::Result<ContentResponse>;
}

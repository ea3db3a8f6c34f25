//! Find Dispatcher Module
//!
//! Turns `GET /api/v1/{type}/find` into one answer per live worker.
//!
//! ## Request Flow
//! 1. Validate the query; unsupported or incomplete queries never reach the
//!    cache or the workers.
//! 2. Look the normalized request up in the cache.
//! 3. On a miss, query the registry and fan out to every live worker of the
//!    requested type, keeping whatever arrives before the aggregate deadline.
//! 4. Bookkeeping: stamp each item with a fresh id and timestamps and persist
//!    it for the caller; items that fail to persist are dropped.
//! 5. Store a fresh aggregate in the cache without waiting for the write.

pub mod cache;
pub mod fanout;
pub mod handlers;
pub mod service;
pub mod types;

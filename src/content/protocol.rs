//! Content HTTP Protocol
//!
//! Endpoint paths shared by the aggregator and the parser workers, plus the
//! request bodies of the user-content endpoints.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Prefix of every public endpoint.
pub const BASE_URL_V1: &str = "/api/v1";
/// Worker endpoint answering `?type=byName&name=...`.
pub const ENDPOINT_WORKER_FIND: &str = "/api/v1/find";
/// Aggregator fanout endpoint, per content type.
pub const ENDPOINT_FIND: &str = "/api/v1/:content_type/find";
/// Saved units of the caller, per content type.
pub const ENDPOINT_GET: &str = "/api/v1/:content_type/get";
/// Saved units of the caller, all types.
pub const ENDPOINT_GET_ALL: &str = "/api/v1/get";
pub const ENDPOINT_ADD: &str = "/api/v1/:content_type/add";
pub const ENDPOINT_EDIT: &str = "/api/v1/:content_type/edit";
pub const ENDPOINT_REMOVE: &str = "/api/v1/:content_type/remove";

/// Upper bound for a worker answer body.
pub const BODY_LIMIT: usize = 1024 * 1024;

// --- Data Transfer Objects ---

/// The user-editable part of a content unit.
///
/// `id` references an answer previously returned by a find request (for
/// `add`) or a saved unit (for `edit`/`remove`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPart {
    pub id: String,
    #[serde(default)]
    pub stars: i32,
    #[serde(default)]
    pub comment: String,
}

/// Builds `http://host[:port]/path[?query]` the way worker addresses are announced.
pub fn build_url(host: &str, port: &str, path: &str, query: &str) -> String {
    let mut url = format!("http://{}", host);
    if !port.is_empty() {
        url.push(':');
        url.push_str(port);
    }
    if !path.starts_with('/') {
        url.push('/');
    }
    url.push_str(path);
    if !query.is_empty() {
        url.push('?');
        url.push_str(query);
    }
    url
}

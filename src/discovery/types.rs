use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Instant;

/// The self-description a worker broadcasts on the discovery group.
///
/// Every field travels as a string; `content_type` is checked against the
/// known content types only when the registry is queried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Announcement {
    pub name: String,
    pub content_type: String,
    /// Identifies the worker implementation version, fixed at worker startup.
    pub content_hash: String,
    pub http_host: String,
    pub http_port: String,
}

impl Announcement {
    /// Two announcements with the same key describe the same worker.
    pub fn same_worker(&self, other: &Announcement) -> bool {
        self.name == other.name
            && self.content_type == other.content_type
            && self.content_hash == other.content_hash
    }
}

/// A live worker as seen by the registry.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub announcement: Announcement,
    /// Arrival time of the most recent matching announcement.
    pub last_seen: Instant,
    /// Origin of the datagram that created the entry.
    pub source_addr: SocketAddr,
}

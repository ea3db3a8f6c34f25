use crate::content::types::ContentType;
use crate::discovery::types::Announcement;

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `"{name} {type}"`.
pub fn content_hash(name: &str, content_type: ContentType) -> String {
    format!("{:x}", Sha256::digest(format!("{} {}", name, content_type)))
}

/// The announcement of a worker, hash included.
pub fn announcement(
    name: &str,
    content_type: ContentType,
    http_host: &str,
    http_port: u16,
) -> Announcement {
    Announcement {
        name: name.to_string(),
        content_type: content_type.as_str().to_string(),
        content_hash: content_hash(name, content_type),
        http_host: http_host.to_string(),
        http_port: http_port.to_string(),
    }
}

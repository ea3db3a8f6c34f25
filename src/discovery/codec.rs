//! Discovery wire format.
//!
//! An announcement is the bincode encoding of [`Announcement`]: its five
//! strings in declaration order, each prefixed by a little-endian `u64`
//! length. Announcer and registry share this module, so they always agree.

use super::types::Announcement;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("announcement datagram is empty")]
    Empty,
    #[error("malformed announcement: {0}")]
    Malformed(#[from] bincode::Error),
}

pub fn encode(announcement: &Announcement) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(announcement)
}

pub fn decode(bytes: &[u8]) -> Result<Announcement, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(bincode::deserialize(bytes)?)
}

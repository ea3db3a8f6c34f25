use mongodb::error::{ErrorKind, WriteFailure};

/// Failure classes surfaced by the backing stores.
///
/// The first four variants describe lost connectivity and are the only ones
/// the watchdog reacts to with a refresh-and-retry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("end of stream")]
    EndOfStream,
    #[error("no reachable endpoint: {0}")]
    NoReachableEndpoint(String),
    #[error("store disconnected")]
    Disconnected,
    #[error("not found")]
    NotFound,
    #[error("duplicate key")]
    Duplicate,
    #[error("there is no data to write")]
    EmptyPayload,
    #[error("store is closed")]
    Closed,
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionClosed
                | StoreError::EndOfStream
                | StoreError::NoReachableEndpoint(_)
                | StoreError::Disconnected
        )
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() {
            StoreError::NoReachableEndpoint(err.to_string())
        } else if err.is_connection_dropped() || err.is_io_error() || err.is_timeout() {
            StoreError::ConnectionClosed
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                StoreError::EndOfStream
            }
            ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } => {
                StoreError::ConnectionClosed
            }
            ErrorKind::ServerSelection { message, .. } => {
                StoreError::NoReachableEndpoint(message.clone())
            }
            ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == 11000 => {
                StoreError::Duplicate
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        StoreError::Backend(format!("encoding document: {}", err))
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        StoreError::Backend(format!("decoding document: {}", err))
    }
}

use crate::store::error::StoreError;

use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the session id.
pub const SID_COOKIE: &str = "sid";

/// An authenticated session as stored in the `sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub sid: String,
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Why a request could not be attributed to a user.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("session cookie not found in request")]
    MissingCookie,
    #[error("user not authorized")]
    NotAuthorized,
    #[error("session lookup failed: {0}")]
    Store(#[from] StoreError),
}

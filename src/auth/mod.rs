//! Session Resolution
//!
//! Credential handling lives in the auth service; the aggregator only needs
//! to turn the `sid` cookie of an incoming request into the [`Session`] it
//! belongs to, so answers can be attributed to a user.

pub mod types;

pub use types::{AuthError, SID_COOKIE, Session};

use crate::content::store::ContentStore;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

/// Extracts the session id from the `Cookie` headers.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SID_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub async fn authenticate(
    headers: &HeaderMap,
    store: &dyn ContentStore,
) -> Result<Session, AuthError> {
    let sid = session_id(headers).ok_or(AuthError::MissingCookie)?;
    store
        .find_session(&sid)
        .await?
        .ok_or(AuthError::NotAuthorized)
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCookie | AuthError::NotAuthorized => {
                tracing::warn!("Non authorized request: {}", self);
                StatusCode::NOT_ACCEPTABLE.into_response()
            }
            AuthError::Store(e) => {
                tracing::error!("Session lookup failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

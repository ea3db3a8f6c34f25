use crate::content::protocol::BASE_URL_V1;
use crate::content::types::{ContentType, FindKind};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::str::FromStr;

/// Outcomes of a find request other than success.
#[derive(Debug, thiserror::Error)]
pub enum FindError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("find kind {0} is not implemented")]
    NotImplemented(String),
    #[error("nothing found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl FindError {
    pub fn status(&self) -> StatusCode {
        match self {
            FindError::BadRequest(_) => StatusCode::BAD_REQUEST,
            FindError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            FindError::NotFound => StatusCode::NOT_FOUND,
            FindError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FindError {
    fn into_response(self) -> Response {
        match &self {
            FindError::Internal(_) => tracing::error!("Find failed: {}", self),
            FindError::NotFound => tracing::debug!("Find failed: {}", self),
            _ => tracing::warn!("Find rejected: {}", self),
        }
        self.status().into_response()
    }
}

/// A validated find request.
///
/// Parameters are kept sorted so that two requests differing only in
/// parameter order share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRequest {
    content_type: ContentType,
    kind: FindKind,
    params: Vec<(String, String)>,
}

impl FindRequest {
    pub fn new(content_type: &str, mut params: Vec<(String, String)>) -> Result<Self, FindError> {
        let content_type = ContentType::from_str(content_type)
            .map_err(|e| FindError::BadRequest(e.to_string()))?;

        let kind = match param(&params, "type") {
            Some(kind) if !kind.is_empty() => kind,
            _ => return Err(FindError::BadRequest("missing find type".to_string())),
        };
        let kind = FindKind::parse(kind)
            .ok_or_else(|| FindError::BadRequest(format!("unknown find type {}", kind)))?;
        if !kind.is_supported() {
            return Err(FindError::NotImplemented(kind.as_str().to_string()));
        }

        if kind == FindKind::ByName && param(&params, "name").is_none_or(str::is_empty) {
            return Err(FindError::BadRequest("missing name".to_string()));
        }

        params.sort();
        Ok(Self {
            content_type,
            kind,
            params,
        })
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn kind(&self) -> FindKind {
        self.kind
    }

    /// The query string forwarded to workers.
    pub fn encoded_params(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.params)
            .finish()
    }

    /// Normalized request identity: method, path and encoded parameters.
    pub fn cache_key(&self) -> String {
        format!(
            "GET {}/{}/find?{}",
            BASE_URL_V1,
            self.content_type,
            self.encoded_params()
        )
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

use super::protocol::UserPart;
use super::store::ContentStore;
use super::types::{ContentType, ContentUnit, now_ms};
use crate::auth::{self, Session};
use crate::store::error::StoreError;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::str::FromStr;
use std::sync::Arc;

/// Resolves the caller and the content type named in the path.
async fn caller(
    headers: &HeaderMap,
    store: &dyn ContentStore,
    content_type: &str,
) -> Result<(Session, ContentType), Response> {
    let session = auth::authenticate(headers, store)
        .await
        .map_err(IntoResponse::into_response)?;

    let content_type = ContentType::from_str(content_type).map_err(|e| {
        tracing::debug!("Rejecting request: {}", e);
        StatusCode::BAD_REQUEST.into_response()
    })?;

    Ok((session, content_type))
}

fn store_failure(op: &str, e: StoreError) -> Response {
    tracing::error!("Failed to {}: {}", op, e);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

pub async fn handle_get(
    Path(content_type): Path<String>,
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn ContentStore>>,
) -> Response {
    let (session, content_type) = match caller(&headers, store.as_ref(), &content_type).await {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };

    match store.list_units(&session, Some(content_type)).await {
        Ok(units) => (StatusCode::OK, Json(units)).into_response(),
        Err(e) => store_failure("list units", e),
    }
}

pub async fn handle_get_all(
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn ContentStore>>,
) -> Response {
    let session = match auth::authenticate(&headers, store.as_ref()).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    match store.list_units(&session, None).await {
        Ok(units) => (StatusCode::OK, Json(units)).into_response(),
        Err(e) => store_failure("list units", e),
    }
}

/// Saves an answer the caller received from a find request.
pub async fn handle_add(
    Path(content_type): Path<String>,
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn ContentStore>>,
    Json(part): Json<UserPart>,
) -> Response {
    let (session, content_type) = match caller(&headers, store.as_ref(), &content_type).await {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };

    let mut unit = match store.find_answer(&part.id, &session).await {
        Ok(Some(unit)) if unit.content_type == content_type.as_str() => unit,
        Ok(_) => {
            tracing::debug!("No {} answer {} for user {}", content_type, part.id, session.uid);
            return StatusCode::BAD_REQUEST.into_response();
        }
        Err(e) => return store_failure("find answer", e),
    };

    unit.stars = part.stars;
    unit.comment = part.comment;
    unit.edited = now_ms();

    match store.insert_unit(&unit, &session).await {
        Ok(()) => {
            tracing::debug!("User {} saved {}", session.uid, unit.id);
            (StatusCode::OK, Json(unit)).into_response()
        }
        Err(StoreError::Duplicate) => StatusCode::BAD_REQUEST.into_response(),
        Err(e) => store_failure("insert unit", e),
    }
}

pub async fn handle_edit(
    Path(content_type): Path<String>,
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn ContentStore>>,
    Json(part): Json<UserPart>,
) -> Response {
    let (session, content_type) = match caller(&headers, store.as_ref(), &content_type).await {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };

    let unit = ContentUnit {
        id: part.id,
        stars: part.stars,
        comment: part.comment,
        edited: now_ms(),
        content_type: content_type.as_str().to_string(),
        ..Default::default()
    };

    match store.update_unit(&unit, &session).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::BAD_REQUEST.into_response(),
        Err(e) => store_failure("update unit", e),
    }
}

pub async fn handle_remove(
    Path(content_type): Path<String>,
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn ContentStore>>,
    Json(part): Json<UserPart>,
) -> Response {
    let (session, _) = match caller(&headers, store.as_ref(), &content_type).await {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };

    match store.remove_unit(&part.id, &session).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::BAD_REQUEST.into_response(),
        Err(e) => store_failure("remove unit", e),
    }
}

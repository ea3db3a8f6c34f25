use super::service::Dispatcher;
use super::types::FindRequest;
use crate::auth;
use crate::content::store::ContentStore;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;

pub async fn handle_find(
    Path(content_type): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Extension(store): Extension<Arc<dyn ContentStore>>,
) -> Response {
    let session = match auth::authenticate(&headers, store.as_ref()).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let request = match FindRequest::new(&content_type, params) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match dispatcher.find_content(&request, &session).await {
        Ok(aggregate) => (StatusCode::OK, Json(aggregate)).into_response(),
        Err(e) => e.into_response(),
    }
}

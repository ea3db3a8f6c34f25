use super::ContentSource;
use crate::content::types::{ContentResponse, FindKind};

use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct FindParams {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub name: Option<String>,
}

pub async fn handle_find(
    Query(params): Query<FindParams>,
    Extension(source): Extension<Arc<dyn ContentSource>>,
) -> (StatusCode, Json<ContentResponse>) {
    if params.kind.is_empty() {
        tracing::debug!("Find request without type");
        return (StatusCode::BAD_REQUEST, Json(Vec::new()));
    }

    if FindKind::parse(&params.kind) != Some(FindKind::ByName) {
        tracing::debug!("Find type {} is not implemented", params.kind);
        return (StatusCode::NOT_IMPLEMENTED, Json(Vec::new()));
    }

    let name = match params.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => return (StatusCode::BAD_REQUEST, Json(Vec::new())),
    };

    match source.find_by_name(name).await {
        Ok(units) => {
            tracing::debug!("Found {} units for {:?}", units.len(), name);
            (StatusCode::OK, Json(units))
        }
        Err(e) => {
            tracing::error!("Content source failed for {:?}: {:#}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Vec::new()))
        }
    }
}

//! Resource endpoint handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokio::sync::RwLock;

use crate::mock_server::state::{resource_key, MockState, Resource};

/// GET /api/{path}
///
/// Lists are paginated with `page` (1-indexed) and an optional `pageSize`
/// override, and wrapped in the `{page, pageSize, resultList}` envelope.
pub async fn get_resource(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(path): Path<String>,
    Query(mut query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.write().await;

    if let Some(required) = &state.required_token {
        let sent = headers.get("AuthToken").and_then(|v| v.to_str().ok());
        if sent != Some(required.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "The token is not valid"})),
            )
                .into_response();
        }
    }

    state.requests.push(resource_key(&path, &query));

    let page: usize = query
        .remove("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1)
        .max(1);
    let page_size: usize = query
        .remove("pageSize")
        .and_then(|p| p.parse().ok())
        .unwrap_or(state.page_size)
        .max(1);

    match state.lookup(&path, &query) {
        Some(Resource::Single(body)) => (StatusCode::OK, Json(body.clone())).into_response(),
        Some(Resource::List(rows)) => {
            let start = (page - 1) * page_size;
            let end = (start + page_size).min(rows.len());
            let slice = if start < rows.len() {
                rows[start..end].to_vec()
            } else {
                Vec::new()
            };

            (
                StatusCode::OK,
                Json(json!({
                    "page": page,
                    "pageSize": page_size,
                    "resultList": slice,
                })),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Resource not found",
                "message": format!("No resource at {path}")
            })),
        )
            .into_response(),
    }
}

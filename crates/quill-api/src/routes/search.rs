use axum::{
    extract::{Query, State},
    Json,
};
use quill_persist::DocumentStore;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::routes::documents::DocumentResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// Search the caller's documents
///
/// Case-insensitive substring match on title or content, most recently updated first.
#[utoipa::path(
    get,
    path = "/search",
    params(
        ("query" = String, Query, description = "Search keyword")
    ),
    responses(
        (status = 200, description = "Matching documents", body = [DocumentResponse]),
        (status = 401, description = "Invalid or expired token")
    ),
    security(("bearer" = [])),
    tag = "search"
)]
pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<DocumentResponse>>> {
    let results = state
        .persist
        .search_documents(&user.id, &query.query)
        .await?;

    tracing::debug!(user_id = %user.id, hits = results.len(), "document search");
    Ok(Json(results.into_iter().map(DocumentResponse::from).collect()))
}

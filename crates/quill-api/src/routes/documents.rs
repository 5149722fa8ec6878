use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use quill_persist::{Document, DocumentStore, DocumentUpdate, NewDocument};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::export::{self, ExportFormat};
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            title: doc.title,
            content: doc.content,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

async fn owned_document(state: &AppState, user_id: &str, document_id: &str) -> ApiResult<Document> {
    state
        .persist
        .get_document(user_id, document_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))
}

/// Create a document
#[utoipa::path(
    post,
    path = "/documents",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = DocumentResponse)
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateDocumentRequest>,
) -> ApiResult<(StatusCode, Json<DocumentResponse>)> {
    let doc = state
        .persist
        .create_document(&user.id, NewDocument::new(req.title, req.content))
        .await?;

    tracing::info!(document_id = %doc.id, user_id = %user.id, "created document");
    Ok((StatusCode::CREATED, Json(doc.into())))
}

/// List the caller's documents, most recently updated first
#[utoipa::path(
    get,
    path = "/documents",
    responses(
        (status = 200, description = "Documents", body = [DocumentResponse])
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<DocumentResponse>>> {
    let docs = state.persist.list_documents(&user.id).await?;
    Ok(Json(docs.into_iter().map(DocumentResponse::from).collect()))
}

/// Get a document
#[utoipa::path(
    get,
    path = "/documents/{document_id}",
    params(
        ("document_id" = String, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document", body = DocumentResponse),
        (status = 404, description = "Document not found")
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(document_id): Path<String>,
) -> ApiResult<Json<DocumentResponse>> {
    let doc = owned_document(&state, &user.id, &document_id).await?;
    Ok(Json(doc.into()))
}

/// Update title and/or content
#[utoipa::path(
    put,
    path = "/documents/{document_id}",
    params(
        ("document_id" = String, Path, description = "Document ID")
    ),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Updated document", body = DocumentResponse),
        (status = 404, description = "Document not found")
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(document_id): Path<String>,
    Json(req): Json<UpdateDocumentRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    let update = DocumentUpdate {
        title: req.title,
        content: req.content,
    };
    let doc = state
        .persist
        .update_document(&user.id, &document_id, update)
        .await?;

    tracing::info!(document_id = %doc.id, "updated document");
    Ok(Json(doc.into()))
}

/// Delete a document
#[utoipa::path(
    delete,
    path = "/documents/{document_id}",
    params(
        ("document_id" = String, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document deleted"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(document_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .persist
        .delete_document(&user.id, &document_id)
        .await?;

    tracing::info!(document_id = %document_id, "deleted document");
    Ok(Json(json!({ "detail": "Document deleted" })))
}

/// Export a document as pdf, docx or txt
///
/// The HTML content is reduced to its text nodes before rendering.
#[utoipa::path(
    get,
    path = "/documents/{document_id}/export",
    params(
        ("document_id" = String, Path, description = "Document ID"),
        ("format" = Option<String>, Query, description = "pdf (default), docx or txt")
    ),
    responses(
        (status = 200, description = "File attachment"),
        (status = 400, description = "Unsupported format"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer" = [])),
    tag = "documents"
)]
pub async fn export_document(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(document_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<ExportFormat>().map_err(ApiError::BadRequest)?,
        None => ExportFormat::default(),
    };

    let doc = owned_document(&state, &user.id, &document_id).await?;
    let text = export::html_to_text(&doc.content);
    let bytes = export::render(format, doc.title, text).await?;
    let filename = export::export_filename(&doc.id, format, Utc::now());

    tracing::info!(document_id = %doc.id, format = format.extension(), bytes = bytes.len(), "exported document");

    Ok((
        [
            (header::CONTENT_TYPE, format.media_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

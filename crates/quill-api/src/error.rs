use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quill_persist::PersistError;
use serde_json::json;
use thiserror::Error;

pub const EMAIL_TAKEN: &str = "Email already registered.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid_token() -> Self {
        Self::Unauthorized("Invalid or expired token".to_string())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Persist(ref e) => persist_status(e),
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

fn persist_status(err: &PersistError) -> (StatusCode, String) {
    match err {
        PersistError::UserNotFound(_) => (StatusCode::NOT_FOUND, "User not found".to_string()),
        PersistError::DocumentNotFound(_) => {
            (StatusCode::NOT_FOUND, "Document not found".to_string())
        }
        PersistError::ConversationNotFound(_) => {
            (StatusCode::NOT_FOUND, "Conversation not found".to_string())
        }
        PersistError::EmailTaken(_) => (StatusCode::BAD_REQUEST, EMAIL_TAKEN.to_string()),
        // Ids from the URL that the backend cannot parse cannot name an existing row
        PersistError::InvalidId(_) => (StatusCode::NOT_FOUND, "Not found".to_string()),
        e => {
            tracing::error!("Persistence error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (ApiError::invalid_token(), StatusCode::UNAUTHORIZED),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (
                ApiError::ServiceUnavailable("x".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PersistError::DocumentNotFound("1".to_string()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                PersistError::EmailTaken("a@x.com".to_string()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                PersistError::Internal("disk".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                anyhow::anyhow!("boom").into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}

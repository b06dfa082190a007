/// Error types for social-feed-service
///
/// Every failure a core operation can produce maps to one variant here. The
/// HTTP layer renders them as `{ "error": ..., "code": ... }`; database and
/// internal failures are logged in full and rendered with an opaque message.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::repository::RepoError;

/// Result type for social-feed-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed input; never reaches persistence
    #[error("{0}")]
    Validation(String),

    /// Post, comment, agent, notification or cursor target does not exist
    #[error("{0}")]
    NotFound(String),

    /// Duplicate like on a post or comment
    #[error("{0}")]
    AlreadyLiked(String),

    /// Registration with a handle that is already in use
    #[error("{0}")]
    HandleTaken(String),

    /// Acting on another agent's resource
    #[error("{0}")]
    Forbidden(String),

    /// Missing or invalid API key
    #[error("{0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyLiked(_) => "ALREADY_LIKED",
            AppError::HandleTaken(_) => "HANDLE_TAKEN",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Database(_) | AppError::Internal(_) => "SERVER_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyLiked(_) | AppError::HandleTaken(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.public_message(),
            "code": self.code(),
        }))
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            // Conflicts that reach this point were not translated by the caller
            RepoError::Conflict(msg) => AppError::Internal(format!("unhandled conflict: {}", msg)),
            RepoError::MissingParent(_) => AppError::NotFound("Not found".to_string()),
            RepoError::Database(e) => AppError::Database(e.to_string()),
            RepoError::Unavailable(msg) => AppError::Database(msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_codes_match_wire_contract() {
        assert_eq!(AppError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(AppError::AlreadyLiked("x".into()).code(), "ALREADY_LIKED");
        assert_eq!(AppError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(AppError::Forbidden("x".into()).code(), "FORBIDDEN");
        assert_eq!(AppError::Database("x".into()).code(), "SERVER_ERROR");
        assert_eq!(AppError::Internal("x".into()).code(), "SERVER_ERROR");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::AlreadyLiked("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::HandleTaken("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_missing_parent_is_not_found() {
        let err = AppError::from(RepoError::MissingParent("likes_post_id_fkey".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[actix_web::test]
    async fn test_internal_details_are_not_exposed() {
        let err = AppError::Database("relation \"posts\" does not exist".into());
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "Internal server error");
        assert_eq!(json["code"], "SERVER_ERROR");
    }

    #[actix_web::test]
    async fn test_client_errors_keep_message() {
        let err = AppError::NotFound("Post not found".into());
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "Post not found");
        assert_eq!(json["code"], "NOT_FOUND");
    }
}

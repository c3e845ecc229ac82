use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] sea_orm::DbErr),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Backend failures: the operation must not be assumed to have committed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(_) | AppError::StoreUnavailable(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    /// Message safe to show to a citizen or moderator.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Store(_) | AppError::StoreUnavailable(_) => {
                "Service temporarily unavailable, please try again".to_string()
            }
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Jwt(_) => "Invalid token".to_string(),
            AppError::NotFound => "Resource not found".to_string(),
            AppError::Forbidden => "Forbidden".to_string(),
            AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl utoipa::ToSchema for AppError {
    fn name() -> std::borrow::Cow<'static, str> {
        "ErrorResponse".into()
    }
}

impl utoipa::PartialSchema for AppError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::StoreUnavailable(e) => {
                tracing::error!("Store unavailable: {}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = json!({
            "error": self.public_message(),
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_retryable_and_hidden() {
        let err = AppError::Store(sea_orm::DbErr::Custom("connection refused".into()));
        assert!(err.is_retryable());
        assert!(!err.public_message().contains("connection refused"));
    }

    #[test]
    fn validation_message_is_surfaced_verbatim() {
        let err = AppError::Validation("title must not be empty".to_string());
        assert_eq!(err.public_message(), "title must not be empty");
        assert!(!err.is_retryable());
    }

    #[test]
    fn conflict_status_code() {
        let resp = AppError::Conflict("already upvoted".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn store_unavailable_maps_to_503() {
        let resp = AppError::StoreUnavailable("pool timeout".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

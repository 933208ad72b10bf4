use crate::services::backend::BackendError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("File upload error: {0}")]
    FileUpload(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidatorError(#[from] validator::ValidationErrors),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Backend(e) => match e {
                BackendError::Conflict(_) => StatusCode::CONFLICT,
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_)
            | AppError::ValidatorError(_)
            | AppError::BadRequest(_)
            | AppError::FileUpload(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_message, error_code) = match &self {
            AppError::Backend(e) => {
                let code = match e {
                    BackendError::Conflict(_) => "CONFLICT",
                    BackendError::NotFound(_) => "NOT_FOUND",
                    BackendError::Unauthorized(_) => "AUTHENTICATION_ERROR",
                    _ => "BACKEND_ERROR",
                };
                if status.is_server_error() {
                    tracing::error!("Backend error: {}", e);
                    ("Backend service error".to_string(), code)
                } else {
                    (e.to_string(), code)
                }
            }
            AppError::Authentication(msg) => (msg.clone(), "AUTHENTICATION_ERROR"),
            AppError::Authorization(msg) => (msg.clone(), "AUTHORIZATION_ERROR"),
            AppError::Validation(msg) => (msg.clone(), "VALIDATION_ERROR"),
            AppError::NotFound(msg) => (msg.clone(), "NOT_FOUND"),
            AppError::Conflict(msg) => (msg.clone(), "CONFLICT"),
            AppError::BadRequest(msg) => (msg.clone(), "BAD_REQUEST"),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), "INTERNAL_ERROR")
            }
            AppError::RateLimitExceeded => ("Rate limit exceeded".to_string(), "RATE_LIMIT_EXCEEDED"),
            AppError::FileUpload(msg) => (msg.clone(), "FILE_UPLOAD_ERROR"),
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                ("Serialization error".to_string(), "SERIALIZATION_ERROR")
            }
            AppError::ValidatorError(e) => {
                let validation_errors = e
                    .field_errors()
                    .iter()
                    .map(|(field, errors)| {
                        (
                            field.to_string(),
                            errors
                                .iter()
                                .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| "Invalid value".to_string()))
                                .collect::<Vec<_>>(),
                        )
                    })
                    .collect::<std::collections::HashMap<String, Vec<String>>>();

                return (
                    status,
                    Json(json!({
                        "error": {
                            "code": "VALIDATION_ERROR",
                            "message": "Validation failed",
                            "details": validation_errors
                        }
                    })),
                )
                    .into_response();
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": error_message
            }
        }));

        (status, body).into_response()
    }
}

// 便利函数，用于创建常见错误
impl AppError {
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{} not found", resource))
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::Authentication(msg.to_string())
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::Authorization(msg.to_string())
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::BadRequest(msg.to_string())
    }

    pub fn conflict(msg: &str) -> Self {
        Self::Conflict(msg.to_string())
    }

    pub fn validation(msg: &str) -> Self {
        Self::Validation(msg.to_string())
    }

    /// 后端唯一约束冲突
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, AppError::Backend(BackendError::Conflict(_)))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_map_to_http_status() {
        let cases = [
            (BackendError::Conflict("dup".into()), StatusCode::CONFLICT),
            (BackendError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (BackendError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (BackendError::Status { status: 500, message: "boom".into() }, StatusCode::BAD_GATEWAY),
            (BackendError::Storage("full".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_helper_constructors() {
        assert_eq!(AppError::not_found("Work").to_string(), "Not found: Work not found");
        assert_eq!(AppError::unauthorized("Authentication required").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("no").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::validation("empty").status_code(), StatusCode::BAD_REQUEST);
        assert!(AppError::Backend(BackendError::Conflict("dup".into())).is_unique_violation());
        assert!(!AppError::conflict("dup").is_unique_violation());
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = AppError::validation("Comment cannot be empty").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Comment cannot be empty");
    }
}

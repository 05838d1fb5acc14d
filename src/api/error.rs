use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::exiftool::ExtractError;
use crate::services::upload_session::SessionError;
use crate::utils::validation::{ValidationError, supported_extensions};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("File type not supported: {received}")]
    UnsupportedType { received: String },

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::UnsupportedType { received } => AppError::UnsupportedType { received },
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        AppError::Internal(format!("Failed to process file: {}", e))
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
        } else {
            AppError::BadRequest(e.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => {
                tracing::error!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            AppError::UnsupportedType { received } => {
                tracing::error!("File type not allowed: {}", received);
                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "File type not supported",
                        "supported_types": supported_extensions(),
                        "received_type": received,
                    }),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": msg }))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_mapping() {
        let err: AppError = ValidationError::UnsupportedType {
            received: "exe".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::UnsupportedType { ref received } if received == "exe"));

        let err: AppError = ValidationError::MissingFile.into();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "No file provided"));
    }

    #[test]
    fn test_extract_error_mapping() {
        let err: AppError = ExtractError::Execution {
            status: "exit status: 1".to_string(),
            stderr: "Error: File not found".to_string(),
        }
        .into();
        match err {
            AppError::Internal(msg) => assert!(msg.contains("Error: File not found")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UnsupportedType { received: "exe".into() }
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

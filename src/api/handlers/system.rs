use crate::AppState;
use crate::services::exiftool::ExtractError;
use crate::utils::validation::supported_extensions;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SystemCheckResponse {
    Ok {
        exiftool_version: String,
        supported_extensions: Vec<String>,
    },
    Error {
        message: String,
    },
}

#[derive(Serialize, ToSchema)]
pub struct SupportedTypesResponse {
    pub supported_extensions: Vec<String>,
    pub max_file_size_mb: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/system-check",
    responses(
        (status = 200, description = "ExifTool is installed", body = SystemCheckResponse),
        (status = 404, description = "ExifTool not found", body = SystemCheckResponse),
        (status = 500, description = "ExifTool failed to run", body = SystemCheckResponse)
    ),
    tag = "system"
)]
pub async fn system_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.extractor.version().await {
        Ok(version) => {
            info!("ExifTool version: {}", version);
            (
                StatusCode::OK,
                Json(SystemCheckResponse::Ok {
                    exiftool_version: version,
                    supported_extensions: supported_extensions(),
                }),
            )
        }
        Err(ExtractError::ToolUnavailable(path)) => {
            error!("ExifTool not found at {}", path);
            (
                StatusCode::NOT_FOUND,
                Json(SystemCheckResponse::Error {
                    message: "ExifTool not found".to_string(),
                }),
            )
        }
        Err(e @ ExtractError::Execution { .. }) => {
            error!("Failed to get ExifTool version: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SystemCheckResponse::Error {
                    message: format!("ExifTool error: {}", e),
                }),
            )
        }
        Err(e) => {
            error!("System check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SystemCheckResponse::Error {
                    message: format!("System error: {}", e),
                }),
            )
        }
    }
}

#[utoipa::path(
    get,
    path = "/supported-types",
    responses(
        (status = 200, description = "Accepted extensions and size limit", body = SupportedTypesResponse)
    ),
    tag = "system"
)]
pub async fn supported_types(State(state): State<AppState>) -> Json<SupportedTypesResponse> {
    Json(SupportedTypesResponse {
        supported_extensions: supported_extensions(),
        max_file_size_mb: state.config.max_file_size_mb(),
    })
}

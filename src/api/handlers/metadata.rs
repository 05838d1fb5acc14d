use crate::AppState;
use crate::api::error::AppError;
use crate::services::exiftool::extract_with_creation_date;
use crate::services::metadata::{CategorizedMetadata, MetadataRecord, categorize};
use crate::services::stripper::{CLEAN_PREFIX, strip_metadata};
use crate::services::upload_session::{TempFileGuard, UploadSession};
use crate::utils::validation::{ValidationError, sanitize_filename, validate_upload_name};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use std::path::Path;
use tokio_util::io::StreamReader;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    /// Fields grouped by category (basic, file, image, exif, gps, pdf, icc_profile, xmp, other)
    #[schema(value_type = Object)]
    pub metadata: CategorizedMetadata,
    /// Flat record exactly as the tool reported it
    #[schema(value_type = Object)]
    pub raw_metadata: MetadataRecord,
    /// Best known creation date, `YYYY:MM:DD HH:MM:SS`
    pub creation_date: String,
}

/// Reads the `file` field of the form, validates its name and persists it.
async fn receive_upload(mut multipart: Multipart, upload_dir: &Path) -> Result<UploadSession, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original_filename = field.file_name().map(str::to_string);
        info!("Received file: {:?}", original_filename);

        validate_upload_name(original_filename.as_deref())?;
        let filename = sanitize_filename(original_filename.as_deref().unwrap_or_default())?;

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        let session = UploadSession::persist(upload_dir, &filename, reader).await?;
        info!("Processing file: {} (session {})", filename, session.id);
        return Ok(session);
    }

    Err(ValidationError::MissingFile.into())
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = Multipart, description = "Image or PDF in the `file` field"),
    responses(
        (status = 200, description = "Metadata extracted", body = UploadResponse),
        (status = 400, description = "Missing file or unsupported type"),
        (status = 404, description = "No metadata found in file"),
        (status = 500, description = "Save or extraction failure")
    ),
    tag = "metadata"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let session = receive_upload(multipart, &state.config.upload_dir).await?;

    let extracted = extract_with_creation_date(state.extractor.as_ref(), session.path())
        .await?
        .ok_or_else(|| AppError::NotFound("No metadata found in file".to_string()))?;

    let metadata = categorize(&extracted.record);

    Ok(Json(UploadResponse {
        success: true,
        metadata,
        raw_metadata: extracted.record,
        creation_date: extracted.creation_date,
    }))
}

#[utoipa::path(
    post,
    path = "/remove-metadata",
    request_body(content = Multipart, description = "Bitmap image in the `file` field"),
    responses(
        (status = 200, description = "Cleaned image as an attachment"),
        (status = 400, description = "Missing file or unsupported type"),
        (status = 500, description = "Metadata removal failed")
    ),
    tag = "metadata"
)]
pub async fn remove_metadata(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let session = receive_upload(multipart, &state.config.upload_dir).await?;

    let input = session.path().to_path_buf();
    let output_dir = state.config.upload_dir.clone();
    let cleaned = tokio::task::spawn_blocking(move || strip_metadata(&input, &output_dir))
        .await
        .map_err(|e| AppError::Internal(format!("Metadata removal task failed: {}", e)))?
        .map_err(|e| {
            error!("Error removing metadata: {}", e);
            AppError::Internal("Failed to remove metadata".to_string())
        })?;
    let content_type = cleaned
        .mime_type
        .parse::<mime::Mime>()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM);
    let cleaned = TempFileGuard::new(cleaned.path);

    let data = tokio::fs::read(cleaned.path())
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read cleaned file: {}", e)))?;

    let download_name = format!("{}{}", CLEAN_PREFIX, session.original_filename);
    let content_disposition = attachment_disposition(&download_name);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        Body::from(data),
    )
        .into_response())
}

/// Attachment disposition for a downloaded file name.
fn attachment_disposition(filename: &str) -> String {
    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .collect::<String>();
    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_filename, encoded_filename
    )
}

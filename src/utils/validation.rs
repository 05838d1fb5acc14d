use thiserror::Error;

/// Extensions accepted by both the inspection and the stripping endpoints
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "tiff", "bmp", "webp", "heic", "pdf",
];

const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file provided")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("File type not supported")]
    UnsupportedType { received: String },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

/// Lowercased extension after the last dot, if the name has one
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}

pub fn supported_extensions() -> Vec<String> {
    ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

/// Checks presence, emptiness and extension of an uploaded filename.
///
/// Returns the lowercased extension on success. A name without any dot is
/// reported with `received = "unknown"`.
pub fn validate_upload_name(filename: Option<&str>) -> Result<String, ValidationError> {
    let filename = filename.ok_or(ValidationError::MissingFile)?;
    if filename.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    match file_extension(filename) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        Some(ext) => Err(ValidationError::UnsupportedType { received: ext }),
        None => Err(ValidationError::UnsupportedType {
            received: "unknown".to_string(),
        }),
    }
}

/// Reduces a client supplied filename to a single safe path component.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    // Keep only the last component, whichever separator the client used
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("");

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c.is_whitespace()
                || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';')
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // No hidden files in the upload dir
    let sanitized = sanitized.trim_start_matches('.');

    let sanitized = if sanitized.len() > MAX_FILENAME_LEN {
        let mut end = MAX_FILENAME_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        &sanitized[..end]
    } else {
        sanitized
    };

    if sanitized.is_empty() {
        return Err(ValidationError::InvalidFilename(filename.to_string()));
    }

    Ok(sanitized.to_string())
}

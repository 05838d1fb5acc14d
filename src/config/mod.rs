use std::env;
use std::path::PathBuf;

/// Runtime configuration for the metadata service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// ExifTool binary: a bare command name resolved through PATH, or an explicit path
    pub exiftool_path: String,

    /// Directory holding per-request temp files (default: "temp_uploads")
    pub upload_dir: PathBuf,

    /// Maximum upload size in bytes (default: 50 MB)
    pub max_file_size: usize,
}

/// `None` when the byte count does not fit in `usize`.
fn mb_to_bytes(mb: usize) -> Option<usize> {
    mb.checked_mul(1024 * 1024)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exiftool_path: "exiftool".to_string(),
            upload_dir: PathBuf::from("temp_uploads"),
            max_file_size: 50 * 1024 * 1024, // 50 MB
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            exiftool_path: env::var("EXIFTOOL_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.exiftool_path),

            upload_dir: env::var("UPLOAD_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_file_size: env::var("MAX_FILE_SIZE_MB")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .and_then(mb_to_bytes)
                .unwrap_or(default.max_file_size),
        }
    }

    pub fn max_file_size_mb(&self) -> usize {
        self.max_file_size / 1024 / 1024
    }

    /// Config rooted at a scratch directory, used by tests
    pub fn with_upload_dir(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            ..Self::default()
        }
    }
}

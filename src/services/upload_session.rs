use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("Failed to save file: {0}")]
pub struct SessionError(#[from] std::io::Error);

/// A file on disk that is removed when the guard is dropped.
///
/// Removal is best effort: failures are logged and never propagated.
#[derive(Debug)]
pub struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Cleaned up temp file: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Error cleaning up temp file {}: {}", self.path.display(), e),
        }
    }
}

/// One uploaded file persisted under a collision-free name for the
/// lifetime of a single request.
#[derive(Debug)]
pub struct UploadSession {
    pub id: Uuid,
    pub original_filename: String,
    file: TempFileGuard,
}

impl UploadSession {
    /// Streams `reader` to `<dir>/<uuid>_<filename>`.
    ///
    /// `filename` must already be sanitized. A partially written file is
    /// removed if the copy fails.
    pub async fn persist<R>(dir: &Path, filename: &str, reader: R) -> Result<Self, SessionError>
    where
        R: AsyncRead,
    {
        tokio::pin!(reader);
        tokio::fs::create_dir_all(dir).await?;

        let id = Uuid::new_v4();
        let file = TempFileGuard::new(dir.join(format!("{id}_{filename}")));

        let mut out = tokio::fs::File::create(file.path()).await?;
        let written = tokio::io::copy(&mut reader, &mut out).await?;
        out.flush().await?;

        info!("File saved successfully at: {} ({} bytes)", file.path().display(), written);

        Ok(Self {
            id,
            original_filename: filename.to_string(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

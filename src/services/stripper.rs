use image::io::Reader as ImageReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Prefix given to every cleaned copy.
pub const CLEAN_PREFIX: &str = "clean_";

#[derive(Debug, Error)]
pub enum StripError {
    #[error("Unsupported file for metadata removal: {0}")]
    Unsupported(String),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Path of the cleaned copy for `path` inside `output_dir`.
pub fn clean_path(path: &Path, output_dir: &Path) -> Result<PathBuf, StripError> {
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StripError::Unsupported(format!("no file name in {}", path.display())))?;
    Ok(output_dir.join(format!("{CLEAN_PREFIX}{base}")))
}

/// A cleaned copy on disk and the MIME type of the content it was encoded as.
#[derive(Debug)]
pub struct CleanedImage {
    pub path: PathBuf,
    pub mime_type: &'static str,
}

/// Re-encodes a bitmap from its raw pixels only, dropping every metadata
/// container (EXIF, ICC profile, text chunks) the source carried.
///
/// Width, height and color type are preserved and the container format is
/// kept. Documents such as PDF are rejected rather than copied through.
/// Blocking; call from `spawn_blocking` in async contexts.
pub fn strip_metadata(path: &Path, output_dir: &Path) -> Result<CleanedImage, StripError> {
    let mime_type = match infer::get_from_path(path)? {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => kind.mime_type(),
        Some(kind) => return Err(StripError::Unsupported(kind.mime_type().to_string())),
        None => return Err(StripError::Unsupported("unrecognized content".to_string())),
    };

    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| StripError::Unsupported("unknown image format".to_string()))?;
    let img = reader.decode()?;

    let (width, height) = (img.width(), img.height());
    let color = img.color();
    let pixels = img.as_bytes();

    let output = clean_path(path, output_dir)?;
    if let Err(e) = image::save_buffer_with_format(&output, pixels, width, height, color, format) {
        // Don't leave a half-written copy behind
        let _ = std::fs::remove_file(&output);
        return Err(e.into());
    }

    info!(
        "Stripped metadata from {} -> {} ({}x{}, {:?})",
        path.display(),
        output.display(),
        width,
        height,
        color
    );
    Ok(CleanedImage {
        path: output,
        mime_type,
    })
}

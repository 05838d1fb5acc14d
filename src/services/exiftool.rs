use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::services::metadata::MetadataRecord;

/// Date fields consulted for the creation date, highest priority first.
pub const DATE_FIELDS: [&str; 5] = [
    "DateTimeOriginal",
    "CreateDate",
    "MediaCreateDate",
    "TrackCreateDate",
    "FileCreateDate",
];

/// Format used by the tool for dates, also used for the wall-clock fallback.
pub const DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("ExifTool not found at {0}")]
    ToolUnavailable(String),

    #[error("ExifTool execution failed ({status}): {stderr}")]
    Execution { status: String, stderr: String },

    #[error("Failed to parse metadata JSON: {0}")]
    Parse(String),

    #[error("I/O error running ExifTool: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything able to turn a file into a flat metadata record.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Full scan. `Ok(None)` means the tool reported nothing for the file.
    async fn extract(&self, path: &Path) -> Result<Option<MetadataRecord>, ExtractError>;

    /// Scan restricted to the named fields.
    async fn extract_fields(
        &self,
        path: &Path,
        fields: &[&str],
    ) -> Result<Option<MetadataRecord>, ExtractError> {
        Ok(self.extract(path).await?.map(|record| {
            record
                .into_iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .collect()
        }))
    }

    /// Version string of the underlying tool.
    async fn version(&self) -> Result<String, ExtractError>;
}

/// `MetadataExtractor` backed by the ExifTool command line.
pub struct ExifTool {
    program: String,
}

impl ExifTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// A program given as a path (rather than a bare name looked up in PATH)
    /// must exist before we try to spawn it.
    fn ensure_present(&self) -> Result<(), ExtractError> {
        let path = PathBuf::from(&self.program);
        let is_explicit_path = path.components().count() > 1 || path.is_absolute();
        if is_explicit_path && !path.exists() {
            return Err(ExtractError::ToolUnavailable(self.program.clone()));
        }
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<String, ExtractError> {
        self.ensure_present()?;
        debug!("Running ExifTool command: {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExtractError::ToolUnavailable(self.program.clone()),
                _ => ExtractError::Io(e),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ExtractError::Execution {
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!("ExifTool warnings: {}", stderr);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn scan_args(path: &Path, fields: &[&str]) -> Vec<String> {
        let mut args = vec!["-json".to_string(), "-n".to_string()];
        args.extend(fields.iter().map(|f| format!("-{f}")));
        args.push(path.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl MetadataExtractor for ExifTool {
    async fn extract(&self, path: &Path) -> Result<Option<MetadataRecord>, ExtractError> {
        let stdout = self.run(&Self::scan_args(path, &[])).await?;
        parse_output(&stdout)
    }

    async fn extract_fields(
        &self,
        path: &Path,
        fields: &[&str],
    ) -> Result<Option<MetadataRecord>, ExtractError> {
        let stdout = self.run(&Self::scan_args(path, fields)).await?;
        parse_output(&stdout)
    }

    async fn version(&self) -> Result<String, ExtractError> {
        let stdout = self.run(&["-ver".to_string()]).await?;
        Ok(stdout.trim().to_string())
    }
}

/// Decodes the tool's JSON array and returns its first record.
pub fn parse_output(stdout: &str) -> Result<Option<MetadataRecord>, ExtractError> {
    let decoded: Vec<Value> =
        serde_json::from_str(stdout).map_err(|e| ExtractError::Parse(e.to_string()))?;

    match decoded.into_iter().next() {
        None => {
            warn!("ExifTool returned empty metadata");
            Ok(None)
        }
        Some(Value::Object(record)) => Ok(Some(record)),
        Some(other) => Err(ExtractError::Parse(format!(
            "expected an object per file, got {other}"
        ))),
    }
}

fn usable_date(value: &Value) -> Option<&str> {
    let date = value.as_str()?.trim();
    let is_placeholder = date.chars().all(|c| matches!(c, '0' | ':' | ' '));
    (!date.is_empty() && !is_placeholder).then_some(date)
}

/// First usable date in `DATE_FIELDS` order, else the current local time.
pub fn best_creation_date(record: Option<&MetadataRecord>) -> String {
    record
        .and_then(|record| {
            DATE_FIELDS
                .iter()
                .find_map(|field| record.get(*field).and_then(usable_date))
        })
        .map(str::to_string)
        .unwrap_or_else(|| Local::now().format(DATE_FORMAT).to_string())
}

/// Result of the date-aware scan.
#[derive(Debug, Clone)]
pub struct ExtractedMetadata {
    pub record: MetadataRecord,
    pub creation_date: String,
}

/// Date-field scan followed by a full scan.
///
/// Returns `Ok(None)` when the full scan yields no record.
pub async fn extract_with_creation_date(
    extractor: &dyn MetadataExtractor,
    path: &Path,
) -> Result<Option<ExtractedMetadata>, ExtractError> {
    let dates = extractor.extract_fields(path, &DATE_FIELDS).await?;
    let creation_date = best_creation_date(dates.as_ref());
    debug!("Best creation date for {}: {}", path.display(), creation_date);

    Ok(extractor
        .extract(path)
        .await?
        .map(|record| ExtractedMetadata {
            record,
            creation_date,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> MetadataRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_output_first_record() {
        let out = r#"[{"SourceFile":"a.jpg","FileType":"JPEG","ImageWidth":640},{"SourceFile":"b.jpg"}]"#;
        let parsed = parse_output(out).unwrap().unwrap();
        assert_eq!(parsed["SourceFile"], "a.jpg");
        assert_eq!(parsed["ImageWidth"], 640);
        let keys: Vec<&str> = parsed.keys().map(String::as_str).collect();
        assert_eq!(keys, ["SourceFile", "FileType", "ImageWidth"]);
    }

    #[test]
    fn test_parse_output_empty_array() {
        assert!(parse_output("[]").unwrap().is_none());
    }

    #[test]
    fn test_parse_output_malformed() {
        assert!(matches!(parse_output("not json"), Err(ExtractError::Parse(_))));
        assert!(matches!(parse_output("{}"), Err(ExtractError::Parse(_))));
        assert!(matches!(parse_output("[1]"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_best_creation_date_priority() {
        let all = record(json!({
            "FileCreateDate": "2020:01:01 00:00:01",
            "CreateDate": "2021:02:02 02:02:02",
            "DateTimeOriginal": "2019:03:03 03:03:03"
        }));
        assert_eq!(best_creation_date(Some(&all)), "2019:03:03 03:03:03");

        let no_original = record(json!({
            "FileCreateDate": "2020:01:01 00:00:01",
            "TrackCreateDate": "2018:04:04 04:04:04",
            "MediaCreateDate": "2017:05:05 05:05:05"
        }));
        assert_eq!(best_creation_date(Some(&no_original)), "2017:05:05 05:05:05");

        let fs_only = record(json!({ "FileCreateDate": "2020:01:01 00:00:01" }));
        assert_eq!(best_creation_date(Some(&fs_only)), "2020:01:01 00:00:01");
    }

    #[test]
    fn test_best_creation_date_skips_placeholders() {
        let rec = record(json!({
            "DateTimeOriginal": "0000:00:00 00:00:00",
            "CreateDate": "",
            "MediaCreateDate": 0,
            "TrackCreateDate": "2016:06:06 06:06:06"
        }));
        assert_eq!(best_creation_date(Some(&rec)), "2016:06:06 06:06:06");
    }

    #[test]
    fn test_best_creation_date_falls_back_to_now() {
        let date = best_creation_date(None);
        assert!(chrono::NaiveDateTime::parse_from_str(&date, DATE_FORMAT).is_ok());

        let empty = best_creation_date(Some(&MetadataRecord::new()));
        assert!(chrono::NaiveDateTime::parse_from_str(&empty, DATE_FORMAT).is_ok());
    }

    #[test]
    fn test_scan_args() {
        let args = ExifTool::scan_args(Path::new("x/y.png"), &["CreateDate"]);
        assert_eq!(args, ["-json", "-n", "-CreateDate", "x/y.png"]);
    }

    #[tokio::test]
    async fn test_missing_explicit_path_is_tool_unavailable() {
        let tool = ExifTool::new("/definitely/not/here/exiftool");
        let err = tool.extract(Path::new("whatever.jpg")).await.unwrap_err();
        assert!(matches!(err, ExtractError::ToolUnavailable(_)));
        assert!(matches!(
            tool.version().await.unwrap_err(),
            ExtractError::ToolUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_in_path_is_tool_unavailable() {
        let tool = ExifTool::new("metalens-no-such-exiftool-binary");
        let err = tool.version().await.unwrap_err();
        assert!(matches!(err, ExtractError::ToolUnavailable(_)));
    }

    struct CannedExtractor(MetadataRecord);

    #[async_trait]
    impl MetadataExtractor for CannedExtractor {
        async fn extract(&self, _path: &Path) -> Result<Option<MetadataRecord>, ExtractError> {
            Ok(Some(self.0.clone()))
        }

        async fn version(&self) -> Result<String, ExtractError> {
            Ok("canned".to_string())
        }
    }

    #[tokio::test]
    async fn test_default_extract_fields_filters() {
        let extractor = CannedExtractor(record(json!({
            "FileName": "a.jpg",
            "CreateDate": "2015:07:07 07:07:07"
        })));
        let scoped = extractor
            .extract_fields(Path::new("a.jpg"), &DATE_FIELDS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert!(scoped.contains_key("CreateDate"));
    }

    #[tokio::test]
    async fn test_extract_with_creation_date() {
        let extractor = CannedExtractor(record(json!({
            "FileName": "a.jpg",
            "CreateDate": "2015:07:07 07:07:07"
        })));
        let extracted = extract_with_creation_date(&extractor, Path::new("a.jpg"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extracted.creation_date, "2015:07:07 07:07:07");
        assert_eq!(extracted.record.len(), 2);
    }
}

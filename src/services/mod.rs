pub mod exiftool;
pub mod metadata;
pub mod stripper;
pub mod upload_session;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Listing objects under '{prefix}' failed: {message}")]
    List { prefix: String, message: String },

    #[error("Uploading '{key}' failed: {message}")]
    Upload { key: String, message: String },

    #[error("Reading {path} for upload failed: {message}")]
    Source { path: String, message: String },
}

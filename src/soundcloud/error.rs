use thiserror::Error;

/// Errors surfaced by the SoundCloud catalog client. None are retried.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("HTTP error {status} during {operation} ({url})")]
    HttpStatus {
        operation: &'static str,
        status: u16,
        url: String,
    },

    #[error("Request failed during {operation}: {source}")]
    Transport {
        operation: &'static str,
        source: reqwest::Error,
    },

    #[error("Malformed response during {operation}: {source}")]
    Decode {
        operation: &'static str,
        source: serde_json::Error,
    },

    #[error("Disk error writing {path}: {source}")]
    Disk {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl CatalogError {
    pub(crate) fn transport(operation: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| CatalogError::Transport { operation, source }
    }
}

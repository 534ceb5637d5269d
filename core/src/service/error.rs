use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from [`ChatService::upload_file`](super::ChatService::upload_file).
///
/// Unlike the JSON operations, uploads do not produce an envelope: a
/// non-2xx status is reported as [`UploadError::Status`] with the raw response.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to access or read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file path: {0}")]
    InvalidPath(PathBuf),

    #[error("Failed to extract filename from path: {0}")]
    FileName(PathBuf),

    #[error("Invalid upload URL '{path}': {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid request header: {0}")]
    InvalidHeader(String),

    #[error("Network or request error: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{status_text}")]
    Status {
        status: u16,
        status_text: String,
        headers: BTreeMap<String, String>,
        /// Raw response body, as text.
        body: String,
    },

    /// A 2xx response that lacks `dialog.input.send` or is not JSON.
    #[error("Unexpected upload response: {0}")]
    MalformedResponse(String),
}

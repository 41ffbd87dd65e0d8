use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("{key} must be a boolean, got {value:?}")]
    InvalidFlag { key: String, value: String },

    #[error("{field} is not a usable url ({value:?}): {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("failed to read environment file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed environment record: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("fingerprint is not a valid header value: {0}")]
    Etag(#[from] axum::http::header::InvalidHeaderValue),

    #[error("environment already installed for this process")]
    AlreadyInstalled,
}

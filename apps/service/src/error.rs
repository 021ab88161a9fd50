use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Rejections raised while turning user input into a site record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL cannot be empty")]
    EmptyUrl,

    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Unsupported scheme '{0}'. Only HTTPS URLs are allowed")]
    UnsupportedScheme(String),

    #[error("Frequency of {0} seconds is not allowed (choose 30, 60, 90 or 120)")]
    InvalidFrequency(u64),
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No site with id {0}")]
    NotFound(Uuid),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("Malformed sites document {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode sites: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to move temporary file into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: IoError,
    },
}

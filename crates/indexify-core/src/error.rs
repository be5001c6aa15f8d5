use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading configuration and touching files.
///
/// Scenario detection and rewriting never produce one of these: an
/// uncertain import is a non-rewriting scenario, not an error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Unknown marker mode '{value}' (expected 'file' or 'directory')")]
    InvalidMarkerMode { value: String },
}

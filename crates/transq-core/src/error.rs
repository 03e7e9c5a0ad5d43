use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the sync pipeline and the transcription driver.
#[derive(Debug, Error)]
pub enum Error {
    /// A staged item has no recorded origin directory.
    #[error("no record of an original directory for '{0}'")]
    RecordNotFound(String),

    /// The audio-presence probe could not be run or exited unsuccessfully.
    #[error("audio probe failed for {path}: {reason}")]
    OracleFailure { path: PathBuf, reason: String },

    /// The records file exists but cannot be parsed.
    #[error("records file {path} is corrupt: {source}")]
    StoreCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The external transcriber could not be run or produced no usable output.
    #[error("transcriber failed for {path}: {reason}")]
    TranscriberFailure { path: PathBuf, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

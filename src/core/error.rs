//! Error types shared by the pipeline stages

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain raw input. Always fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Batch-level decode failure. Record-level problems are skipped instead.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response body is not a JSON array")]
    Json(#[from] serde_json::Error),
    #[error("malformed CSV input")]
    Csv(#[from] csv::Error),
    #[error("invalid date '{value}' for rate {id}, expected dd.mm.yyyy")]
    InvalidDate {
        id: i64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("write rejected for {key}: {reason}")]
    Rejected { key: String, reason: String },
    #[error("stored {column} value '{value}' is malformed")]
    Malformed { column: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to write record {key}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("loader worker terminated abnormally: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

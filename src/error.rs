//! Consumer error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{DimensionKind, EventKind};

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error(
        "Files with processing status found for {kind}. A previous run was probably \
         interrupted before completion. Back up the database and purge data from \
         incomplete processing."
    )]
    ProcessingFilesFound { kind: EventKind },
    #[error("Couldn't extract sample rate from filename: {0}")]
    SampleRateNotFound(String),
    #[error("Invalid sample rate {rate} for {filename}")]
    InvalidSampleRate { filename: String, rate: String },
    #[error("Invalid {kind} code: {code:?}")]
    InvalidDimensionCode { kind: DimensionKind, code: String },
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors while selecting log files on disk.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("file_glob can't include a directory: {0}")]
    GlobHasDirectory(String),
    #[error("Invalid file glob {glob}: {message}")]
    InvalidGlob { glob: String, message: String },
    #[error("No timestamp found in filename {filename} in {directory}")]
    TimestampNotFound { filename: String, directory: String },
    #[error("Invalid timestamp {value:?} in filename {filename}: {source}")]
    InvalidTimestamp {
        filename: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Duplicate filename found: {filename} in {directory}")]
    DuplicateFilename { filename: String, directory: String },
    #[error("Failed to read directory entry: {0}")]
    Walk(String),
}

pub type Result<T, E = ConsumerError> = std::result::Result<T, E>;

//! Errors for the telemetry recorder
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Could not extract text from image: {0}")]
    ExtractionError(String),

    #[error("OCR did not finish within {0:?}")]
    OcrTimeout(Duration),

    #[error("Staged image not found: {0}")]
    StagingNotFound(String),

    #[error("Could not promote {from} to {to}: {origin}")]
    PromotionError {
        from: PathBuf,
        to: PathBuf,
        origin: String,
    },

    #[error("Commit did not complete: {0}")]
    CommitAborted(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Export error")]
    ExportError(#[from] csv::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Invalid field pattern")]
    PatternError(#[from] regex::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

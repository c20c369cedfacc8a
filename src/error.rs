use thiserror::Error;

/// Errors raised at the call boundary of the tracker.
///
/// Per-frame conditions (no tracks, empty frames, unfinished calibration) are
/// routine and never surface here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid blob: {0}")]
    InvalidBlob(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Errors raised while loading allocation history
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The statistics endpoint could not be reached
    #[error("transport failure: {0}")]
    Http(#[from] reqwest::Error),

    /// The statistics endpoint answered with a non-success status
    #[error("statistics endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Input parsed, but does not have the expected overall shape
    #[error("unexpected input format: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;

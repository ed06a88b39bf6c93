use thiserror::Error;

/// Failure of a page fetch after the retry budget is spent.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Fetching {url} failed after {attempts} attempt(s): {reason}")]
    Exhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("Product '{name}' is already being monitored")]
    Duplicate { name: String },

    #[error("Product not found: {name}")]
    NotFound { name: String },

    #[error("Price {price} is outside the accepted range {min}..={max}")]
    Implausible {
        price: String,
        min: String,
        max: String,
    },

    #[error("Product limit reached: {limit} product(s) maximum")]
    LimitReached { limit: usize },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {notifier}: {message}")]
    Notification { notifier: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<tempfile::PersistError> for AppError {
    fn from(err: tempfile::PersistError) -> Self {
        AppError::Io(err.error)
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

//! Error kinds raised while loading and normalizing dashboard data.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Fetch failed for {resource}: {message}")]
    FetchFailure { resource: String, message: String },
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::MalformedPayload(err.to_string())
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::MalformedPayload(err.to_string())
    }
}

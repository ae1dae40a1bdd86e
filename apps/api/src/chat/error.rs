use std::time::Duration;

use thiserror::Error;

use crate::db::StoreError;
use crate::extraction::ExtractionError;

/// Failures of the routing and resolution pipeline.
///
/// Expected negative outcomes (no match, record not found during staging) are not
/// errors; they come back as plain assistant messages.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The extraction service was unreachable or returned unusable output.
    #[error("Extraction service error: {0}")]
    ExtractionService(String),

    #[error("Extraction service timed out after {0:?}")]
    ServiceTimeout(Duration),

    /// The classifier named a category outside the closed intent set.
    #[error("Unknown intent '{0}'")]
    UnknownIntent(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] StoreError),

    #[error("Repository timed out after {0:?}")]
    RepositoryTimeout(Duration),

    #[error("Image storage error: {0}")]
    ImageStorage(String),
}

impl From<ExtractionError> for ChatError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnknownIntent(category) => ChatError::UnknownIntent(category),
            ExtractionError::Llm(e) => ChatError::ExtractionService(e.to_string()),
        }
    }
}

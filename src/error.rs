use thiserror::Error;

/// Every failure the viewer core can surface
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Unsupported file type: {0:?}")]
    UnsupportedFileType(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Coordinates not found for {snippet:?} on page {page}")]
    CoordinateNotFound { page: usize, snippet: String },

    #[error("Pipeline unavailable: {0}")]
    PipelineUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for ViewerError {
    fn from(err: rusqlite::Error) -> Self {
        ViewerError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for ViewerError {
    fn from(err: reqwest::Error) -> Self {
        ViewerError::PipelineUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;

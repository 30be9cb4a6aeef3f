//! Worker error types.

use thiserror::Error;

use runtrace_media::MediaError;
use runtrace_models::{ConfigError, ParseCourseRangeError};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Staging failed: {0}")]
    Staging(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseCourseRangeError> for WorkerError {
    fn from(e: ParseCourseRangeError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl WorkerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn staging(msg: impl Into<String>) -> Self {
        Self::Staging(msg.into())
    }

    /// Missing or repeated course ranges; the run cannot produce a trace.
    pub fn is_fatal_course_error(&self) -> bool {
        matches!(self, WorkerError::Media(e) if e.is_course_error())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            WorkerError::Cancelled | WorkerError::Media(MediaError::Cancelled)
        )
    }
}

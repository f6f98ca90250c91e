//! Error types for the edit-point engine.

use thiserror::Error;

use jumpcut_models::config::ConfigError;
use jumpcut_models::timecode::TimecodeError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the editing pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("chapter list parse error: {0}")]
    SectionParse(#[from] SectionParseError),

    #[error("time-scale modification failed: {0}")]
    Stretch(#[from] StretchError),

    #[error("output sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error("run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Errors from output sink finalization.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render failed: {0}")]
    Render(String),
}

impl SinkError {
    /// Create a render failure error.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }
}

/// Errors from parsing a chapter/section list.
#[derive(Debug, Error, PartialEq)]
pub enum SectionParseError {
    #[error("line {line}: missing chapter title")]
    MissingTitle { line: usize },

    #[error("line {line}: {source}")]
    BadTimecode {
        line: usize,
        source: TimecodeError,
    },
}

/// Errors from the time-scale modification primitive.
#[derive(Debug, Error, PartialEq)]
pub enum StretchError {
    #[error("cannot time-stretch an empty chunk")]
    EmptyInput,

    #[error("invalid speed factor {0}")]
    InvalidSpeed(f64),
}

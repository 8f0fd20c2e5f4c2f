use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the export pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Markup error: {0}")]
    Markup(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Render error: {0}")]
    Render(String),
}

/// Classification of errors for logging and user display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Invalid or unreadable configuration.
    ConfigError,
    /// The snapshot markup could not be read.
    InputError,
    /// Writing a document failed (file I/O, workbook or PDF writer).
    OutputError,
    /// Anything not raised as a [`ReportError`].
    SystemError,
}

impl ReportError {
    /// Returns the broad error category for routing and display purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::ConfigError,
            Self::Markup(_) => ErrorCategory::InputError,
            Self::FileSystem(_) | Self::Render(_) => ErrorCategory::OutputError,
        }
    }

    /// Returns a user-friendly message (hides internal details).
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => format!("Configuration issue: {msg}"),
            Self::Markup(msg) => format!("Could not read the table snapshot: {msg}"),
            Self::FileSystem(msg) => format!("File error: {msg}"),
            Self::Render(_) => "The document could not be generated.".into(),
        }
    }
}

/// Classified error with context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
    pub user_message: String,
}

/// Classify an `anyhow::Error` by the first [`ReportError`] in its chain.
/// Errors without one are system errors.
pub fn classify_error(error: &anyhow::Error) -> ClassifiedError {
    let report = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ReportError>());
    let (category, user_message) = match report {
        Some(report) => (report.category(), report.user_message()),
        None => (
            ErrorCategory::SystemError,
            "An unexpected error occurred.".to_string(),
        ),
    };
    ClassifiedError {
        category,
        message: format!("{error:#}"),
        user_message,
    }
}

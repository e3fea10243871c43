use miette::Diagnostic;
use thiserror::Error;

/// Errors raised when declaring activities
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum ActivityError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(help("give every activity a non-empty name"))]
    InvalidArgument(String),
}

impl ActivityError {
    /// Create a new invalid argument error
    pub fn invalid_argument<S: ToString>(message: S) -> Self {
        Self::InvalidArgument(message.to_string())
    }
}

/// A specialized result type for activity declarations
pub type ActivityResult<T> = std::result::Result<T, ActivityError>;

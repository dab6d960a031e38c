//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::models::job::TransitionError;
use crate::services::fallback::FallbackError;
use repo_weaver_core::CoreError;
use repo_weaver_github::GitHubError;
use repo_weaver_llm::LlmError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Core errors (identifiers, parsing)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Model backend errors
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Version-control backend errors
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// Every model in the roster failed
    #[error(transparent)]
    Fallback(#[from] FallbackError),

    /// Rejected job or phase transition
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A workflow precondition or step failed
    #[error("{0}")]
    Workflow(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a workflow error
    pub fn workflow(msg: impl Into<String>) -> Self {
        Self::Workflow(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert AppError to a string suitable for job errors and alerts
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

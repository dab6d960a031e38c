//! Core Error Types
//!
//! Errors raised while parsing the identifiers shared across the workspace.
//! The application crate wraps these alongside the model and
//! version-control backend errors.

use thiserror::Error;

/// Malformed repository or file identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Not of the form `owner/name`
    #[error("Invalid repository name '{0}': expected owner/name")]
    InvalidRepoRef(String),

    /// Not of the form `owner/name::path`
    #[error("Invalid file key '{0}': expected owner/name::path")]
    InvalidFileKey(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidRepoRef("octocat".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid repository name 'octocat': expected owner/name"
        );
        let err = CoreError::InvalidFileKey("octocat/demo".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid file key 'octocat/demo': expected owner/name::path"
        );
    }
}

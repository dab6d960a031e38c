//! GitHub Error Types

use thiserror::Error;

/// Errors raised by the version-control backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GitHubError {
    /// Non-success HTTP status from the API
    #[error("GitHub API Error: {status} {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// File content could not be decoded (bad base64 or non UTF-8)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Unexpected response body
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for version-control operations
pub type GitHubResult<T> = Result<T, GitHubError>;

impl GitHubError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the requested file, branch or repository does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = GitHubError::api(404, "Not Found");
        assert_eq!(err.to_string(), "GitHub API Error: 404 Not Found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_not_found_detection() {
        assert!(GitHubError::api(404, "Not Found").is_not_found());
        assert!(!GitHubError::api(401, "Bad credentials").is_not_found());
        assert!(!GitHubError::Network("reset".into()).is_not_found());
    }
}

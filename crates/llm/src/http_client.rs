//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients shared by the
//! model backends.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

const USER_AGENT: &str = concat!("repo-weaver/", env!("CARGO_PKG_VERSION"));

/// Build a `reqwest::Client` with an optional per-request timeout.
///
/// Streaming responses can legitimately run for minutes, so no timeout is
/// applied unless one is configured.
pub fn build_http_client(timeout_secs: Option<u64>) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| LlmError::NetworkError {
        message: format!("Failed to build HTTP client: {}", e),
    })
}

//! LLM Types
//!
//! Error and configuration types shared by every model backend.

use serde::{Deserialize, Serialize};

/// Errors raised by a model backend.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Authentication failed (missing or invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited { message: String },
    /// Model not found or not available
    ModelNotFound { model: String },
    /// Invalid request (bad parameters)
    InvalidRequest { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// Response parsing error (malformed or non-conforming output)
    ParseError { message: String },
    /// The model returned no text at all
    EmptyResponse,
    /// Other error
    Other { message: String },
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message } => write!(f, "Rate limited: {}", message),
            LlmError::ModelNotFound { model } => write!(f, "Model not found: {}", model),
            LlmError::InvalidRequest { message } => write!(f, "Invalid request: {}", message),
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => write!(f, "Network error: {}", message),
            LlmError::ParseError { message } => write!(f, "Parse error: {}", message),
            LlmError::EmptyResponse => write!(f, "AI returned an empty response."),
            LlmError::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for model backend operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Configuration for a model backend.
///
/// The API key is the only secret; it is never serialized. Changing it means
/// building a new provider from an updated config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Base URL override (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature for streamed file content
    #[serde(default = "default_stream_temperature")]
    pub stream_temperature: f32,
    /// Sampling temperature for structured plans
    #[serde(default)]
    pub plan_temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Per-request timeout in seconds (none = no client-side timeout)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_stream_temperature() -> f32 {
    0.1
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    64
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            stream_temperature: default_stream_temperature(),
            plan_temperature: 0.0,
            top_p: default_top_p(),
            top_k: default_top_k(),
            request_timeout_secs: None,
        }
    }
}

impl ProviderConfig {
    /// Copy of this config with a different API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

//! Model Backend Trait
//!
//! Defines the common interface the orchestration layer uses to talk to a
//! generative model service.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::schema::ResponseSchema;
use super::types::{LlmError, LlmResult};
use repo_weaver_core::streaming::UnifiedStreamEvent;

/// Trait that all model backends must implement.
///
/// Provides a unified interface for:
/// - Structured completions constrained by a response schema
/// - Streaming text completions
///
/// The model is chosen per call so that a single backend instance can serve
/// every entry of a model roster.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Returns the backend name for identification.
    fn name(&self) -> &'static str;

    /// Request a JSON value conforming to `schema` from `model`.
    ///
    /// Returns `LlmError::EmptyResponse` when the model produces no text and
    /// `LlmError::ParseError` when the text is not valid JSON.
    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> LlmResult<serde_json::Value>;

    /// Stream a plain-text completion from `model` into `tx`.
    ///
    /// Each chunk is sent as a `UnifiedStreamEvent::TextDelta` in arrival
    /// order. An error reported mid-stream terminates the call with `Err`;
    /// chunks already delivered are not retracted.
    async fn stream_text(
        &self,
        model: &str,
        prompt: &str,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<()>;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

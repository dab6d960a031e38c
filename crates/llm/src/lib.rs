//! Repo Weaver LLM
//!
//! Provides the model backend abstraction consumed by the orchestration layer:
//! - Structured (schema-constrained JSON) generation
//! - Streaming text generation delivered as `UnifiedStreamEvent`s
//!
//! Ships the Gemini implementation, its SSE stream adapter, the response
//! schema builder and the HTTP client factory.

pub mod gemini;
pub mod http_client;
pub mod provider;
pub mod schema;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use provider::ModelBackend;
pub use schema::ResponseSchema;
pub use types::*;

// Re-export streaming adapters
pub use streaming_adapters::GeminiAdapter;

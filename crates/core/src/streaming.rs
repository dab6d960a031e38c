//! Unified Stream Event Types
//!
//! Provider-agnostic event types and adapter trait for processing streamed
//! model responses. The LLM crate converts provider wire formats into these
//! events; the orchestration layer only ever sees `UnifiedStreamEvent`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified streaming event that all provider adapters convert to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnifiedStreamEvent {
    /// Text content delta from the model
    TextDelta { content: String },

    /// Token usage information
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// Error reported inside the stream
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Stream complete
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}

impl UnifiedStreamEvent {
    /// Text carried by this event, if it is a text delta.
    pub fn text(&self) -> Option<&str> {
        match self {
            UnifiedStreamEvent::TextDelta { content } => Some(content),
            _ => None,
        }
    }
}

/// A stream line that could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Parse error: {0}")]
pub struct AdapterError(pub String);

/// Converts one provider's raw stream lines into unified events.
pub trait StreamAdapter: Send + Sync {
    /// A single input line may produce zero, one, or multiple events.
    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError>;
}

//! Gemini SSE Stream Adapter
//!
//! Handles the `streamGenerateContent?alt=sse` format: every `data:` line is a
//! full `GenerateContentResponse` chunk carrying candidate parts, an optional
//! finish reason and usage metadata.

use repo_weaver_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Adapter for the Gemini SSE stream format
#[derive(Debug, Default)]
pub struct GeminiAdapter {
    /// Usage is repeated on every chunk; only the last value matters.
    last_usage: Option<(u32, u32)>,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamAdapter for GeminiAdapter {
    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        let json_str = if let Some(rest) = trimmed.strip_prefix("data:") {
            rest.trim_start()
        } else if trimmed.is_empty() || trimmed.starts_with(':') {
            return Ok(vec![]);
        } else {
            trimmed
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            return Ok(vec![]);
        }

        let chunk: GeminiChunk = serde_json::from_str(json_str)
            .map_err(|e| AdapterError(format!("{}: {}", e, json_str)))?;

        let mut events = Vec::new();

        if let Some(err) = chunk.error {
            events.push(UnifiedStreamEvent::Error {
                message: err.message,
                code: err.status.or_else(|| err.code.map(|c| c.to_string())),
            });
            return Ok(events);
        }

        let mut finish_reason = None;
        for candidate in chunk.candidates {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(text) = part.text {
                        if !text.is_empty() {
                            events.push(UnifiedStreamEvent::TextDelta { content: text });
                        }
                    }
                }
            }
            if candidate.finish_reason.is_some() {
                finish_reason = candidate.finish_reason;
            }
        }

        if let Some(usage) = chunk.usage_metadata {
            let pair = (usage.prompt_token_count, usage.candidates_token_count);
            if self.last_usage != Some(pair) {
                self.last_usage = Some(pair);
                events.push(UnifiedStreamEvent::Usage {
                    input_tokens: pair.0,
                    output_tokens: pair.1,
                });
            }
        }

        if let Some(reason) = finish_reason {
            events.push(UnifiedStreamEvent::Complete {
                stop_reason: Some(reason),
            });
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_chunk() {
        let mut adapter = GeminiAdapter::new();
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"fn main"}],"role":"model"}}]}"#;
        let events = adapter.adapt(line).unwrap();
        assert_eq!(
            events,
            vec![UnifiedStreamEvent::TextDelta {
                content: "fn main".to_string()
            }]
        );
    }

    #[test]
    fn test_final_chunk_with_usage_and_finish() {
        let mut adapter = GeminiAdapter::new();
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"}"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":3}}"#;
        let events = adapter.adapt(line).unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], UnifiedStreamEvent::TextDelta { .. }));
        assert_eq!(
            events[1],
            UnifiedStreamEvent::Usage {
                input_tokens: 12,
                output_tokens: 3
            }
        );
        assert_eq!(
            events[2],
            UnifiedStreamEvent::Complete {
                stop_reason: Some("STOP".to_string())
            }
        );
    }

    #[test]
    fn test_repeated_usage_is_emitted_once() {
        let mut adapter = GeminiAdapter::new();
        let line = r#"data: {"usageMetadata":{"promptTokenCount":5,"candidatesTokenCount":1}}"#;
        assert_eq!(adapter.adapt(line).unwrap().len(), 1);
        assert!(adapter.adapt(line).unwrap().is_empty());
        let changed = r#"data: {"usageMetadata":{"promptTokenCount":5,"candidatesTokenCount":2}}"#;
        assert_eq!(adapter.adapt(changed).unwrap().len(), 1);
    }

    #[test]
    fn test_error_chunk() {
        let mut adapter = GeminiAdapter::new();
        let line = r#"data: {"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let events = adapter.adapt(line).unwrap();
        assert_eq!(
            events,
            vec![UnifiedStreamEvent::Error {
                message: "Resource has been exhausted".to_string(),
                code: Some("RESOURCE_EXHAUSTED".to_string()),
            }]
        );
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let mut adapter = GeminiAdapter::new();
        assert!(adapter.adapt("").unwrap().is_empty());
        assert!(adapter.adapt(": keep-alive").unwrap().is_empty());
        assert!(adapter.adapt("data: [DONE]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let mut adapter = GeminiAdapter::new();
        assert!(matches!(
            adapter.adapt("data: {not json"),
            Err(AdapterError(_))
        ));
    }
}
